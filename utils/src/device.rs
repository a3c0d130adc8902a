mod input;
mod output;

pub use input::CpalInputDevice;
pub use output::PlaybackOutput;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

fn get_host() -> cpal::Host {
    cpal::default_host()
}

fn find_device<I>(devices: I, target: &str) -> Option<Device>
where
    I: Iterator<Item = Device>,
{
    devices.into_iter().find(|d| d.name().is_ok_and(|name| name == target))
}

pub fn get_or_default_input(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => find_device(host.input_devices()?, target)
            .ok_or_else(|| anyhow::anyhow!("No input device named '{target}'")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device")),
    }
}

pub fn get_or_default_output(device_name: Option<&str>) -> anyhow::Result<Device> {
    let host = get_host();
    match device_name {
        Some(target) => find_device(host.output_devices()?, target)
            .ok_or_else(|| anyhow::anyhow!("No output device named '{target}'")),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
    }
}

/// Names of the input devices, default first.
pub fn input_device_names() -> Vec<String> {
    let host = get_host();
    let default = host.default_input_device().and_then(|d| d.name().ok());
    let mut names: Vec<String> = match host.input_devices() {
        Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate input devices: {e}");
            Vec::new()
        }
    };
    if let Some(default) = default {
        if let Some(index) = names.iter().position(|n| *n == default) {
            let name = names.remove(index);
            names.insert(0, name);
        }
    }
    names
}

fn describe(device: &Device, default: Option<&str>, input: bool) -> Option<String> {
    let name = device.name().ok()?;
    let config = if input {
        device.default_input_config().ok()?
    } else {
        device.default_output_config().ok()?
    };
    let mut line = format!(" * {}({}ch, {}hz)", name, config.channels(), config.sample_rate().0);
    if default == Some(name.as_str()) {
        line.push_str(" [default]");
    }
    Some(line)
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    let host = get_host();
    let default = host.default_input_device().and_then(|d| d.name().ok());
    let lines: Vec<String> = host
        .input_devices()?
        .filter_map(|d| describe(&d, default.as_deref(), true))
        .collect();
    Ok(lines.join("\n"))
}

pub fn get_available_outputs() -> anyhow::Result<String> {
    let host = get_host();
    let default = host.default_output_device().and_then(|d| d.name().ok());
    let lines: Vec<String> = host
        .output_devices()?
        .filter_map(|d| describe(&d, default.as_deref(), false))
        .collect();
    Ok(lines.join("\n"))
}
