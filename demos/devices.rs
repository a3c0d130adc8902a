use realtime_voice::utils::device;

fn main() -> anyhow::Result<()> {
    println!("Available inputs: {}", device::get_available_inputs()?);
    println!("Available outputs: {}", device::get_available_outputs()?);
    Ok(())
}
