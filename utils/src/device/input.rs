use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use rubato::{FastFixedIn, Resampler};

use crate::audio::create_resampler;
use crate::capture::{CaptureError, InputDevice};

const RESAMPLER_CHUNK: usize = 480;
const DRAIN_CHUNK: usize = 1024;

/// Microphone backed by cpal. The audio callback only pushes mono samples into a
/// lock-free ring; `position` drains that ring on the caller's thread into a one
/// second looping buffer at the requested rate.
pub struct CpalInputDevice {
    stream: Option<cpal::Stream>,
    incoming: Option<HeapCons<f32>>,
    converter: Option<RateConverter>,
    ring: Vec<f32>,
    write_position: usize,
}

struct RateConverter {
    resampler: FastFixedIn<f32>,
    pending: Vec<f32>,
}

impl RateConverter {
    fn new(device_rate: u32, target_rate: u32) -> anyhow::Result<Self> {
        Ok(Self {
            resampler: create_resampler(device_rate as f64, target_rate as f64, RESAMPLER_CHUNK)?,
            pending: Vec::with_capacity(RESAMPLER_CHUNK * 2),
        })
    }

    fn convert(&mut self, samples: &[f32], mut sink: impl FnMut(&[f32])) {
        self.pending.extend_from_slice(samples);
        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            match self.resampler.process(&[&self.pending[..needed]], None) {
                Ok(out) => sink(&out[0]),
                Err(e) => tracing::error!("Capture resampling failed: {e}"),
            }
            self.pending.drain(..needed);
        }
    }
}

impl Default for CpalInputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalInputDevice {
    pub fn new() -> Self {
        Self {
            stream: None,
            incoming: None,
            converter: None,
            ring: Vec::new(),
            write_position: 0,
        }
    }

    fn write(ring: &mut [f32], position: &mut usize, samples: &[f32]) {
        for &sample in samples {
            ring[*position] = sample;
            *position = (*position + 1) % ring.len();
        }
    }

    fn open(&mut self, device: &str, sample_rate: u32) -> anyhow::Result<usize> {
        let device = super::get_or_default_input(Some(device))?;
        let config = device.default_input_config()?;
        let channels = config.channels() as usize;
        let device_rate = config.sample_rate().0;
        tracing::debug!(channels, device_rate, sample_rate, "Opening input stream");

        let (mut producer, consumer) = HeapRb::<f32>::new(device_rate as usize * 2).split();
        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels.max(1)) {
                    let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                    let _ = producer.try_push(mono);
                }
            },
            |e| tracing::error!("Input stream error: {e}"),
            None,
        )?;
        stream.play()?;

        self.converter = if device_rate != sample_rate {
            Some(RateConverter::new(device_rate, sample_rate)?)
        } else {
            None
        };
        self.ring = vec![0.0; sample_rate as usize];
        self.write_position = 0;
        self.incoming = Some(consumer);
        self.stream = Some(stream);
        Ok(self.ring.len())
    }
}

impl InputDevice for CpalInputDevice {
    fn devices(&self) -> Vec<String> {
        super::input_device_names()
    }

    fn start(&mut self, device: &str, sample_rate: u32) -> Result<usize, CaptureError> {
        self.stop();
        self.open(device, sample_rate)
            .map_err(|e| CaptureError::Device(e.to_string()))
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("Failed to pause input stream: {e}");
            }
        }
        self.incoming = None;
        self.converter = None;
    }

    fn position(&mut self) -> usize {
        let Some(incoming) = self.incoming.as_mut() else {
            return self.write_position;
        };
        let mut scratch = [0.0f32; DRAIN_CHUNK];
        loop {
            let count = incoming.pop_slice(&mut scratch);
            if count == 0 {
                break;
            }
            match self.converter.as_mut() {
                Some(converter) => {
                    let ring = &mut self.ring;
                    let position = &mut self.write_position;
                    converter.convert(&scratch[..count], |out| Self::write(ring, position, out));
                }
                None => Self::write(&mut self.ring, &mut self.write_position, &scratch[..count]),
            }
        }
        self.write_position
    }

    fn read_into(&self, buffer: &mut [f32], from: usize) {
        if self.ring.is_empty() {
            buffer.fill(0.0);
            return;
        }
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = self.ring[(from + i) % self.ring.len()];
        }
    }
}
