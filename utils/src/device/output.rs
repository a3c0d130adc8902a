use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};

use crate::playback::PlaybackQueue;

/// A running output stream pulling from a shared [`PlaybackQueue`].
/// Dropping it stops playback.
pub struct PlaybackOutput {
    _stream: cpal::Stream,
    queue: Arc<PlaybackQueue>,
    channels: usize,
}

impl PlaybackOutput {
    /// Opens the named (or default) output device at its native rate.
    pub fn open(device_name: Option<&str>) -> anyhow::Result<Self> {
        let device = super::get_or_default_output(device_name)?;
        let config = device.default_output_config()?;
        let channels = config.channels() as usize;
        let queue = Arc::new(PlaybackQueue::new(config.sample_rate().0));
        tracing::info!(
            device = %device.name().unwrap_or_default(),
            channels,
            sample_rate = queue.output_rate(),
            "Opening output stream"
        );

        let pull = Arc::clone(&queue);
        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| pull.fill_interleaved(data, channels),
            |e| tracing::error!("Output stream error: {e}"),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            queue,
            channels,
        })
    }

    pub fn queue(&self) -> Arc<PlaybackQueue> {
        Arc::clone(&self.queue)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}
