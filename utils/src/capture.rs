use crate::audio::REALTIME_API_PCM16_SAMPLE_RATE;

pub const MIN_CHUNK_MS: u32 = 20;
pub const MAX_CHUNK_MS: u32 = 500;
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const DEFAULT_CHUNK_MS: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture settings cannot change while capturing; stop first")]
    Busy,
    #[error("input device error: {0}")]
    Device(String),
}

/// A looping recorder. The device writes into a circular buffer of fixed length and
/// reports its current write position; readers copy out of it by absolute index.
pub trait InputDevice {
    /// Names of the input devices currently present.
    fn devices(&self) -> Vec<String>;

    /// Starts recording and returns the length of the circular buffer in samples.
    fn start(&mut self, device: &str, sample_rate: u32) -> Result<usize, CaptureError>;

    fn stop(&mut self);

    /// Current write position within the circular buffer.
    fn position(&mut self) -> usize;

    /// Fills `buffer` with samples starting at `from`, wrapping at the end of the ring.
    fn read_into(&self, buffer: &mut [f32], from: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    sample_rate: u32,
    chunk_ms: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: REALTIME_API_PCM16_SAMPLE_RATE,
            chunk_ms: DEFAULT_CHUNK_MS,
        }
    }
}

impl CaptureSettings {
    pub fn new(sample_rate: u32, chunk_ms: u32) -> Self {
        Self::default().with_sample_rate(sample_rate).with_chunk_ms(chunk_ms)
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        self
    }

    pub fn with_chunk_ms(mut self, chunk_ms: u32) -> Self {
        self.chunk_ms = chunk_ms.clamp(MIN_CHUNK_MS, MAX_CHUNK_MS);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn chunk_ms(&self) -> u32 {
        self.chunk_ms
    }

    pub fn samples_per_chunk(&self) -> usize {
        (self.sample_rate as u64 * self.chunk_ms as u64 / 1000) as usize
    }
}

/// Turns a looping input device into a stream of fixed-size chunks.
///
/// `poll` must be called more often than the device ring takes to fill, otherwise
/// the writer laps the reader and audio is lost.
pub struct CapturePipeline<D: InputDevice> {
    device: D,
    settings: CaptureSettings,
    selected_device: Option<String>,
    active_device: Option<String>,
    chunk: Vec<f32>,
    ring_len: usize,
    read_position: usize,
    missing_device_reported: bool,
}

impl<D: InputDevice> CapturePipeline<D> {
    pub fn new(device: D, settings: CaptureSettings) -> Self {
        Self {
            device,
            settings,
            selected_device: None,
            active_device: None,
            chunk: Vec::new(),
            ring_len: 0,
            read_position: 0,
            missing_device_reported: false,
        }
    }

    pub fn settings(&self) -> CaptureSettings {
        self.settings
    }

    pub fn is_capturing(&self) -> bool {
        self.active_device.is_some()
    }

    pub fn active_device(&self) -> Option<&str> {
        self.active_device.as_deref()
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), CaptureError> {
        if self.is_capturing() {
            return Err(CaptureError::Busy);
        }
        self.settings = self.settings.with_sample_rate(sample_rate);
        Ok(())
    }

    pub fn set_chunk_duration(&mut self, chunk_ms: u32) -> Result<(), CaptureError> {
        if self.is_capturing() {
            return Err(CaptureError::Busy);
        }
        self.settings = self.settings.with_chunk_ms(chunk_ms);
        Ok(())
    }

    /// Selects a device by name. A running capture is restarted on the new device.
    pub fn set_device(&mut self, device: Option<&str>) -> Result<(), CaptureError> {
        self.selected_device = device.map(str::to_string);
        if self.is_capturing() {
            self.stop_capture();
            self.start_capture()?;
        }
        Ok(())
    }

    /// Returns `Ok(false)` when no input device exists; that case is logged once.
    pub fn start_capture(&mut self) -> Result<bool, CaptureError> {
        if self.is_capturing() {
            return Ok(true);
        }

        let devices = self.device.devices();
        let Some(device) = self.resolve_device(&devices) else {
            if !self.missing_device_reported {
                tracing::warn!("No microphone detected; capture not started");
                self.missing_device_reported = true;
            }
            return Ok(false);
        };
        self.missing_device_reported = false;

        let chunk_len = self.settings.samples_per_chunk();
        let ring_len = self.device.start(&device, self.settings.sample_rate())?;
        if ring_len <= chunk_len {
            self.device.stop();
            return Err(CaptureError::Device(format!(
                "recording buffer of {ring_len} samples cannot hold a {chunk_len}-sample chunk"
            )));
        }

        self.chunk = vec![0.0; chunk_len];
        self.ring_len = ring_len;
        self.read_position = self.device.position() % ring_len;
        tracing::info!(
            device = %device,
            sample_rate = self.settings.sample_rate(),
            chunk_ms = self.settings.chunk_ms(),
            "Capture started"
        );
        self.active_device = Some(device);
        Ok(true)
    }

    pub fn stop_capture(&mut self) {
        if let Some(device) = self.active_device.take() {
            self.device.stop();
            tracing::info!(device = %device, "Capture stopped");
        }
    }

    /// Emits every complete chunk recorded since the last poll, oldest first. The slice
    /// handed to `on_chunk` is reused between calls; copy it to keep it.
    pub fn poll<F>(&mut self, mut on_chunk: F) -> usize
    where
        F: FnMut(&[f32]),
    {
        if !self.is_capturing() {
            return 0;
        }

        let chunk_len = self.chunk.len();
        let write_position = self.device.position() % self.ring_len;
        let mut available = (write_position + self.ring_len - self.read_position) % self.ring_len;
        let mut emitted = 0;

        while available >= chunk_len {
            let head = (self.ring_len - self.read_position).min(chunk_len);
            self.device.read_into(&mut self.chunk[..head], self.read_position);
            if head < chunk_len {
                self.device.read_into(&mut self.chunk[head..], 0);
            }
            on_chunk(&self.chunk);

            self.read_position = (self.read_position + chunk_len) % self.ring_len;
            available -= chunk_len;
            emitted += 1;
        }
        emitted
    }

    fn resolve_device(&self, devices: &[String]) -> Option<String> {
        if let Some(wanted) = &self.selected_device {
            if devices.iter().any(|d| d == wanted) {
                return Some(wanted.clone());
            }
            tracing::warn!(device = %wanted, "Selected microphone not found; using default");
        }
        devices.first().cloned()
    }
}

impl<D: InputDevice> Drop for CapturePipeline<D> {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
