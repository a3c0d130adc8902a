use crate::utils::audio::{decode_base64, pcm16_from_bytes};

/// Accumulates the decoded audio deltas of one response until the endpoint
/// marks the audio as done.
#[derive(Debug, Default)]
pub struct AudioSegment {
    response_id: Option<String>,
    bytes: Vec<u8>,
    open: bool,
}

impl AudioSegment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `payload` and appends it. A malformed payload is dropped and the
    /// segment is left as it was.
    pub fn append_base64(&mut self, response_id: Option<&str>, payload: &str) -> bool {
        let Some(bytes) = decode_base64(payload) else {
            return false;
        };
        if !self.open {
            self.open = true;
            self.response_id = response_id.map(str::to_string);
        }
        self.bytes.extend_from_slice(&bytes);
        true
    }

    /// Closes the segment and returns its samples, if any were collected.
    pub fn take(&mut self) -> Option<(Option<String>, Vec<i16>)> {
        let response_id = self.response_id.take();
        let bytes = std::mem::take(&mut self.bytes);
        self.open = false;
        let samples = pcm16_from_bytes(&bytes);
        (!samples.is_empty()).then_some((response_id, samples))
    }

    /// Discards whatever has been collected.
    pub fn reset(&mut self) {
        self.response_id = None;
        self.bytes.clear();
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }
}
