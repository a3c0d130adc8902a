use base64::Engine;
use rubato::{FastFixedIn, PolynomialDegree};

/// Sample rate of the PCM16 audio exchanged with the realtime endpoint.
pub const REALTIME_API_PCM16_SAMPLE_RATE: u32 = 24_000;

const PCM16_SCALE: f32 = 32768.0;

pub fn create_resampler(in_sampling_rate: f64, out_sampling_rate: f64, chunk_size: usize) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Clamps to [-1, 1] before scaling so out-of-range input saturates instead of wrapping.
pub fn f32_to_i16(sample: f32) -> i16 {
    let sample = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (sample * PCM16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / PCM16_SCALE
}

pub fn convert_f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(f32_to_i16).collect()
}

pub fn convert_i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().copied().map(i16_to_f32).collect()
}

/// PCM16 byte layout used on the wire (little-endian sample pairs).
pub trait ToBinary {
    fn to_pcm16_bytes(&self) -> Vec<u8>;
}

impl ToBinary for [i16] {
    fn to_pcm16_bytes(&self) -> Vec<u8> {
        self.iter().flat_map(|sample| sample.to_le_bytes()).collect()
    }
}

impl ToBinary for [f32] {
    fn to_pcm16_bytes(&self) -> Vec<u8> {
        self.iter().flat_map(|&sample| f32_to_i16(sample).to_le_bytes()).collect()
    }
}

/// A trailing odd byte cannot form a sample and is dropped.
pub fn pcm16_from_bytes(bytes: &[u8]) -> Vec<i16> {
    if bytes.len() % 2 != 0 {
        tracing::debug!(len = bytes.len(), "dropping trailing odd byte from PCM16 buffer");
    }
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Malformed payloads are logged and yield `None`; the caller drops the chunk.
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    match base64::engine::general_purpose::STANDARD.decode(text.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!(len = text.len(), "Failed to decode base64 audio fragment: {e}");
            None
        }
    }
}

/// Microphone floats straight to the base64 text carried by `input_audio_buffer.append`.
pub fn encode_pcm16(samples: &[f32]) -> String {
    encode_base64(&samples.to_pcm16_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trip_stays_within_one_quantization_step() {
        let step = 1.0 / 32768.0;
        for i in -1000..=1000 {
            let x = i as f32 / 1000.0;
            let back = i16_to_f32(f32_to_i16(x));
            assert!(
                (back - x).abs() <= step + f32::EPSILON,
                "{x} came back as {back}"
            );
        }
    }

    #[test]
    fn out_of_range_samples_saturate() {
        assert_eq!(f32_to_i16(1.5), i16::MAX);
        assert_eq!(f32_to_i16(-3.0), i16::MIN);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn bytes_are_little_endian_pairs() {
        let samples: [i16; 2] = [1, -2];
        let bytes = samples.to_pcm16_bytes();
        assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(pcm16_from_bytes(&bytes), samples.to_vec());
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        assert_eq!(pcm16_from_bytes(&[0x10, 0x00, 0x7F]), vec![16]);
    }

    #[test]
    fn invalid_base64_is_discarded() {
        assert_eq!(decode_base64("not*base64!"), None);
        assert_eq!(decode_base64("AQI="), Some(vec![1, 2]));
    }

    #[test]
    fn encode_pcm16_matches_manual_pipeline() {
        let samples = [0.0f32, 0.5, -0.5];
        let expected = encode_base64(&convert_f32_to_i16(&samples).to_pcm16_bytes());
        assert_eq!(encode_pcm16(&samples), expected);
    }
}
