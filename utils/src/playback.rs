use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::audio::convert_i16_to_f32;

pub const DEFAULT_MAX_BUFFERED: Duration = Duration::from_secs(30 * 60);

const NEVER: u64 = u64::MAX;

/// Resamples by linear interpolation. Output length is `len * target / source`, rounded.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() || source_rate == 0 || target_rate == 0 || source_rate == target_rate {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = ((samples.len() as f64 * ratio).round() as usize).max(1);
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let position = i as f64 / ratio;
            let floor = (position.floor() as usize).min(last);
            let ceil = (floor + 1).min(last);
            let t = (position - floor as f64).clamp(0.0, 1.0) as f32;
            samples[floor] + (samples[ceil] - samples[floor]) * t
        })
        .collect()
}

/// FIFO of output-rate samples shared between the decode path (producer) and the
/// device pull callback (consumer). The lock is only ever held for a copy.
pub struct PlaybackQueue {
    output_rate: u32,
    max_samples: usize,
    samples: Mutex<VecDeque<f32>>,
    created: Instant,
    last_received_ms: AtomicU64,
}

impl PlaybackQueue {
    pub fn new(output_rate: u32) -> Self {
        Self {
            output_rate,
            max_samples: Self::samples_for(output_rate, DEFAULT_MAX_BUFFERED),
            samples: Mutex::new(VecDeque::new()),
            created: Instant::now(),
            last_received_ms: AtomicU64::new(NEVER),
        }
    }

    pub fn with_max_buffered(mut self, max_buffered: Duration) -> Self {
        self.max_samples = Self::samples_for(self.output_rate, max_buffered).max(1);
        self
    }

    fn samples_for(rate: u32, duration: Duration) -> usize {
        (rate as f64 * duration.as_secs_f64()) as usize
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Schedules a decoded PCM16 segment, resampling it to the output rate first.
    pub fn enqueue_samples(&self, samples: &[i16], source_rate: u32) {
        if samples.is_empty() {
            return;
        }
        let floats = convert_i16_to_f32(samples);
        let resampled = resample_linear(&floats, source_rate, self.output_rate);
        self.push(&resampled);
    }

    fn push(&self, samples: &[f32]) {
        let trimmed = {
            let mut queue = self.samples.lock();
            queue.extend(samples.iter().copied());
            let excess = queue.len().saturating_sub(self.max_samples);
            queue.drain(..excess);
            excess
        };
        self.last_received_ms.store(self.elapsed_ms(), Ordering::Relaxed);
        if trimmed > 0 {
            tracing::warn!(trimmed, "Playback buffer over limit; dropped oldest audio");
        }
    }

    /// Drops everything buffered. Used on barge-in.
    pub fn clear(&self) {
        let dropped = {
            let mut queue = self.samples.lock();
            let len = queue.len();
            queue.clear();
            len
        };
        if dropped > 0 {
            tracing::debug!(dropped, "Playback cleared");
        }
    }

    /// Pull callback for a mono stream. Missing samples are written as silence.
    pub fn fill(&self, out: &mut [f32]) {
        let mut queue = self.samples.lock();
        for slot in out.iter_mut() {
            *slot = queue.pop_front().unwrap_or(0.0);
        }
    }

    /// Pull callback for an interleaved stream; each sample is copied to every channel.
    pub fn fill_interleaved(&self, out: &mut [f32], channels: usize) {
        if channels <= 1 {
            self.fill(out);
            return;
        }
        let mut queue = self.samples.lock();
        for frame in out.chunks_mut(channels) {
            let sample = queue.pop_front().unwrap_or(0.0);
            frame.fill(sample);
        }
    }

    pub fn queued_samples(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn buffered_duration(&self) -> Duration {
        Duration::from_secs_f64(self.queued_samples() as f64 / self.output_rate.max(1) as f64)
    }

    /// Whether a segment was enqueued within `tolerance`.
    pub fn has_recent_audio(&self, tolerance: Duration) -> bool {
        let last = self.last_received_ms.load(Ordering::Relaxed);
        if last == NEVER {
            return false;
        }
        self.elapsed_ms().saturating_sub(last) <= tolerance.as_millis() as u64
    }

    fn elapsed_ms(&self) -> u64 {
        self.created.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(rate: u32, seconds: f32, freq: f32) -> Vec<f32> {
        let len = (rate as f32 * seconds) as usize;
        (0..len)
            .map(|n| (2.0 * std::f32::consts::PI * freq * n as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn resampling_preserves_duration_within_one_sample() {
        let pairs = [(24_000u32, 48_000u32), (24_000, 44_100), (16_000, 48_000), (48_000, 24_000), (44_100, 8_000)];
        for (from, to) in pairs {
            for seconds in [0.013f32, 0.25, 1.0] {
                let input = tone(from, seconds, 440.0);
                let output = resample_linear(&input, from, to);
                let expected = input.len() as f64 * to as f64 / from as f64;
                assert!(
                    (output.len() as f64 - expected).abs() <= 1.0,
                    "{from}->{to}: {} vs {expected}",
                    output.len()
                );
            }
        }
    }

    #[test]
    fn upsampling_interpolates_between_neighbours_and_clamps_at_edges() {
        let output = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(output, vec![0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn matching_rates_pass_through() {
        let queue = PlaybackQueue::new(24_000);
        queue.enqueue_samples(&[0, 16_384, -16_384], 24_000);
        let mut out = [9.0f32; 3];
        queue.fill(&mut out);
        assert_eq!(out, [0.0, 0.5, -0.5]);
    }

    #[test]
    fn underrun_yields_silence() {
        let queue = PlaybackQueue::new(48_000);
        queue.enqueue_samples(&[16_384], 48_000);
        let mut out = [9.0f32; 4];
        queue.fill(&mut out);
        assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn clear_always_leaves_queue_silent_until_next_enqueue() {
        let queue = PlaybackQueue::new(24_000);
        for round in 0..20usize {
            let enqueues = round % 4;
            for _ in 0..enqueues {
                queue.enqueue_samples(&vec![1_000i16; 37 * (round + 1)], 16_000);
            }
            if round % 3 == 0 {
                let mut partial = vec![0.0f32; 11];
                queue.fill(&mut partial);
            }
            queue.clear();
            assert_eq!(queue.queued_samples(), 0);

            let mut out = vec![1.0f32; 64];
            queue.fill(&mut out);
            assert!(out.iter().all(|&s| s == 0.0));
        }

        queue.enqueue_samples(&[8_192], 24_000);
        let mut out = [0.0f32; 1];
        queue.fill(&mut out);
        assert_eq!(out, [0.25]);
    }

    #[test]
    fn buffer_limit_drops_oldest_samples() {
        let queue = PlaybackQueue::new(1_000).with_max_buffered(Duration::from_millis(4));
        queue.enqueue_samples(&[1, 2, 3], 1_000);
        queue.enqueue_samples(&[4, 5, 6], 1_000);
        assert_eq!(queue.queued_samples(), 4);

        let mut out = [0.0f32; 4];
        queue.fill(&mut out);
        let expected: Vec<f32> = [3i16, 4, 5, 6].iter().map(|&s| s as f32 / 32768.0).collect();
        assert_eq!(out.to_vec(), expected);
    }

    #[test]
    fn interleaved_fill_duplicates_across_channels() {
        let queue = PlaybackQueue::new(24_000);
        queue.enqueue_samples(&[16_384, -16_384], 24_000);
        let mut out = [1.0f32; 6];
        queue.fill_interleaved(&mut out, 2);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn recent_audio_tracks_last_enqueue() {
        let queue = PlaybackQueue::new(24_000);
        assert!(!queue.has_recent_audio(Duration::from_secs(5)));

        queue.enqueue_samples(&[1, 2, 3], 24_000);
        assert!(queue.has_recent_audio(Duration::from_secs(5)));

        queue.clear();
        assert!(queue.has_recent_audio(Duration::from_secs(5)));
    }

    #[test]
    fn recent_audio_expires_after_tolerance() {
        let queue = PlaybackQueue::new(24_000);
        queue.enqueue_samples(&[1, 2, 3], 24_000);

        std::thread::sleep(Duration::from_millis(30));

        assert!(!queue.has_recent_audio(Duration::from_millis(5)));
        assert!(!queue.has_recent_audio(Duration::ZERO));
        assert!(queue.has_recent_audio(Duration::from_secs(5)));
    }
}
