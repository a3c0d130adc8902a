//! Audio plumbing for the realtime voice engine: PCM16 codec, microphone capture
//! chunking, the playback queue, and cpal device adapters.
pub mod audio;
pub mod capture;
pub mod device;
pub mod playback;
