pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const REALTIME_ENDPOINT: &str = "REALTIME_ENDPOINT";
pub const REALTIME_MODEL: &str = "REALTIME_MODEL";
pub const REALTIME_VOICE: &str = "REALTIME_VOICE";
pub const REALTIME_INSTRUCTIONS: &str = "REALTIME_INSTRUCTIONS";
pub const REALTIME_INSTRUCTIONS_FILE: &str = "REALTIME_INSTRUCTIONS_FILE";
pub const REALTIME_TURN_DETECTION: &str = "REALTIME_TURN_DETECTION";
pub const REALTIME_VAD_EAGERNESS: &str = "REALTIME_VAD_EAGERNESS";
pub const REALTIME_OUTPUT_SAMPLE_RATE: &str = "REALTIME_OUTPUT_SAMPLE_RATE";
pub const REALTIME_INITIAL_RESPONSE: &str = "REALTIME_INITIAL_RESPONSE";
pub const REALTIME_TRANSCRIPTION: &str = "REALTIME_TRANSCRIPTION";
pub const REALTIME_SUPPRESS_ECHO: &str = "REALTIME_SUPPRESS_ECHO";
pub const CAPTURE_SAMPLE_RATE: &str = "CAPTURE_SAMPLE_RATE";
pub const CAPTURE_CHUNK_MS: &str = "CAPTURE_CHUNK_MS";

pub const BASE_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful teaching assistant. Keep answers short and clear.";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
pub const OPENAI_BETA_VALUE: &str = "realtime=v1";

pub const MAX_CAPTURE_SAMPLE_RATE: u32 = 48_000;
