//! Engine configuration.
//!
//! Values come from the builder or from environment variables (a `.env` file is
//! honoured). Nothing here is validated against the endpoint; the credential is only
//! checked when a connection is attempted.

pub mod consts;

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::transport::ConnectRequest;
use crate::types::audio::{Eagerness, InputAudioTranscription, SemanticVadTurnDetection, TranscriptionModel, TurnDetection, Voice};
use crate::utils::audio::REALTIME_API_PCM16_SAMPLE_RATE;
use crate::utils::capture::{CaptureSettings, MIN_SAMPLE_RATE};
use consts::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct Config {
    api_key: SecretString,
    endpoint_url: String,
    model: String,
    voice: Voice,
    instructions: String,
    turn_detection: Option<TurnDetection>,
    output_sample_rate: u32,
    request_initial_response: bool,
    input_transcription: Option<InputAudioTranscription>,
    capture: CaptureSettings,
    suppress_echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            endpoint_url: BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: Voice::Alloy,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            turn_detection: Some(TurnDetection::server_vad()),
            output_sample_rate: REALTIME_API_PCM16_SAMPLE_RATE,
            request_initial_response: false,
            input_transcription: None,
            capture: CaptureSettings::default(),
            suppress_echo: false,
        }
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: &str) -> Self {
        self.config.endpoint_url = endpoint_url.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.config.instructions = instructions.to_string();
        self
    }

    pub fn with_turn_detection(mut self, turn_detection: Option<TurnDetection>) -> Self {
        self.config.turn_detection = turn_detection;
        self
    }

    pub fn with_output_sample_rate(mut self, output_sample_rate: u32) -> Self {
        self.config.output_sample_rate = output_sample_rate.max(MIN_SAMPLE_RATE);
        self
    }

    pub fn with_initial_response(mut self, request_initial_response: bool) -> Self {
        self.config.request_initial_response = request_initial_response;
        self
    }

    pub fn with_input_transcription(mut self, transcription: Option<InputAudioTranscription>) -> Self {
        self.config.input_transcription = transcription;
        self
    }

    pub fn with_capture(mut self, capture: CaptureSettings) -> Self {
        self.config.capture = capture;
        self
    }

    pub fn with_suppress_echo(mut self, suppress_echo: bool) -> Self {
        self.config.suppress_echo = suppress_echo;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Reopens a loaded configuration for overrides.
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }

    /// Loads configuration from the process environment, reading `.env` first.
    ///
    /// * `OPENAI_API_KEY`: credential sent as a bearer token.
    /// * `REALTIME_ENDPOINT`, `REALTIME_MODEL`, `REALTIME_VOICE`: endpoint and identifiers.
    /// * `REALTIME_INSTRUCTIONS` or `REALTIME_INSTRUCTIONS_FILE`: system instructions.
    /// * `REALTIME_TURN_DETECTION`: `none`, `server_vad` or `semantic_vad`
    ///   (with `REALTIME_VAD_EAGERNESS`).
    /// * `REALTIME_OUTPUT_SAMPLE_RATE`, `REALTIME_INITIAL_RESPONSE`, `REALTIME_TRANSCRIPTION`,
    ///   `REALTIME_SUPPRESS_ECHO`, `CAPTURE_SAMPLE_RATE`, `CAPTURE_CHUNK_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut builder = ConfigBuilder::new();

        if let Some(key) = get(OPENAI_API_KEY) {
            builder = builder.with_api_key(&key);
        }
        if let Some(endpoint) = get(REALTIME_ENDPOINT) {
            builder = builder.with_endpoint_url(&endpoint);
        }
        if let Some(model) = get(REALTIME_MODEL) {
            builder = builder.with_model(&model);
        }
        if let Some(voice) = get(REALTIME_VOICE) {
            let Ok(voice) = voice.parse::<Voice>();
            builder = builder.with_voice(voice);
        }

        if let Some(path) = get(REALTIME_INSTRUCTIONS_FILE) {
            let path = PathBuf::from(path);
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?;
            builder = builder.with_instructions(text.trim());
        } else if let Some(instructions) = get(REALTIME_INSTRUCTIONS) {
            builder = builder.with_instructions(&instructions);
        }

        if let Some(mode) = get(REALTIME_TURN_DETECTION) {
            let eagerness = match get(REALTIME_VAD_EAGERNESS) {
                Some(value) => value
                    .parse::<Eagerness>()
                    .map_err(|_| ConfigError::InvalidVar { var: REALTIME_VAD_EAGERNESS, value })?,
                None => Eagerness::Auto,
            };
            builder = builder.with_turn_detection(parse_turn_detection(&mode, eagerness)?);
        }

        if let Some(rate) = get(REALTIME_OUTPUT_SAMPLE_RATE) {
            builder = builder.with_output_sample_rate(parse_u32(REALTIME_OUTPUT_SAMPLE_RATE, rate)?);
        }
        if let Some(flag) = get(REALTIME_INITIAL_RESPONSE) {
            builder = builder.with_initial_response(parse_bool(REALTIME_INITIAL_RESPONSE, flag)?);
        }
        if let Some(model) = get(REALTIME_TRANSCRIPTION) {
            let Ok(model) = model.parse::<TranscriptionModel>();
            builder = builder.with_input_transcription(Some(InputAudioTranscription::new(model)));
        }
        if let Some(flag) = get(REALTIME_SUPPRESS_ECHO) {
            builder = builder.with_suppress_echo(parse_bool(REALTIME_SUPPRESS_ECHO, flag)?);
        }

        let mut capture = CaptureSettings::default();
        if let Some(rate) = get(CAPTURE_SAMPLE_RATE) {
            let rate = parse_u32(CAPTURE_SAMPLE_RATE, rate)?.clamp(MIN_SAMPLE_RATE, MAX_CAPTURE_SAMPLE_RATE);
            capture = capture.with_sample_rate(rate);
        }
        if let Some(chunk) = get(CAPTURE_CHUNK_MS) {
            capture = capture.with_chunk_ms(parse_u32(CAPTURE_CHUNK_MS, chunk)?);
        }

        Ok(builder.with_capture(capture).build())
    }

    /// Checks the settings a connection cannot do without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingVar(OPENAI_API_KEY));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingVar(REALTIME_MODEL));
        }
        Ok(())
    }

    /// Endpoint with the model appended as a query parameter unless already present.
    pub fn realtime_url(&self) -> String {
        let endpoint = match self.endpoint_url.trim() {
            "" => BASE_URL,
            trimmed => trimmed,
        };
        if endpoint.to_ascii_lowercase().contains("model=") {
            return endpoint.to_string();
        }
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!("{endpoint}{separator}model={}", self.model.trim())
    }

    pub fn connect_request(&self) -> ConnectRequest {
        ConnectRequest::new(&self.realtime_url())
            .with_secret_header(
                AUTHORIZATION_HEADER,
                SecretString::from(format!("Bearer {}", self.api_key.expose_secret().trim())),
            )
            .with_header(OPENAI_BETA_HEADER, OPENAI_BETA_VALUE)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn turn_detection(&self) -> Option<&TurnDetection> {
        self.turn_detection.as_ref()
    }

    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    pub fn request_initial_response(&self) -> bool {
        self.request_initial_response
    }

    pub fn input_transcription(&self) -> Option<&InputAudioTranscription> {
        self.input_transcription.as_ref()
    }

    pub fn capture(&self) -> CaptureSettings {
        self.capture
    }

    pub fn suppress_echo(&self) -> bool {
        self.suppress_echo
    }
}

fn parse_turn_detection(mode: &str, eagerness: Eagerness) -> Result<Option<TurnDetection>, ConfigError> {
    match mode.to_ascii_lowercase().as_str() {
        "none" | "manual" | "off" => Ok(None),
        "server_vad" | "vad" => Ok(Some(TurnDetection::server_vad())),
        "semantic_vad" | "semantic" => Ok(Some(TurnDetection::SemanticVad(
            SemanticVadTurnDetection::default().with_eagerness(eagerness),
        ))),
        _ => Err(ConfigError::InvalidVar {
            var: REALTIME_TURN_DETECTION,
            value: mode.to_string(),
        }),
    }
}

fn parse_u32(var: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidVar { var, value })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() -> Result<()> {
        let config = Config::from_lookup(lookup(&[]))?;

        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.voice(), &Voice::Alloy);
        assert_eq!(config.instructions(), DEFAULT_INSTRUCTIONS);
        assert_eq!(config.output_sample_rate(), 24_000);
        assert_eq!(config.turn_detection().map(TurnDetection::kind), Some("server_vad"));
        assert!(!config.request_initial_response());
        assert!(matches!(config.validate(), Err(ConfigError::MissingVar(OPENAI_API_KEY))));
        Ok(())
    }

    #[test]
    fn environment_values_override_defaults() -> Result<()> {
        let config = Config::from_lookup(lookup(&[
            (OPENAI_API_KEY, "sk-test"),
            (REALTIME_VOICE, "verse"),
            (REALTIME_TURN_DETECTION, "semantic_vad"),
            (REALTIME_VAD_EAGERNESS, "low"),
            (REALTIME_INITIAL_RESPONSE, "yes"),
            (CAPTURE_SAMPLE_RATE, "96000"),
            (CAPTURE_CHUNK_MS, "5"),
        ]))?;

        config.validate()?;
        assert_eq!(config.voice(), &Voice::Verse);
        assert!(config.request_initial_response());
        assert_eq!(config.capture().sample_rate(), MAX_CAPTURE_SAMPLE_RATE);
        assert_eq!(config.capture().chunk_ms(), 20);
        match config.turn_detection() {
            Some(TurnDetection::SemanticVad(vad)) => assert_eq!(vad.eagerness(), Eagerness::Low),
            other => panic!("unexpected turn detection {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn manual_turns_and_bad_values() {
        let config = Config::from_lookup(lookup(&[(REALTIME_TURN_DETECTION, "none")])).unwrap();
        assert!(config.turn_detection().is_none());

        let err = Config::from_lookup(lookup(&[(REALTIME_OUTPUT_SAMPLE_RATE, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var: REALTIME_OUTPUT_SAMPLE_RATE, .. }));
    }

    #[test]
    fn instructions_can_be_loaded_from_file() -> Result<()> {
        // Arrange
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "  Speak like a pirate.  ")?;
        let path = file.path().to_string_lossy().to_string();

        // Act
        let config = Config::from_lookup(lookup(&[
            (REALTIME_INSTRUCTIONS_FILE, path.as_str()),
            (REALTIME_INSTRUCTIONS, "ignored"),
        ]))?;

        // Assert
        assert_eq!(config.instructions(), "Speak like a pirate.");
        Ok(())
    }

    #[test]
    fn missing_instructions_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.md");
        let err = Config::from_lookup(lookup(&[(REALTIME_INSTRUCTIONS_FILE, missing.to_str().unwrap())])).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn realtime_url_appends_model_once() {
        let config = Config::builder().with_model("m1").build();
        assert_eq!(config.realtime_url(), "wss://api.openai.com/v1/realtime?model=m1");

        let config = Config::builder().with_endpoint_url("wss://host/rt?x=1").with_model("m1").build();
        assert_eq!(config.realtime_url(), "wss://host/rt?x=1&model=m1");

        let config = Config::builder().with_endpoint_url("wss://host/rt?Model=other").build();
        assert_eq!(config.realtime_url(), "wss://host/rt?Model=other");

        let config = Config::builder().with_endpoint_url("   ").with_model("m2").build();
        assert_eq!(config.realtime_url(), "wss://api.openai.com/v1/realtime?model=m2");
    }

    #[test]
    fn debug_output_never_contains_the_key() {
        let config = Config::builder().with_api_key("sk-super-secret").build();
        let request = config.connect_request();

        assert!(!format!("{config:?}").contains("sk-super-secret"));
        assert!(!format!("{request:?}").contains("sk-super-secret"));
        assert_eq!(request.header(AUTHORIZATION_HEADER), Some("Bearer sk-super-secret"));
        assert_eq!(request.header(OPENAI_BETA_HEADER), Some(OPENAI_BETA_VALUE));
    }
}
