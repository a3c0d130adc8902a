//! Realtime voice session engine: streams microphone audio to a realtime
//! conversational endpoint, plays back the assistant's audio with barge-in, and
//! answers the model's tool calls with host-provided capabilities.
pub mod agent;
pub mod config;
pub mod error;
pub mod session;
pub mod tools;
pub mod transport;

pub use realtime_voice_types as types;
pub use realtime_voice_utils as utils;

pub use agent::{AgentCommand, AgentHandle, VoiceAgent};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use error::{SessionError, ToolError, TransportError};
pub use session::{AudioSink, ConnectionStatus, SessionController, SessionEvent};
pub use transport::{ConnectRequest, Transport, TransportEvent, WebSocketTransport};
