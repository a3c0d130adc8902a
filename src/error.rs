use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is already connected or connecting")]
    AlreadyConnected,
    #[error("transport is not connected")]
    NotConnected,
    #[error("invalid connect request: {0}")]
    InvalidRequest(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("session is already connected or connecting")]
    AlreadyConnected,
    #[error("session is not connected")]
    NotConnected,
    #[error("connect attempt cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures while resolving or running a tool. Always turned into an error result
/// for the remote caller, never propagated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' is not available.")]
    UnknownTool(String),
    #[error("Missing required parameter '{0}'.")]
    MissingParameter(String),
    #[error("Failed to convert parameter '{name}' to type {expected}.")]
    InvalidArgument { name: String, expected: &'static str },
    #[error("Invalid tool arguments: {0}")]
    InvalidPayload(String),
    #[error("Tool '{tool}' failed: {message}")]
    Handler { tool: String, message: String },
}
