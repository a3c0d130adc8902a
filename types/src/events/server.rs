mod error;

pub use error::ErrorDetails;

use crate::response::ResponseResource;

/// `error`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    event_id: Option<String>,
    error: ErrorDetails,
}

impl ErrorEvent {
    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn error(&self) -> &ErrorDetails {
        &self.error
    }
}

/// `session.created` / `session.updated`. The echoed session is kept loosely typed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionEchoEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    session: serde_json::Value,
}

impl SessionEchoEvent {
    pub fn session_id(&self) -> Option<&str> {
        self.session.get("id").and_then(serde_json::Value::as_str)
    }
}

/// `input_audio_buffer.speech_started`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeechStartedEvent {
    #[serde(default)]
    event_id: Option<String>,
    /// Milliseconds since the session started when speech was detected
    #[serde(default)]
    audio_start_ms: Option<u64>,
    #[serde(default)]
    item_id: Option<String>,
}

impl SpeechStartedEvent {
    pub fn audio_start_ms(&self) -> Option<u64> {
        self.audio_start_ms
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }
}

/// `input_audio_buffer.speech_stopped`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeechStoppedEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    audio_end_ms: Option<u64>,
    #[serde(default)]
    item_id: Option<String>,
}

impl SpeechStoppedEvent {
    pub fn audio_end_ms(&self) -> Option<u64> {
        self.audio_end_ms
    }
}

/// Completed transcript of either the user's input audio or the assistant's spoken output.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    transcript: String,
}

impl TranscriptEvent {
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// `response.created` / `response.done`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response: ResponseResource,
}

impl ResponseEvent {
    pub fn response(&self) -> &ResponseResource {
        &self.response
    }
}

/// `response.audio.delta`. `delta` may be absent on older message shapes, in which
/// case the caller falls back to searching the raw frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseAudioDeltaEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    delta: Option<String>,
}

impl ResponseAudioDeltaEvent {
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    pub fn delta(&self) -> Option<&str> {
        self.delta.as_deref().filter(|d| !d.is_empty())
    }
}

/// `response.audio.done`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseAudioDoneEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
}

impl ResponseAudioDoneEvent {
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}

/// `response.function_call_arguments.done`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionCallArgumentsDoneEvent {
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

impl FunctionCallArgumentsDoneEvent {
    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arguments(&self) -> Option<&str> {
        self.arguments.as_deref()
    }
}

/// A tool invocation request in the client-tool protocol. It may arrive as its own
/// `client_tool_call` frame or nested under another message.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientToolCall {
    #[serde(default)]
    tool_call_id: Option<String>,
    #[serde(default)]
    tool_name: Option<String>,
    /// Either an object or a JSON-encoded string.
    #[serde(default)]
    parameters: serde_json::Value,
}

impl ClientToolCall {
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.tool_name.as_deref().filter(|name| !name.trim().is_empty())
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }
}

/// `client_tool_call`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientToolCallEvent {
    #[serde(default)]
    client_tool_call: ClientToolCall,
}

impl ClientToolCallEvent {
    pub fn call(&self) -> &ClientToolCall {
        &self.client_tool_call
    }
}

/// `ping`. Endpoints disagree on where the identifier lives.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PingEvent {
    #[serde(default)]
    ping_id: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    ping_event: Option<serde_json::Value>,
}

impl PingEvent {
    /// First identifier found among `ping_id`, `id` and `ping_event.event_id`.
    pub fn identifier(&self) -> Option<serde_json::Value> {
        self.ping_id
            .clone()
            .or_else(|| self.id.clone())
            .or_else(|| self.ping_event.as_ref().and_then(|e| e.get("event_id")).cloned())
            .filter(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ping_identifier_is_found_in_any_known_location() {
        let ping: PingEvent = serde_json::from_value(json!({"ping_id": 7})).unwrap();
        assert_eq!(ping.identifier(), Some(json!(7)));

        let ping: PingEvent = serde_json::from_value(json!({"ping_event": {"event_id": "abc", "ping_ms": 20}})).unwrap();
        assert_eq!(ping.identifier(), Some(json!("abc")));

        let ping: PingEvent = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ping.identifier(), None);
    }

    #[test]
    fn client_tool_call_treats_blank_fields_as_missing() {
        let call: ClientToolCall = serde_json::from_value(json!({"tool_call_id": " ", "tool_name": "wave"})).unwrap();
        assert_eq!(call.tool_call_id(), None);
        assert_eq!(call.tool_name(), Some("wave"));
        assert!(call.parameters().is_null());
    }
}
