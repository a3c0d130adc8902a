use crate::audio::Base64EncodedAudioBytes;
use crate::content::items::Item;
use crate::session::Session;

/// `session.update`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionUpdateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    session: Session,
}

impl SessionUpdateEvent {
    pub fn new(session: Session) -> Self {
        Self { event_id: None, session }
    }

    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// `input_audio_buffer.append`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputAudioBufferAppendEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    audio: Base64EncodedAudioBytes,
}

impl InputAudioBufferAppendEvent {
    pub fn new(audio: &str) -> Self {
        Self {
            event_id: None,
            audio: audio.to_string(),
        }
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }
}

/// Payload-less buffer events: `input_audio_buffer.commit`, `input_audio_buffer.clear`
/// and `output_audio_buffer.clear`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BufferEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
}

impl BufferEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }
}

/// `conversation.item.create`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationItemCreateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_item_id: Option<String>,
    item: Item,
}

impl ConversationItemCreateEvent {
    pub fn new(item: Item) -> Self {
        Self {
            event_id: None,
            previous_item_id: None,
            item,
        }
    }

    pub fn with_previous_item_id(mut self, previous_item_id: &str) -> Self {
        self.previous_item_id = Some(previous_item_id.to_string());
        self
    }

    pub fn item(&self) -> &Item {
        &self.item
    }
}

/// Per-response overrides for `response.create`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// `response.create`
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseCreateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<ResponseOptions>,
}

impl ResponseCreateEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, response: ResponseOptions) -> Self {
        self.response = Some(response);
        self
    }

    pub fn response(&self) -> Option<&ResponseOptions> {
        self.response.as_ref()
    }
}

/// `response.cancel`. Without a response id the server cancels whatever is in progress.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseCancelEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_id: Option<String>,
}

impl ResponseCancelEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_id(mut self, response_id: &str) -> Self {
        self.response_id = Some(response_id.to_string());
        self
    }

    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }
}

/// `client_tool_result`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClientToolResultEvent {
    tool_call_id: String,
    result: String,
    is_error: bool,
}

impl ClientToolResultEvent {
    pub fn new(tool_call_id: &str, result: &str, is_error: bool) -> Self {
        let result = if result.trim().is_empty() { "{}" } else { result };
        Self {
            tool_call_id: tool_call_id.to_string(),
            result: result.to_string(),
            is_error,
        }
    }

    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// `pong`
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PongEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ping_id: Option<serde_json::Value>,
}

impl PongEvent {
    pub fn new(ping_id: Option<serde_json::Value>) -> Self {
        Self { ping_id }
    }

    pub fn ping_id(&self) -> Option<&serde_json::Value> {
        self.ping_id.as_ref()
    }
}
