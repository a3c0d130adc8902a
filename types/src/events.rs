pub mod client;
pub mod server;

pub use client::*;
pub use server::*;

/// Outbound frames. Every variant serializes to a single JSON text frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdateEvent),
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend(InputAudioBufferAppendEvent),
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit(BufferEvent),
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear(BufferEvent),
    #[serde(rename = "output_audio_buffer.clear")]
    OutputAudioBufferClear(BufferEvent),
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(ConversationItemCreateEvent),
    #[serde(rename = "response.create")]
    ResponseCreate(ResponseCreateEvent),
    #[serde(rename = "response.cancel")]
    ResponseCancel(ResponseCancelEvent),
    #[serde(rename = "client_tool_result")]
    ClientToolResult(ClientToolResultEvent),
    #[serde(rename = "pong")]
    Pong(PongEvent),
}

impl ClientEvent {
    /// Wire name of the event, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate(_) => "session.update",
            ClientEvent::InputAudioBufferAppend(_) => "input_audio_buffer.append",
            ClientEvent::InputAudioBufferCommit(_) => "input_audio_buffer.commit",
            ClientEvent::InputAudioBufferClear(_) => "input_audio_buffer.clear",
            ClientEvent::OutputAudioBufferClear(_) => "output_audio_buffer.clear",
            ClientEvent::ConversationItemCreate(_) => "conversation.item.create",
            ClientEvent::ResponseCreate(_) => "response.create",
            ClientEvent::ResponseCancel(_) => "response.cancel",
            ClientEvent::ClientToolResult(_) => "client_tool_result",
            ClientEvent::Pong(_) => "pong",
        }
    }
}

/// Inbound frames the engine understands. Tags are matched after the controller
/// lowercases the `type` field; anything else lands in `Unknown`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionEchoEvent),
    #[serde(rename = "session.updated")]
    SessionUpdated(SessionEchoEvent),
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted(SpeechStartedEvent),
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped(SpeechStoppedEvent),
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputTranscriptionCompleted(TranscriptEvent),
    #[serde(rename = "response.created")]
    ResponseCreated(ResponseEvent),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseEvent),
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta", alias = "audio")]
    ResponseAudioDelta(ResponseAudioDeltaEvent),
    #[serde(rename = "response.audio.done", alias = "response.output_audio.done")]
    ResponseAudioDone(ResponseAudioDoneEvent),
    #[serde(rename = "response.audio_transcript.done", alias = "response.output_audio_transcript.done")]
    ResponseAudioTranscriptDone(TranscriptEvent),
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone(FunctionCallArgumentsDoneEvent),
    #[serde(rename = "client_tool_call")]
    ClientToolCall(ClientToolCallEvent),
    #[serde(rename = "ping")]
    Ping(PingEvent),
    /// End of an assistant turn on endpoints that stream bare `audio` messages.
    #[serde(rename = "agent_response_completed")]
    AgentResponseCompleted,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageItem;
    use serde_json::json;

    #[test]
    fn client_events_carry_wire_type_tags() {
        let append = ClientEvent::InputAudioBufferAppend(InputAudioBufferAppendEvent::new("AAA="));
        assert_eq!(
            serde_json::to_value(&append).unwrap(),
            json!({"type": "input_audio_buffer.append", "audio": "AAA="})
        );

        let clear = ClientEvent::OutputAudioBufferClear(BufferEvent::new());
        assert_eq!(serde_json::to_value(&clear).unwrap(), json!({"type": "output_audio_buffer.clear"}));

        let scoped = ClientEvent::ResponseCancel(ResponseCancelEvent::new().with_response_id("r1"));
        assert_eq!(
            serde_json::to_value(&scoped).unwrap(),
            json!({"type": "response.cancel", "response_id": "r1"})
        );
        assert_eq!(scoped.kind(), "response.cancel");
    }

    #[test]
    fn user_message_item_is_nested_under_item() {
        let event = ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(
            crate::Item::Message(MessageItem::user_text("hello")),
        ));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["item"]["type"], "message");
        assert_eq!(value["item"]["role"], "user");
        assert_eq!(value["item"]["content"][0], json!({"type": "input_text", "text": "hello"}));
    }

    #[test]
    fn unknown_server_types_deserialize_to_unknown() {
        let event: ServerEvent = serde_json::from_value(json!({"type": "rate_limits.updated", "rate_limits": []})).unwrap();
        assert_eq!(event, ServerEvent::Unknown);
    }

    #[test]
    fn agent_response_completed_is_a_unit_event() {
        let event: ServerEvent =
            serde_json::from_value(json!({"type": "agent_response_completed", "event_id": 4})).unwrap();
        assert_eq!(event, ServerEvent::AgentResponseCompleted);
    }

    #[test]
    fn audio_delta_accepts_ga_alias() {
        let event: ServerEvent = serde_json::from_value(json!({
            "type": "response.output_audio.delta",
            "response_id": "r9",
            "delta": "AQI="
        }))
        .unwrap();
        match event {
            ServerEvent::ResponseAudioDelta(delta) => {
                assert_eq!(delta.response_id(), Some("r9"));
                assert_eq!(delta.delta(), Some("AQI="));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn response_done_exposes_cancel_reason_and_function_calls() {
        let event: ServerEvent = serde_json::from_value(json!({
            "type": "response.done",
            "event_id": "e1",
            "response": {
                "id": "r1",
                "status": "cancelled",
                "status_details": {"type": "cancelled", "reason": "turn_detected"},
                "output": [
                    {"type": "message", "role": "assistant", "content": []},
                    {"type": "function_call", "call_id": "c1", "name": "wave", "arguments": "{}"}
                ],
                "usage": {"total_tokens": 12, "input_tokens": 4, "output_tokens": 8}
            }
        }))
        .unwrap();
        let ServerEvent::ResponseDone(done) = event else {
            panic!("expected response.done");
        };
        let response = done.response();
        assert_eq!(response.id(), Some("r1"));
        assert!(response.is_turn_detected_cancellation());
        assert_eq!(response.function_calls().count(), 1);
        assert_eq!(response.usage().map(|u| u.total_tokens), Some(12));
    }
}
