//! Protocol session controller.
//!
//! Owns the connection lifecycle, routes inbound frames to playback and tool
//! dispatch, and turns host actions (audio chunks, user messages, cancellation)
//! into outbound frames. All state is mutated from the task that drives the
//! controller; only the playback queue behind [`AudioSink`] is shared with the
//! audio thread.

mod compat;
mod segment;
mod state;
mod stats;

pub use segment::AudioSegment;
pub use state::{ActiveResponses, ConnectionStatus, ResponseStatus};
pub use stats::Stats;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{SessionError, ToolError, TransportError};
use crate::tools::{CapabilityRegistry, ToolCall, ToolOutput, ToolProtocol};
use crate::transport::{Transport, TransportEvent};
use crate::types::audio::{TurnDetection, Voice};
use crate::types::events::{
    BufferEvent, ClientToolResultEvent, ConversationItemCreateEvent, InputAudioBufferAppendEvent, PongEvent,
    ResponseCancelEvent, ResponseCreateEvent, ResponseEvent, SessionUpdateEvent,
};
use crate::types::session::SessionConfigurator;
use crate::types::{ClientEvent, FunctionCallOutputItem, Item, MessageItem, ServerEvent};
use crate::utils::audio::{encode_base64, ToBinary};
use crate::utils::playback::PlaybackQueue;

const NOTIFICATION_CAPACITY: usize = 256;

/// Where completed response audio goes. Implemented by [`PlaybackQueue`].
#[cfg_attr(test, mockall::automock)]
pub trait AudioSink: Send + Sync {
    fn enqueue_samples(&self, samples: &[i16], source_rate: u32);

    fn clear(&self);

    fn has_recent_audio(&self, tolerance: Duration) -> bool;
}

impl AudioSink for PlaybackQueue {
    fn enqueue_samples(&self, samples: &[i16], source_rate: u32) {
        PlaybackQueue::enqueue_samples(self, samples, source_rate);
    }

    fn clear(&self) {
        PlaybackQueue::clear(self);
    }

    fn has_recent_audio(&self, tolerance: Duration) -> bool {
        PlaybackQueue::has_recent_audio(self, tolerance)
    }
}

/// Notifications broadcast to subscribers of [`SessionController::subscribe`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(ConnectionStatus),
    Error(String),
    SpeechStarted,
    SpeechStopped,
    ResponseCreated(Option<String>),
    ResponseDone {
        response_id: Option<String>,
        status: Option<String>,
    },
    /// A finished segment was handed to playback.
    AudioSegment {
        response_id: Option<String>,
        samples: usize,
    },
    UserTranscript(String),
    AssistantTranscript(String),
    ToolResult {
        call_id: String,
        tool: Option<String>,
        is_error: bool,
    },
}

pub struct SessionController {
    config: Config,
    transport: Box<dyn Transport>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    status: ConnectionStatus,
    voice: Voice,
    instructions: String,
    turn_detection: Option<TurnDetection>,
    responses: ActiveResponses,
    segment: AudioSegment,
    output_rate: u32,
    sink: Arc<dyn AudioSink>,
    capabilities: CapabilityRegistry,
    dispatched_calls: HashSet<String>,
    notifications: broadcast::Sender<SessionEvent>,
    stats: Stats,
}

impl SessionController {
    pub fn new<T>(config: Config, transport: T, sink: Arc<dyn AudioSink>) -> Self
    where
        T: Transport + 'static,
    {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            voice: config.voice().clone(),
            instructions: config.instructions().to_string(),
            turn_detection: config.turn_detection().cloned(),
            output_rate: config.output_sample_rate(),
            config,
            transport: Box::new(transport),
            events: None,
            status: ConnectionStatus::Disconnected,
            responses: ActiveResponses::new(),
            segment: AudioSegment::new(),
            sink,
            capabilities: CapabilityRegistry::new(),
            dispatched_calls: HashSet::new(),
            notifications,
            stats: Stats::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityRegistry) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub fn active_responses(&self) -> &ActiveResponses {
        &self.responses
    }

    pub fn segment(&self) -> &AudioSegment {
        &self.segment
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Sample rate of incoming assistant audio. Starts at the configured rate and
    /// follows any output format the endpoint announces.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The turn detection last transmitted, or to be transmitted on connect.
    pub fn turn_detection(&self) -> Option<&TurnDetection> {
        self.turn_detection.as_ref()
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.capabilities
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.notifications.subscribe()
    }

    /// Assistant audio is still arriving or was played within `tolerance`.
    pub fn is_assistant_speaking(&self, tolerance: Duration) -> bool {
        self.segment.is_open() || self.sink.has_recent_audio(tolerance)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.notifications.send(event);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            tracing::info!("session {}", status);
            self.status = status;
            self.notify(SessionEvent::StatusChanged(status));
        }
    }

    /// Opens the connection and configures the session. Credentials are checked
    /// before the transport is touched. Cancelling `cancel` aborts the attempt and
    /// releases whatever the transport had set up.
    pub async fn connect(&mut self, cancel: &CancellationToken) -> Result<(), SessionError> {
        if self.status != ConnectionStatus::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        self.config.validate()?;

        self.set_status(ConnectionStatus::Connecting);
        let request = self.config.connect_request();
        tracing::info!(url = %request.url(), "connecting to realtime endpoint");

        let transport = &mut self.transport;
        let attempt = async {
            let mut events = transport.connect(&request).await?;
            let first = events.recv().await;
            Ok::<_, TransportError>((events, first))
        };
        let outcome = tokio::select! {
            _ = cancel.cancelled() => None,
            result = attempt => Some(result),
        };

        match outcome {
            None => {
                tracing::info!("connect cancelled");
                if let Err(e) = self.transport.close("connect cancelled").await {
                    tracing::debug!("close after cancelled connect: {}", e);
                }
                self.set_status(ConnectionStatus::Disconnected);
                Err(SessionError::Cancelled)
            }
            Some(Err(e)) => {
                tracing::error!("failed to connect: {}", e);
                self.notify(SessionEvent::Error(e.to_string()));
                self.set_status(ConnectionStatus::Disconnected);
                Err(e.into())
            }
            Some(Ok((events, Some(TransportEvent::Connected)))) => {
                self.events = Some(events);
                self.on_connected().await;
                Ok(())
            }
            Some(Ok((_, other))) => {
                tracing::error!("connection ended during handshake: {:?}", other);
                self.notify(SessionEvent::Error("connection ended during handshake".to_string()));
                if let Err(e) = self.transport.close("handshake failed").await {
                    tracing::debug!("close after failed handshake: {}", e);
                }
                self.set_status(ConnectionStatus::Disconnected);
                Err(TransportError::Closed.into())
            }
        }
    }

    async fn on_connected(&mut self) {
        self.set_status(ConnectionStatus::Connected);
        self.responses.clear();
        self.segment.reset();
        self.output_rate = self.config.output_sample_rate();
        self.dispatched_calls.clear();
        self.stats = Stats::new();
        self.capabilities.discover();

        let update = self.session_update(&self.voice, &self.instructions, self.turn_detection.as_ref());
        self.send(update).await;

        if self.config.request_initial_response() {
            self.request_response().await;
        }
    }

    fn session_update(&self, voice: &Voice, instructions: &str, turn_detection: Option<&TurnDetection>) -> ClientEvent {
        let session = SessionConfigurator::new()
            .with_modalities_enable_audio()
            .with_voice(voice.clone())
            .with_instructions(instructions)
            .with_input_audio_transcription(self.config.input_transcription().cloned())
            .with_turn_detection(turn_detection.cloned())
            .with_tools(self.capabilities.tool_schemas())
            .build();
        ClientEvent::SessionUpdate(SessionUpdateEvent::new(session))
    }

    /// Closes the connection. Safe to call in any state.
    pub async fn disconnect(&mut self) {
        if self.status == ConnectionStatus::Disconnected {
            return;
        }
        self.teardown("client disconnect").await;
    }

    async fn teardown(&mut self, reason: &str) {
        if self.events.take().is_some() {
            if let Err(e) = self.transport.close(reason).await {
                tracing::debug!("close during teardown: {}", e);
            }
        }
        self.responses.clear();
        self.segment.reset();
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Waits for the next transport notification. Never resolves while disconnected.
    pub async fn next_event(&mut self) -> TransportEvent {
        match self.events.as_mut() {
            Some(events) => events.recv().await.unwrap_or(TransportEvent::Closed(None)),
            None => std::future::pending().await,
        }
    }

    /// Waits for and handles one transport notification. Returns `false` once
    /// the session is disconnected.
    pub async fn process_next(&mut self) -> bool {
        if self.events.is_none() {
            return false;
        }
        let event = self.next_event().await;
        self.handle_transport_event(event).await;
        self.is_connected()
    }

    pub async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                if !self.is_connected() {
                    self.on_connected().await;
                }
            }
            TransportEvent::Text(text) => self.handle_text(&text).await,
            TransportEvent::Binary(bytes) => {
                tracing::warn!(len = bytes.len(), "unexpected binary message");
            }
            TransportEvent::Error(message) => {
                tracing::error!("transport error: {}", message);
                self.notify(SessionEvent::Error(message));
                self.teardown("transport error").await;
            }
            TransportEvent::Closed(reason) => {
                tracing::info!("connection closed: {:?}", reason);
                self.teardown("connection closed").await;
            }
        }
    }

    /// Routes one inbound text frame. Malformed frames are logged and dropped.
    pub async fn handle_text(&mut self, text: &str) {
        let mut message: Value = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(len = text.len(), "discarding malformed message: {}", e);
                return;
            }
        };

        // Type tags are matched case-insensitively.
        if let Some(Value::String(kind)) = message.as_object_mut().and_then(|m| m.get_mut("type")) {
            *kind = kind.to_ascii_lowercase();
        }
        let kind = message.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string();
        let event_id = message.get("event_id").and_then(Value::as_str).unwrap_or("unknown");
        tracing::debug!("received message: {}, id={}", kind, event_id);

        if kind != "client_tool_call" {
            if let Some(call) = compat::nested_tool_call(&message) {
                self.dispatch_tool_call(ToolCall::from(&call)).await;
            }
        }

        if let Some(rate) = compat::find_output_sample_rate(&message) {
            self.set_output_rate(rate);
        }

        let event = match ServerEvent::deserialize(&message) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("failed to deserialize event: {}, type=> {}", e, kind);
                return;
            }
        };

        match event {
            ServerEvent::Error(error) => {
                let details = error.error();
                let description = match details.message().trim() {
                    "" => "unknown error".to_string(),
                    message => message.to_string(),
                };
                tracing::error!(code = ?details.code(), "server error: {}", description);
                self.notify(SessionEvent::Error(description));
            }
            ServerEvent::SessionCreated(session) => {
                tracing::info!(session_id = ?session.session_id(), "session created");
            }
            ServerEvent::SessionUpdated(_) => tracing::debug!("session updated"),
            ServerEvent::SpeechStarted(_) => {
                tracing::debug!("user speech started; interrupting playback");
                self.interrupt_playback();
                self.notify(SessionEvent::SpeechStarted);
            }
            ServerEvent::SpeechStopped(_) => self.notify(SessionEvent::SpeechStopped),
            ServerEvent::InputTranscriptionCompleted(transcript) => {
                tracing::info!("user: {}", transcript.transcript().trim());
                self.notify(SessionEvent::UserTranscript(transcript.transcript().to_string()));
            }
            ServerEvent::ResponseCreated(created) => {
                let id = created.response().id().map(str::to_string);
                if let Some(id) = &id {
                    self.responses.register(id, ResponseStatus::Created);
                }
                self.notify(SessionEvent::ResponseCreated(id));
            }
            ServerEvent::ResponseDone(done) => self.on_response_done(&done).await,
            ServerEvent::ResponseAudioDelta(delta) => {
                let payload = delta
                    .delta()
                    .map(str::to_string)
                    .or_else(|| compat::find_audio_payload(&message));
                match payload {
                    Some(payload) => self.on_audio_delta(delta.response_id(), &payload),
                    None => tracing::debug!("audio delta without payload"),
                }
                if compat::is_final_chunk(&message) {
                    self.flush_segment();
                }
            }
            ServerEvent::ResponseAudioDone(done) => {
                self.flush_segment();
                if let Some(id) = done.response_id() {
                    self.responses.finish(id, ResponseStatus::Done);
                }
            }
            ServerEvent::ResponseAudioTranscriptDone(transcript) => {
                tracing::info!("assistant: {}", transcript.transcript().trim());
                self.notify(SessionEvent::AssistantTranscript(transcript.transcript().to_string()));
            }
            ServerEvent::FunctionCallArgumentsDone(call) => {
                let call = ToolCall::function_call(call.call_id(), call.name(), call.arguments());
                self.dispatch_tool_call(call).await;
            }
            ServerEvent::ClientToolCall(call) => {
                self.dispatch_tool_call(ToolCall::from(call.call())).await;
            }
            ServerEvent::Ping(ping) => {
                self.send(ClientEvent::Pong(PongEvent::new(ping.identifier()))).await;
            }
            ServerEvent::AgentResponseCompleted => self.flush_segment(),
            ServerEvent::Unknown => tracing::trace!("ignoring message type {}", kind),
        }
    }

    fn on_audio_delta(&mut self, response_id: Option<&str>, payload: &str) {
        // Audio for a different response closes the segment that was open.
        if self.segment.is_open() && response_id.is_some() && self.segment.response_id() != response_id {
            self.flush_segment();
        }
        if let Some(id) = response_id {
            self.responses.register(id, ResponseStatus::Streaming);
        }
        if !self.segment.append_base64(response_id, payload) {
            tracing::warn!(response_id = ?response_id, "dropping undecodable audio delta");
        }
    }

    async fn on_response_done(&mut self, done: &ResponseEvent) {
        let response = done.response();
        if let Some(id) = response.id() {
            let cancelled = response.status().is_some_and(|s| s.eq_ignore_ascii_case("cancelled"));
            let outcome = if cancelled { ResponseStatus::Cancelled } else { ResponseStatus::Done };
            self.responses.finish(id, outcome);
        }

        if let Some(usage) = response.usage() {
            self.stats.update_usage(usage);
            tracing::debug!(
                "total_tokens: {}, input_tokens: {}, output_tokens: {}",
                usage.total_tokens,
                usage.input_tokens,
                usage.output_tokens
            );
        }

        if response.is_turn_detected_cancellation() {
            tracing::debug!(response_id = ?response.id(), "response cancelled by turn detection");
            self.interrupt_playback();
        }

        let calls: Vec<ToolCall> = response.function_calls().map(ToolCall::from).collect();
        for call in calls {
            self.dispatch_tool_call(call).await;
        }

        self.notify(SessionEvent::ResponseDone {
            response_id: response.id().map(str::to_string),
            status: response.status().map(str::to_string),
        });
    }

    fn set_output_rate(&mut self, rate: u32) {
        if rate == self.output_rate {
            return;
        }
        // Samples already aggregated belong to the previous rate.
        self.flush_segment();
        tracing::info!(rate, "assistant output sample rate updated");
        self.output_rate = rate;
    }

    /// Hands the open segment to playback.
    fn flush_segment(&mut self) {
        if let Some((response_id, samples)) = self.segment.take() {
            tracing::debug!(response_id = ?response_id, samples = samples.len(), "audio segment complete");
            self.sink.enqueue_samples(&samples, self.output_rate);
            self.notify(SessionEvent::AudioSegment {
                response_id,
                samples: samples.len(),
            });
        }
    }

    /// Drops partial assistant audio and whatever is queued for playback.
    fn interrupt_playback(&mut self) {
        self.segment.reset();
        self.sink.clear();
    }

    /// Best-effort send. Failures are logged and broadcast, never returned.
    async fn send(&mut self, event: ClientEvent) -> bool {
        if !self.is_connected() {
            tracing::debug!("not connected; dropping {}", event.kind());
            return false;
        }
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("failed to serialize event: {}", e);
                return false;
            }
        };
        match self.transport.send_text(text).await {
            Ok(()) => {
                tracing::trace!("sent {}", event.kind());
                true
            }
            Err(e) => {
                tracing::warn!("failed to send {}: {}", event.kind(), e);
                self.notify(SessionEvent::Error(e.to_string()));
                false
            }
        }
    }

    /// Appends raw little-endian PCM16 bytes to the input audio buffer.
    pub async fn send_audio_chunk(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let audio = encode_base64(bytes);
        self.send(ClientEvent::InputAudioBufferAppend(InputAudioBufferAppendEvent::new(&audio)))
            .await;
    }

    pub async fn send_audio_samples(&mut self, samples: &[f32]) {
        self.send_audio_chunk(&samples.to_pcm16_bytes()).await;
    }

    /// Commits the input buffer as a user turn. Needed only with manual turn detection.
    pub async fn commit_audio(&mut self) {
        self.send(ClientEvent::InputAudioBufferCommit(BufferEvent::new())).await;
    }

    pub async fn request_response(&mut self) {
        self.send(ClientEvent::ResponseCreate(ResponseCreateEvent::new())).await;
    }

    /// Cancels every tracked response, clears both audio buffers on the endpoint
    /// and drops local playback.
    pub async fn cancel_active_responses(&mut self) {
        let ids = self.responses.ids();
        if ids.is_empty() {
            self.send(ClientEvent::ResponseCancel(ResponseCancelEvent::new())).await;
        } else {
            for id in &ids {
                self.send(ClientEvent::ResponseCancel(ResponseCancelEvent::new().with_response_id(id)))
                    .await;
            }
        }
        self.send(ClientEvent::OutputAudioBufferClear(BufferEvent::new())).await;
        self.send(ClientEvent::InputAudioBufferClear(BufferEvent::new())).await;

        self.interrupt_playback();
        self.responses.cancel_all();
        tracing::debug!(cancelled = ids.len(), "active responses cancelled");
    }

    pub async fn send_user_message(&mut self, text: &str, interrupt: bool, request_response: bool) {
        let text = text.trim();
        if text.is_empty() {
            tracing::warn!("ignoring empty user message");
            return;
        }
        if interrupt {
            self.cancel_active_responses().await;
        }
        let item = Item::Message(MessageItem::user_text(text));
        self.send(ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(item)))
            .await;
        if request_response {
            self.request_response().await;
        }
    }

    /// Fires a discovered event. Returns `false` if the event is unknown or its
    /// handler failed; nothing is sent in that case.
    pub async fn publish_event(&mut self, name: &str) -> bool {
        let Some(pending) = self.capabilities.trigger_event(name) else {
            return false;
        };
        tracing::info!(event = %pending.event, "publishing event");
        self.send_user_message(&pending.message, pending.interrupt_response, pending.request_response)
            .await;
        true
    }

    /// Runs a remote tool call and acknowledges it exactly once. Calls without an
    /// id cannot be acknowledged and are skipped; repeated ids are ignored.
    pub async fn dispatch_tool_call(&mut self, call: ToolCall) {
        let Some(call_id) = call.call_id.clone().filter(|id| !id.trim().is_empty()) else {
            tracing::warn!(tool = ?call.name, "tool call without an id; cannot acknowledge");
            return;
        };
        if !self.dispatched_calls.insert(call_id.clone()) {
            tracing::debug!(call_id = %call_id, "tool call already dispatched");
            return;
        }

        let name = call.name.clone().filter(|n| !n.trim().is_empty());
        let result = match &name {
            Some(name) => {
                tracing::info!(tool = %name, call_id = %call_id, "invoking tool");
                self.capabilities.invoke_tool(name, &call.arguments).await
            }
            None => Err(ToolError::InvalidPayload("tool call has no tool name".to_string())),
        };
        if let Err(e) = &result {
            tracing::warn!(tool = ?name, call_id = %call_id, "tool call failed: {}", e);
        }
        self.send_tool_result(&call_id, name, call.protocol, result).await;
    }

    async fn send_tool_result(
        &mut self,
        call_id: &str,
        tool: Option<String>,
        protocol: ToolProtocol,
        result: Result<ToolOutput, ToolError>,
    ) {
        let is_error = result.is_err();
        match protocol {
            ToolProtocol::ClientTool => {
                let text = match result {
                    Ok(output) => output.into_text(),
                    Err(e) => e.to_string(),
                };
                self.send(ClientEvent::ClientToolResult(ClientToolResultEvent::new(call_id, &text, is_error)))
                    .await;
            }
            ToolProtocol::FunctionCall => {
                let text = match result {
                    Ok(output) => output.into_text(),
                    Err(e) => json!({ "error": e.to_string() }).to_string(),
                };
                let item = Item::FunctionCallOutput(FunctionCallOutputItem::new(call_id, &text));
                // The result must be in the conversation before the follow-up response.
                if self
                    .send(ClientEvent::ConversationItemCreate(ConversationItemCreateEvent::new(item)))
                    .await
                {
                    self.request_response().await;
                }
            }
        }
        self.notify(SessionEvent::ToolResult {
            call_id: call_id.to_string(),
            tool,
            is_error,
        });
    }

    /// Switches turn detection. While connected the change is transmitted at once
    /// and only kept if the send succeeded.
    pub async fn set_turn_detection(&mut self, turn_detection: Option<TurnDetection>) -> bool {
        let voice = self.voice.clone();
        let instructions = self.instructions.clone();
        self.update_session(voice, instructions, turn_detection).await
    }

    pub async fn set_voice(&mut self, voice: Voice) -> bool {
        let instructions = self.instructions.clone();
        let turn_detection = self.turn_detection.clone();
        self.update_session(voice, instructions, turn_detection).await
    }

    pub async fn set_instructions(&mut self, instructions: &str) -> bool {
        let voice = self.voice.clone();
        let turn_detection = self.turn_detection.clone();
        self.update_session(voice, instructions.to_string(), turn_detection).await
    }

    async fn update_session(
        &mut self,
        voice: Voice,
        instructions: String,
        turn_detection: Option<TurnDetection>,
    ) -> bool {
        if self.is_connected() {
            let update = self.session_update(&voice, &instructions, turn_detection.as_ref());
            if !self.send(update).await {
                tracing::warn!("session update not sent; keeping previous configuration");
                return false;
            }
        }
        self.voice = voice;
        self.instructions = instructions;
        self.turn_detection = turn_detection;
        true
    }
}
