//! The runtime loop tying microphone capture, the session controller and host
//! commands together on one task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::session::SessionController;
use crate::types::audio::{TurnDetection, Voice};
use crate::utils::audio::ToBinary;
use crate::utils::capture::{CapturePipeline, InputDevice};

const COMMAND_CAPACITY: usize = 64;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const DEFAULT_ECHO_TOLERANCE: Duration = Duration::from_millis(300);

/// Host requests executed on the agent's task, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCommand {
    UserMessage {
        text: String,
        interrupt: bool,
        request_response: bool,
    },
    PublishEvent(String),
    CancelResponses,
    RequestResponse,
    CommitAudio,
    SetTurnDetection(Option<TurnDetection>),
    SetVoice(Voice),
    SetInstructions(String),
    Shutdown,
}

/// Cloneable sender for [`AgentCommand`]s.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    tx: mpsc::Sender<AgentCommand>,
}

impl AgentHandle {
    pub async fn send(&self, command: AgentCommand) -> Result<(), SessionError> {
        self.tx.send(command).await.map_err(|_| SessionError::NotConnected)
    }

    pub async fn send_user_message(&self, text: &str, interrupt: bool, request_response: bool) -> Result<(), SessionError> {
        self.send(AgentCommand::UserMessage {
            text: text.to_string(),
            interrupt,
            request_response,
        })
        .await
    }

    pub async fn publish_event(&self, name: &str) -> Result<(), SessionError> {
        self.send(AgentCommand::PublishEvent(name.to_string())).await
    }

    pub async fn cancel_responses(&self) -> Result<(), SessionError> {
        self.send(AgentCommand::CancelResponses).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(AgentCommand::Shutdown).await
    }
}

pub struct VoiceAgent<D: InputDevice> {
    controller: SessionController,
    capture: CapturePipeline<D>,
    commands: mpsc::Receiver<AgentCommand>,
    commands_tx: mpsc::Sender<AgentCommand>,
    poll_interval: Duration,
    echo_tolerance: Duration,
}

impl<D: InputDevice> VoiceAgent<D> {
    pub fn new(controller: SessionController, capture: CapturePipeline<D>) -> Self {
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        Self {
            controller,
            capture,
            commands,
            commands_tx,
            poll_interval: DEFAULT_POLL_INTERVAL,
            echo_tolerance: DEFAULT_ECHO_TOLERANCE,
        }
    }

    /// How often the capture ring is drained. Must be shorter than the ring.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// How long after the last assistant audio the microphone stays muted when
    /// echo suppression is on.
    pub fn with_echo_tolerance(mut self, echo_tolerance: Duration) -> Self {
        self.echo_tolerance = echo_tolerance;
        self
    }

    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            tx: self.commands_tx.clone(),
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Connects, then streams microphone audio and serves commands until
    /// `shutdown` fires, a [`AgentCommand::Shutdown`] arrives or the connection
    /// drops. Reconnecting is left to the caller.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<SessionController, SessionError> {
        self.controller.connect(&shutdown).await?;

        match self.capture.start_capture() {
            Ok(true) => {}
            Ok(false) => tracing::info!("continuing without microphone input"),
            Err(e) => tracing::warn!("failed to start capture: {}", e),
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                event = self.controller.next_event() => {
                    self.controller.handle_transport_event(event).await;
                    if !self.controller.is_connected() {
                        tracing::info!("session ended");
                        break;
                    }
                }
                _ = ticker.tick() => self.pump_capture().await,
                command = self.commands.recv() => match command {
                    None | Some(AgentCommand::Shutdown) => break,
                    Some(command) => self.apply(command).await,
                },
            }
        }

        self.capture.stop_capture();
        self.controller.disconnect().await;
        Ok(self.controller)
    }

    async fn pump_capture(&mut self) {
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        self.capture.poll(|chunk| chunks.push(chunk.to_pcm16_bytes()));
        if chunks.is_empty() {
            return;
        }

        if self.controller.config().suppress_echo() && self.controller.is_assistant_speaking(self.echo_tolerance) {
            tracing::trace!(chunks = chunks.len(), "assistant speaking; dropping microphone audio");
            return;
        }
        for bytes in chunks {
            self.controller.send_audio_chunk(&bytes).await;
        }
    }

    async fn apply(&mut self, command: AgentCommand) {
        tracing::debug!("command: {:?}", command);
        match command {
            AgentCommand::UserMessage {
                text,
                interrupt,
                request_response,
            } => {
                self.controller
                    .send_user_message(&text, interrupt, request_response)
                    .await
            }
            AgentCommand::PublishEvent(name) => {
                self.controller.publish_event(&name).await;
            }
            AgentCommand::CancelResponses => self.controller.cancel_active_responses().await,
            AgentCommand::RequestResponse => self.controller.request_response().await,
            AgentCommand::CommitAudio => self.controller.commit_audio().await,
            AgentCommand::SetTurnDetection(turn_detection) => {
                self.controller.set_turn_detection(turn_detection).await;
            }
            AgentCommand::SetVoice(voice) => {
                self.controller.set_voice(voice).await;
            }
            AgentCommand::SetInstructions(instructions) => {
                self.controller.set_instructions(&instructions).await;
            }
            AgentCommand::Shutdown => {}
        }
    }
}
