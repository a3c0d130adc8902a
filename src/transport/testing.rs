use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::transport::{ConnectRequest, Transport, TransportEvent};

#[derive(Default)]
struct Recorded {
    connects: Vec<String>,
    sent: Vec<String>,
    closed: Vec<String>,
    events: Option<mpsc::Sender<TransportEvent>>,
}

/// In-memory transport. Records outbound frames; inbound events are injected
/// through the paired [`TransportRecorder`].
pub(crate) struct RecordingTransport {
    state: Arc<Mutex<Recorded>>,
    refuse: bool,
    hang: bool,
}

#[derive(Clone)]
pub(crate) struct TransportRecorder {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> (Self, TransportRecorder) {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let transport = Self {
            state: Arc::clone(&state),
            refuse: false,
            hang: false,
        };
        (transport, TransportRecorder { state })
    }

    /// Every connect attempt fails.
    pub(crate) fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Connect attempts never complete.
    pub(crate) fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        self.state.lock().unwrap().connects.push(request.url().to_string());
        if self.refuse {
            return Err(TransportError::InvalidRequest("refused".to_string()));
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        let (tx, rx) = mpsc::channel(64);
        tx.send(TransportEvent::Connected).await.unwrap();
        self.state.lock().unwrap().events = Some(tx);
        Ok(rx)
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        state.sent.push(text);
        Ok(())
    }

    async fn send_binary(&mut self, _bytes: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.closed.push(reason.to_string());
        state.events = None;
        Ok(())
    }
}

impl TransportRecorder {
    pub(crate) async fn inject(&self, event: TransportEvent) {
        let tx = self.state.lock().unwrap().events.clone().expect("transport not connected");
        tx.send(event).await.unwrap();
    }

    pub(crate) async fn inject_json(&self, value: Value) {
        self.inject(TransportEvent::Text(value.to_string())).await;
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    pub(crate) fn closed(&self) -> Vec<String> {
        self.state.lock().unwrap().closed.clone()
    }

    pub(crate) fn sent(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub(crate) fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub(crate) fn take_sent(&self) -> Vec<Value> {
        let sent = self.sent();
        self.state.lock().unwrap().sent.clear();
        sent
    }
}
