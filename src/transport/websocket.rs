use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::error::TransportError;
use crate::transport::{build_request, ConnectRequest, Transport, TransportEvent};

const DEFAULT_CAPACITY: usize = 1024;

/// [`Transport`] over tokio-tungstenite. One task writes queued frames to the socket,
/// another forwards everything read from it as [`TransportEvent`]s.
pub struct WebSocketTransport {
    capacity: usize,
    outbound: Option<mpsc::Sender<Message>>,
    send_handle: Option<JoinHandle<()>>,
    recv_handle: Option<JoinHandle<()>>,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl WebSocketTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            outbound: None,
            send_handle: None,
            recv_handle: None,
        }
    }

    async fn enqueue(&mut self, message: Message) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::NotConnected)?;
        outbound.send(message).await.map_err(|_| {
            tracing::debug!("send task is gone");
            TransportError::Closed
        })
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        if self.outbound.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(TransportError::AlreadyConnected);
        }

        let handshake = build_request(request)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(handshake).await?;
        let (mut write, mut read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<Message>(self.capacity);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(self.capacity);
        // Cannot fail: the receiver is still in hand.
        let _ = event_tx.send(TransportEvent::Connected).await;

        let send_events = event_tx.clone();
        let send_handle = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write.send(message).await {
                    tracing::error!("failed to send message: {}", e);
                    let _ = send_events.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let recv_handle = tokio::spawn(async move {
            let mut close_reason = None;
            while let Some(message) = read.next().await {
                let event = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                    Ok(Message::Text(text)) => TransportEvent::Text(text),
                    Ok(Message::Binary(bytes)) => TransportEvent::Binary(bytes),
                    Ok(Message::Close(frame)) => {
                        tracing::info!("connection closed: {:?}", frame);
                        close_reason = frame.map(|f| f.reason.to_string());
                        break;
                    }
                    Ok(_) => continue,
                };
                if event_tx.send(event).await.is_err() {
                    tracing::debug!("event receiver dropped; stopping reader");
                    return;
                }
            }
            let _ = event_tx.send(TransportEvent::Closed(close_reason)).await;
        });

        self.outbound = Some(out_tx);
        self.send_handle = Some(send_handle);
        self.recv_handle = Some(recv_handle);
        Ok(event_rx)
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.enqueue(Message::Text(text)).await
    }

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.enqueue(Message::Binary(bytes)).await
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        let result = self.enqueue(Message::Close(Some(frame))).await;
        self.outbound = None;
        if let Some(handle) = self.send_handle.take() {
            if let Err(e) = handle.await {
                tracing::debug!("send task ended abnormally: {}", e);
            }
        }
        self.recv_handle = None;
        result
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(handle) = self.recv_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.send_handle.take() {
            handle.abort();
        }
    }
}
