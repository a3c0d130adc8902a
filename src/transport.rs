mod request;
mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use request::build_request;
pub use websocket::WebSocketTransport;

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Notifications emitted by a connected transport, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Text(String),
    Binary(Vec<u8>),
    Error(String),
    Closed(Option<String>),
}

/// Duplex message channel to the realtime endpoint.
///
/// `connect` hands back the receiving half of the notification stream; the stream
/// starts with [`TransportEvent::Connected`] and ends with [`TransportEvent::Closed`].
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, request: &ConnectRequest) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;

    async fn close(&mut self, reason: &str) -> Result<(), TransportError>;
}

struct Header {
    name: String,
    value: SecretString,
    sensitive: bool,
}

/// Connect target plus handshake headers. Sensitive header values are redacted
/// from `Debug` output.
pub struct ConnectRequest {
    url: String,
    headers: Vec<Header>,
}

impl ConnectRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(Header {
            name: name.to_string(),
            value: SecretString::from(value.to_string()),
            sensitive: false,
        });
        self
    }

    pub fn with_secret_header(mut self, name: &str, value: SecretString) -> Self {
        self.headers.push(Header {
            name: name.to_string(),
            value,
            sensitive: true,
        });
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header names and raw values, secrets included. Only for building the handshake.
    pub fn expose_headers(&self) -> impl Iterator<Item = (&str, &str, bool)> {
        self.headers
            .iter()
            .map(|h| (h.name.as_str(), h.value.expose_secret(), h.sensitive))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.expose_secret())
    }
}

struct RedactedHeaders<'a>(&'a [Header]);

impl fmt::Debug for RedactedHeaders<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for header in self.0 {
            let value = if header.sensitive { "[REDACTED]" } else { header.value.expose_secret() };
            map.entry(&header.name, &value);
        }
        map.finish()
    }
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("url", &self.url)
            .field("headers", &RedactedHeaders(&self.headers))
            .finish()
    }
}
