use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

use crate::error::TransportError;
use crate::transport::ConnectRequest;

/// Turns a [`ConnectRequest`] into a websocket handshake request.
pub fn build_request(request: &ConnectRequest) -> Result<Request, TransportError> {
    let mut handshake = request.url().into_client_request()?;
    for (name, value, sensitive) in request.expose_headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name '{name}': {e}")))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidRequest(format!("header value for '{}'", name.as_str())))?;
        value.set_sensitive(sensitive);
        handshake.headers_mut().insert(name, value);
    }
    Ok(handshake)
}
