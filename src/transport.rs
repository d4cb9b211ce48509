use crate::constants::{CONNECT_TIMEOUT, EVENTS_WS_PATH};
use crate::error::{EssError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A duplex text-frame connection. Lives for one iteration of the reconnect loop.
#[async_trait]
pub trait FrameTransport: Send {
    /// Send one UTF-8 text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Receive the next text frame, `None` once the peer has closed
    async fn recv_text(&mut self) -> Result<Option<String>>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh transport for each connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: FrameTransport;

    async fn connect(&self) -> Result<Self::Transport>;
}

pub struct WsTransport {
    stream: WsStream,
}

impl WsTransport {
    pub fn new(stream: WsStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.as_str().to_string())),
                Message::Binary(data) => {
                    let text = String::from_utf8(data.to_vec()).map_err(|e| {
                        EssError::ProtocolError(format!("Binary frame is not UTF-8: {}", e))
                    })?;
                    return Ok(Some(text));
                }
                Message::Close(frame) => {
                    debug!(?frame, "server closed the connection");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct WsConnector {
    endpoint: String,
    access_token: String,
    timeout: Duration,
}

impl WsConnector {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            timeout: CONNECT_TIMEOUT,
        }
    }

    /// Connector for the events endpoint of an API gateway.
    pub fn for_gateway(gateway_uri: &str, access_token: impl Into<String>) -> Result<Self> {
        Ok(Self::new(events_endpoint(gateway_uri)?, access_token))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self) -> Result<WsTransport> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|e| EssError::ConfigError(format!("Invalid access token: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (stream, _response) = tokio::time::timeout(self.timeout, connect_async(request))
            .await
            .map_err(|_| EssError::ConnectionError("Connection timeout".to_string()))?
            .map_err(|e| match e {
                WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
                    EssError::AuthenticationError(format!(
                        "Token rejected by {} ({})",
                        self.endpoint,
                        response.status()
                    ))
                }
                other => EssError::from(other),
            })?;

        debug!(endpoint = %self.endpoint, "websocket connected");
        Ok(WsTransport::new(stream))
    }
}

/// Derive the events endpoint from the REST base: `https` maps to `wss`, `http` to `ws`.
pub fn events_endpoint(gateway_uri: &str) -> Result<String> {
    let mut url = Url::parse(gateway_uri)
        .map_err(|e| EssError::ConfigError(format!("Invalid gateway address: {}", e)))?;

    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(EssError::ConfigError(format!(
                "Unsupported gateway scheme '{}'",
                other
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| EssError::ConfigError(format!("Cannot switch scheme to {}", scheme)))?;
    url.set_path(EVENTS_WS_PATH);
    url.set_query(None);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_gateway_uses_secure_socket() {
        assert_eq!(
            events_endpoint("https://vms.example.com").unwrap(),
            "wss://vms.example.com/api/ws/events/v1/"
        );
    }

    #[test]
    fn plain_gateway_keeps_port() {
        assert_eq!(
            events_endpoint("http://10.0.0.5:8080/").unwrap(),
            "ws://10.0.0.5:8080/api/ws/events/v1/"
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = events_endpoint("ftp://vms.example.com").unwrap_err();
        assert!(matches!(err, EssError::ConfigError(_)));
    }
}
