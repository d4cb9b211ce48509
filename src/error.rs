use thiserror::Error;

#[derive(Error, Debug)]
pub enum EssError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Command failed. {status}: {error_text}")]
    CommandFailed {
        command: String,
        status: u16,
        error_text: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl EssError {
    /// Malformed frames, failed commands and broken correlation.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            EssError::ProtocolError(_)
                | EssError::CommandFailed { .. }
                | EssError::SerializationError(_)
        )
    }

    /// Refused, reset or closed connections, including a rejected token.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            EssError::ConnectionError(_)
                | EssError::AuthenticationError(_)
                | EssError::WebSocket(_)
                | EssError::Http(_)
                | EssError::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EssError>;
