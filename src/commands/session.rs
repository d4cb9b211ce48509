use crate::channel::CommandChannel;
use crate::constants::{STATUS_SESSION_CREATED, STATUS_SESSION_RESUMED};
use crate::error::{EssError, Result};
use crate::protocol::Command;
use crate::transport::FrameTransport;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// 201: a new session. Subscriptions must be created again.
    Created,
    /// 200: the previous session and its subscriptions continue.
    Resumed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub status: u16,
    pub session_id: String,
}

impl SessionResult {
    pub fn kind(&self) -> SessionStatus {
        if self.status == STATUS_SESSION_CREATED {
            SessionStatus::Created
        } else {
            SessionStatus::Resumed
        }
    }

    pub fn is_new(&self) -> bool {
        self.kind() == SessionStatus::Created
    }
}

#[async_trait]
pub trait Session: Send {
    /// Start a session, or resume `session_id` from `last_event_id`.
    ///
    /// Both may be empty to start a new session. Resumption only succeeds
    /// within the server's resumption window; otherwise a new session is
    /// created and any previous subscriptions are void.
    async fn start_or_resume(
        &mut self,
        session_id: &str,
        last_event_id: &str,
    ) -> Result<SessionResult>;
}

#[async_trait]
impl<T: FrameTransport> Session for CommandChannel<T> {
    async fn start_or_resume(
        &mut self,
        session_id: &str,
        last_event_id: &str,
    ) -> Result<SessionResult> {
        let response = self
            .send_command(Command::StartSession {
                session_id: session_id.to_string(),
                event_id: last_event_id.to_string(),
            })
            .await?;

        let result = match response.status {
            STATUS_SESSION_CREATED => SessionResult {
                status: response.status,
                session_id: response.required_str("sessionId")?,
            },
            STATUS_SESSION_RESUMED => SessionResult {
                status: response.status,
                session_id: response
                    .str_field("sessionId")
                    .unwrap_or(session_id)
                    .to_string(),
            },
            other => {
                return Err(EssError::ProtocolError(format!(
                    "Unexpected startSession status {}",
                    other
                )));
            }
        };

        match result.kind() {
            SessionStatus::Created => info!(session_id = %result.session_id, "session created"),
            SessionStatus::Resumed => {
                info!(session_id = %result.session_id, event_id = %last_event_id, "session resumed")
            }
        }

        Ok(result)
    }
}
