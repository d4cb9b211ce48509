use crate::channel::{CommandChannel, CommandIds};
use crate::commands::{Session, States, Subscriptions};
use crate::config::SupervisorConfig;
use crate::constants::RESUMPTION_WINDOW;
use crate::error::Result;
use crate::reader::{ReadOutcome, read_next};
use crate::sink::EventSink;
use crate::transport::{Connector, FrameTransport};
use std::time::Instant;
use strum_macros::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SupervisorState {
    Idle,
    Connecting,
    Active,
    Failed,
    Closing,
}

/// What the next connection uses to resume. Empty strings mean "none yet".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumePoint {
    pub session_id: String,
    /// Id of the last event handed to the sink without error
    pub last_event_id: String,
}

/// Keeps one event stream alive across connection failures.
///
/// Every failure inside a connection is logged, reported to the sink and
/// answered with a fresh connection after the configured backoff. Only
/// cancellation ends [`Supervisor::run`].
pub struct Supervisor<C: Connector> {
    connector: C,
    config: SupervisorConfig,
    ids: CommandIds,
    resume: ResumePoint,
    state: SupervisorState,
    attempts: u64,
    disconnected_at: Option<Instant>,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(connector: C, config: SupervisorConfig) -> Self {
        Self {
            connector,
            config,
            ids: CommandIds::new(),
            resume: ResumePoint::default(),
            state: SupervisorState::Idle,
            attempts: 0,
            disconnected_at: None,
        }
    }

    pub fn with_resume_point(mut self, resume: ResumePoint) -> Self {
        self.resume = resume;
        self
    }

    pub fn resume_point(&self) -> &ResumePoint {
        &self.resume
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of connection attempts so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn command_ids(&self) -> &CommandIds {
        &self.ids
    }

    fn transition(&mut self, next: SupervisorState) {
        debug!(from = %self.state, to = %next, "supervisor state");
        self.state = next;
    }

    /// Run until `cancel` fires, returning where a later run could resume.
    pub async fn run<S>(&mut self, sink: &mut S, cancel: &CancellationToken) -> ResumePoint
    where
        S: EventSink + ?Sized,
    {
        while !cancel.is_cancelled() {
            self.transition(SupervisorState::Connecting);
            self.attempts += 1;

            let Err(e) = self.run_connection(sink, cancel).await else {
                break;
            };

            self.transition(SupervisorState::Failed);
            self.disconnected_at = Some(Instant::now());
            if cancel.is_cancelled() {
                break;
            }

            warn!(
                error = %e,
                session_id = %self.resume.session_id,
                last_event_id = %self.resume.last_event_id,
                "connection failed, reconnecting"
            );
            if let Err(report) = sink.on_disconnected(&e) {
                warn!(error = %report, "sink failed to report disconnect");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }

        self.transition(SupervisorState::Closing);
        info!(
            session_id = %self.resume.session_id,
            last_event_id = %self.resume.last_event_id,
            "event stream closed"
        );
        self.resume.clone()
    }

    /// One connection lifetime. Returns `Ok` only when cancelled.
    async fn run_connection<S>(&mut self, sink: &mut S, cancel: &CancellationToken) -> Result<()>
    where
        S: EventSink + ?Sized,
    {
        sink.on_connecting()?;

        let transport = self.connector.connect().await?;
        let mut channel = CommandChannel::new(transport, self.ids.clone());
        self.transition(SupervisorState::Active);

        let result = self.drive(&mut channel, sink, cancel).await;

        if let Err(e) = channel.close().await {
            debug!(error = %e, "error while closing connection");
        }
        result
    }

    async fn drive<T, S>(
        &mut self,
        channel: &mut CommandChannel<T>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        T: FrameTransport,
        S: EventSink + ?Sized,
    {
        let offline = self.disconnected_at.map(|at| at.elapsed());
        if let Some(offline) = offline.filter(|d| *d > RESUMPTION_WINDOW) {
            if !self.resume.session_id.is_empty() {
                info!(
                    session_id = %self.resume.session_id,
                    offline_secs = offline.as_secs(),
                    "resumption window has passed, expecting a new session"
                );
            }
        }

        let session = channel
            .start_or_resume(&self.resume.session_id, &self.resume.last_event_id)
            .await?;

        let mut snapshot = Vec::new();
        if session.is_new() {
            channel.create_subscription(&self.config.filters).await?;
            // Recorded only once its subscription exists; a failed subscription
            // must not leave a resumable session without one.
            self.resume.session_id = session.session_id;

            if self.config.fetch_snapshot {
                snapshot = channel.get_state().await?;
            }
        } else {
            self.resume.session_id = session.session_id;
        }

        sink.process(&snapshot).await?;

        loop {
            match read_next(channel, cancel).await? {
                ReadOutcome::Cancelled => return Ok(()),
                ReadOutcome::Batch(batch) => {
                    sink.process(&batch.events).await?;
                    if let Some(id) = batch.last_event_id() {
                        self.resume.last_event_id = id.to_string();
                    }
                }
            }
        }
    }
}
