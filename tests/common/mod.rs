#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use vms_events::{Connector, EssError, Event, EventSink, FrameTransport, Result};

pub type SentFrames = Arc<Mutex<Vec<String>>>;

/// Replays scripted frames, then either reports a remote close or blocks forever.
pub struct ScriptedTransport {
    inbound: VecDeque<String>,
    sent: SentFrames,
    hold_open: bool,
}

impl ScriptedTransport {
    /// Closes once the script is exhausted.
    pub fn closing<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inbound: frames.into_iter().map(Into::into).collect(),
            sent: Arc::new(Mutex::new(Vec::new())),
            hold_open: false,
        }
    }

    /// Stays silent once the script is exhausted.
    pub fn holding<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hold_open: true,
            ..Self::closing(frames)
        }
    }

    pub fn sent(&self) -> SentFrames {
        self.sent.clone()
    }
}

#[async_trait]
impl FrameTransport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>> {
        match self.inbound.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Hands out scripted transports in order, refusing once they run out.
#[derive(Default)]
pub struct ScriptedConnector {
    transports: Mutex<VecDeque<ScriptedTransport>>,
}

impl ScriptedConnector {
    pub fn new(transports: Vec<ScriptedTransport>) -> Self {
        Self {
            transports: Mutex::new(transports.into()),
        }
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self) -> Result<ScriptedTransport> {
        self.transports
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EssError::ConnectionError("Connection refused".to_string()))
    }
}

/// Records events and cancels the run once `cancel_after` events were seen.
pub struct RecordingSink {
    pub events: Vec<Event>,
    pub connecting: usize,
    pub disconnects: Vec<String>,
    pub fail_once_on: Option<String>,
    cancel_after: usize,
    cancel: CancellationToken,
}

impl RecordingSink {
    pub fn new(cancel: CancellationToken, cancel_after: usize) -> Self {
        Self {
            events: Vec::new(),
            connecting: 0,
            disconnects: Vec::new(),
            fail_once_on: None,
            cancel_after,
            cancel,
        }
    }

    pub fn fail_once_on(mut self, event_id: &str) -> Self {
        self.fail_once_on = Some(event_id.to_string());
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.id.as_str()).collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn on_connecting(&mut self) -> Result<()> {
        self.connecting += 1;
        Ok(())
    }

    fn on_disconnected(&mut self, error: &EssError) -> Result<()> {
        self.disconnects.push(error.to_string());
        Ok(())
    }

    async fn process(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            if self.fail_once_on.as_deref() == Some(event.id.as_str()) {
                self.fail_once_on = None;
                return Err(EssError::ProtocolError(format!(
                    "sink rejected {}",
                    event.id
                )));
            }
            self.events.push(event.clone());
        }
        if self.events.len() >= self.cancel_after {
            self.cancel.cancel();
        }
        Ok(())
    }
}

pub fn frames(sent: &SentFrames) -> Vec<serde_json::Value> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect()
}
