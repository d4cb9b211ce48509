use crate::error::{EssError, Result};
use crate::protocol::{Command, CommandResponse, EventBatch, InboundFrame};
use crate::transport::FrameTransport;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Strictly increasing command ids, starting at 1. Clones share the counter,
/// so ids keep increasing across reconnects.
#[derive(Debug, Clone, Default)]
pub struct CommandIds {
    last: Arc<AtomicU64>,
}

impl CommandIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

/// Serializes commands onto one connection and correlates each with its response.
///
/// Commands are not pipelined: `send_command` holds `&mut self` until the
/// matching response arrives. Event batches read while waiting are kept in
/// arrival order and handed out first by [`CommandChannel::next_batch`].
pub struct CommandChannel<T: FrameTransport> {
    transport: T,
    ids: CommandIds,
    deferred: VecDeque<EventBatch>,
}

impl<T: FrameTransport> CommandChannel<T> {
    pub fn new(transport: T, ids: CommandIds) -> Self {
        Self {
            transport,
            ids,
            deferred: VecDeque::new(),
        }
    }

    pub fn command_ids(&self) -> &CommandIds {
        &self.ids
    }

    pub fn deferred_batches(&self) -> usize {
        self.deferred.len()
    }

    pub(crate) fn take_deferred(&mut self) -> Option<EventBatch> {
        self.deferred.pop_front()
    }

    pub(crate) async fn recv_frame(&mut self) -> Result<Option<InboundFrame>> {
        match self.transport.recv_text().await? {
            Some(text) => InboundFrame::decode(&text).map(Some),
            None => Ok(None),
        }
    }

    pub async fn send_command(&mut self, command: Command) -> Result<CommandResponse> {
        let command_id = self.ids.next();
        let name = command.name().to_string();

        debug!(command_id, command = %name, "sending command");
        self.transport.send_text(command.encode(command_id)?).await?;

        let response = loop {
            let frame = self.recv_frame().await?.ok_or_else(|| {
                EssError::ProtocolError(format!(
                    "Connection closed while awaiting response to {} (commandId {})",
                    name, command_id
                ))
            })?;

            match frame {
                InboundFrame::Response(response) if response.command_id == command_id => {
                    break response;
                }
                InboundFrame::Response(response) => {
                    warn!(
                        expected = command_id,
                        got = response.command_id,
                        "discarding response for another command"
                    );
                }
                InboundFrame::Events(batch) => {
                    debug!(
                        command_id,
                        events = batch.events.len(),
                        "deferring events received while awaiting response"
                    );
                    self.deferred.push_back(batch);
                }
            }
        };

        debug!(command_id, status = response.status, "command response received");

        if !response.is_success() {
            return Err(EssError::CommandFailed {
                command: name,
                status: response.status,
                error_text: response.error_text().to_string(),
            });
        }

        Ok(response)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
