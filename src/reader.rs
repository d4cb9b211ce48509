use crate::channel::CommandChannel;
use crate::error::{EssError, Result};
use crate::protocol::{EventBatch, InboundFrame};
use crate::transport::FrameTransport;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Batch(EventBatch),
    Cancelled,
}

impl<T: FrameTransport> CommandChannel<T> {
    /// Next event batch in receipt order. Batches deferred by a command are
    /// returned before anything new is read from the connection.
    pub async fn next_batch(&mut self) -> Result<EventBatch> {
        if let Some(batch) = self.take_deferred() {
            return Ok(batch);
        }

        loop {
            match self.recv_frame().await? {
                Some(InboundFrame::Events(batch)) => return Ok(batch),
                Some(InboundFrame::Response(response)) => {
                    warn!(
                        command_id = response.command_id,
                        status = response.status,
                        "discarding response with no pending command"
                    );
                }
                None => {
                    return Err(EssError::ConnectionError(
                        "Connection closed by server".to_string(),
                    ));
                }
            }
        }
    }
}

/// Wait for the next batch or for `cancel`, whichever comes first.
pub async fn read_next<T: FrameTransport>(
    channel: &mut CommandChannel<T>,
    cancel: &CancellationToken,
) -> Result<ReadOutcome> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Ok(ReadOutcome::Cancelled),
        batch = channel.next_batch() => batch.map(ReadOutcome::Batch),
    }
}
