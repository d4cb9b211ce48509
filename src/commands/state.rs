use crate::channel::CommandChannel;
use crate::error::Result;
use crate::protocol::{Command, Event};
use crate::transport::FrameTransport;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait States: Send {
    /// Current states (stateful events) matching the session's subscriptions
    async fn get_state(&mut self) -> Result<Vec<Event>>;
}

#[async_trait]
impl<T: FrameTransport> States for CommandChannel<T> {
    async fn get_state(&mut self) -> Result<Vec<Event>> {
        let mut response = self.send_command(Command::GetState).await?;
        let states: Vec<Event> = response.take_field("states")?;
        debug!(states = states.len(), "state snapshot received");
        Ok(states)
    }
}
