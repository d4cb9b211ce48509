use crate::channel::CommandChannel;
use crate::constants::{MOTION_STARTED, MOTION_STOPPED, RECORDING_STARTED, RECORDING_STOPPED, WILDCARD};
use crate::error::Result;
use crate::protocol::Command;
use crate::transport::FrameTransport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Include,
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum ResourceType {
    Hardware,
    Cameras,
    Microphones,
    Speakers,
    Metadata,
    InputEvents,
    Outputs,
    UserDefinedEvents,
}

/// One include/exclude rule. Each set is either explicit ids or `["*"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilter {
    pub modifier: Modifier,
    pub resource_types: Vec<String>,
    pub source_ids: Vec<String>,
    pub event_types: Vec<String>,
}

impl SubscriptionFilter {
    fn any(modifier: Modifier) -> Self {
        Self {
            modifier,
            resource_types: vec![WILDCARD.to_string()],
            source_ids: vec![WILDCARD.to_string()],
            event_types: vec![WILDCARD.to_string()],
        }
    }

    pub fn include() -> Self {
        Self::any(Modifier::Include)
    }

    pub fn exclude() -> Self {
        Self::any(Modifier::Exclude)
    }

    pub fn resource_types<I>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = ResourceType>,
    {
        self.resource_types = or_wildcard(types.into_iter().map(|t| t.as_ref().to_string()));
        self
    }

    pub fn source_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_ids = or_wildcard(ids.into_iter().map(Into::into));
        self
    }

    pub fn event_types<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = or_wildcard(ids.into_iter().map(Into::into));
        self
    }
}

// An empty set means "any".
fn or_wildcard(values: impl Iterator<Item = String>) -> Vec<String> {
    let values: Vec<String> = values.collect();
    if values.is_empty() {
        vec![WILDCARD.to_string()]
    } else {
        values
    }
}

/// Motion and recording start/stop on every camera.
pub fn camera_activity_filters() -> Vec<SubscriptionFilter> {
    vec![
        SubscriptionFilter::include()
            .resource_types([ResourceType::Cameras])
            .event_types([
                MOTION_STARTED,
                MOTION_STOPPED,
                RECORDING_STARTED,
                RECORDING_STOPPED,
            ]),
    ]
}

#[async_trait]
pub trait Subscriptions: Send {
    /// Create a subscription on the current session, returning its id
    async fn create_subscription(&mut self, filters: &[SubscriptionFilter]) -> Result<String>;
}

#[async_trait]
impl<T: FrameTransport> Subscriptions for CommandChannel<T> {
    async fn create_subscription(&mut self, filters: &[SubscriptionFilter]) -> Result<String> {
        let response = self
            .send_command(Command::AddSubscription {
                filters: filters.to_vec(),
            })
            .await?;

        let subscription_id = response.required_str("subscriptionId")?;
        info!(%subscription_id, filters = filters.len(), "subscription created");
        Ok(subscription_id)
    }
}
