use crate::commands::SubscriptionFilter;
use crate::error::{EssError, Result};
use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum_macros::AsRefStr;

/// Client to server command. The `command` tag carries the camelCase name.
#[derive(Debug, Clone, PartialEq, Serialize, AsRefStr)]
#[serde(tag = "command", rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    StartSession { session_id: String, event_id: String },
    AddSubscription { filters: Vec<SubscriptionFilter> },
    GetState,
}

impl Command {
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    /// Encode as a text frame tagged with `command_id`.
    pub fn encode(&self, command_id: u64) -> Result<String> {
        let mut frame = serde_json::to_value(self)?;
        frame["commandId"] = json!(command_id);
        Ok(serde_json::to_string(&frame)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "errorText", default)]
    pub error_text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub command_id: u64,
    pub status: u16,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    /// Command specific result fields (`sessionId`, `subscriptionId`, `states`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CommandResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    pub fn error_text(&self) -> &str {
        self.error
            .as_ref()
            .map(|e| e.error_text.as_str())
            .unwrap_or("")
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn required_str(&self, name: &str) -> Result<String> {
        self.str_field(name).map(str::to_string).ok_or_else(|| {
            EssError::ProtocolError(format!(
                "Response to commandId {} is missing '{}'",
                self.command_id, name
            ))
        })
    }

    pub fn take_field<T: DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let value = self.fields.remove(name).ok_or_else(|| {
            EssError::ProtocolError(format!(
                "Response to commandId {} is missing '{}'",
                self.command_id, name
            ))
        })?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(
        rename = "stateGroupId",
        alias = "stategroupid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub state_group_id: Option<String>,
}

impl Event {
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
    }

    pub fn is_stateful(&self) -> bool {
        self.state_group_id.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventBatch {
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn last_event_id(&self) -> Option<&str> {
        self.events.last().map(|e| e.id.as_str())
    }
}

/// Server to client frame, discriminated by the presence of `commandId`.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Response(CommandResponse),
    Events(EventBatch),
}

impl InboundFrame {
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("commandId").is_some() {
            return Ok(InboundFrame::Response(serde_json::from_value(value)?));
        }
        if value.get("events").is_some() {
            return Ok(InboundFrame::Events(serde_json::from_value(value)?));
        }

        Err(EssError::ProtocolError(format!(
            "Unexpected message received: {}",
            text
        )))
    }
}
