use crate::config::ClientOptions;
use crate::constants::{REST_API_PATH, UNKNOWN_NAME};
use crate::error::{EssError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Resolves resource ids to display strings for the viewers.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// `data.{data_key}` of `GET /api/rest/v1/{resource_path}`, or "Unknown"
    async fn lookup(&self, resource_path: &str, data_key: &str) -> String;

    async fn source_name(&self, source: &str) -> String {
        self.lookup(source, "displayName").await
    }

    async fn event_name(&self, event_type_id: &str) -> String {
        self.lookup(&format!("eventTypes/{}", event_type_id), "displayName")
            .await
    }

    async fn state_name(&self, event_type_id: &str) -> String {
        self.lookup(&format!("eventTypes/{}", event_type_id), "state")
            .await
    }

    async fn state_group_name(&self, state_group_id: &str) -> String {
        self.lookup(&format!("stateGroups/{}", state_group_id), "displayName")
            .await
    }
}

enum Lookup {
    Found(String),
    Rejected(StatusCode),
}

/// Name lookups against the configuration REST API.
///
/// Successful lookups and 4xx answers are cached for the lifetime of the
/// resolver; a 4xx is remembered as "Unknown" so it is never retried. Other
/// failures are logged and answered with "Unknown" without caching.
pub struct RestNameResolver {
    client: Client,
    gateway_uri: String,
    access_token: String,
    cache: DashMap<(String, String), String>,
}

impl RestNameResolver {
    pub fn new(
        gateway_uri: impl Into<String>,
        access_token: impl Into<String>,
        options: &ClientOptions,
    ) -> Result<Self> {
        Ok(Self::with_client(
            options.http_client()?,
            gateway_uri,
            access_token,
        ))
    }

    pub fn with_client(
        client: Client,
        gateway_uri: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            gateway_uri: gateway_uri.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            cache: DashMap::new(),
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&self, resource_path: &str, data_key: &str) -> Result<Lookup> {
        let url = format!("{}{}/{}", self.gateway_uri, REST_API_PATH, resource_path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(Lookup::Rejected(status));
        }
        if !status.is_success() {
            return Err(EssError::ProtocolError(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let body: Value = response.json().await?;
        body.get("data")
            .and_then(|data| data.get(data_key))
            .and_then(Value::as_str)
            .map(|name| Lookup::Found(name.to_string()))
            .ok_or_else(|| {
                EssError::ProtocolError(format!("GET {} has no data.{}", url, data_key))
            })
    }
}

#[async_trait]
impl NameResolver for RestNameResolver {
    async fn lookup(&self, resource_path: &str, data_key: &str) -> String {
        let key = (resource_path.to_string(), data_key.to_string());
        if let Some(name) = self.cache.get(&key) {
            return name.value().clone();
        }

        match self.fetch(resource_path, data_key).await {
            Ok(Lookup::Found(name)) => {
                self.cache.insert(key, name.clone());
                name
            }
            Ok(Lookup::Rejected(status)) => {
                debug!(%resource_path, %status, "lookup rejected, caching as unknown");
                self.cache.insert(key, UNKNOWN_NAME.to_string());
                UNKNOWN_NAME.to_string()
            }
            Err(e) => {
                warn!(%resource_path, data_key, error = %e, "name lookup failed");
                UNKNOWN_NAME.to_string()
            }
        }
    }
}
