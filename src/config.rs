use crate::commands::{SubscriptionFilter, camera_activity_filters};
use crate::constants::RECONNECT_BACKOFF;
use crate::error::{EssError, Result};
use crate::sink::ViewerMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static GATEWAY_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9.-]+/?$").expect("gateway address pattern is valid")
});

pub const SETTINGS_FILE: &str = "settings.json";

pub fn is_valid_gateway_uri(uri: &str) -> bool {
    GATEWAY_URI.is_match(uri)
}

/// Gateway address and user, persisted as `settings.json`. The password is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "apigateway")]
    pub api_gateway: String,
    pub username: String,
}

impl Settings {
    pub fn new(api_gateway: impl Into<String>, username: impl Into<String>) -> Result<Self> {
        let settings = Self {
            api_gateway: api_gateway.into(),
            username: username.into(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_gateway_uri(&self.api_gateway) {
            return Err(EssError::ConfigError(format!(
                "Invalid API gateway address '{}' (expected e.g. https://vms.example.com)",
                self.api_gateway
            )));
        }
        if self.username.is_empty() {
            return Err(EssError::ConfigError("Username is empty".to_string()));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings from `VMS_API_GATEWAY` / `VMS_USERNAME`, falling back to `path`.
    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_sources(
            std::env::var("VMS_API_GATEWAY").ok(),
            std::env::var("VMS_USERNAME").ok(),
            path,
        )
    }

    /// The file is only read for fields not already given.
    fn from_sources(
        api_gateway: Option<String>,
        username: Option<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let (api_gateway, username) = match (api_gateway, username) {
            (Some(api_gateway), Some(username)) => (api_gateway, username),
            (api_gateway, username) => {
                let path = path.as_ref();
                if !path.exists() {
                    return Err(EssError::ConfigError(format!(
                        "VMS_API_GATEWAY and VMS_USERNAME must be set, or {} must exist",
                        path.display()
                    )));
                }
                let file = Self::load(path)?;
                (
                    api_gateway.unwrap_or(file.api_gateway),
                    username.unwrap_or(file.username),
                )
            }
        };

        Self::new(api_gateway, username)
    }

    /// Windows users are written `DOMAIN\user`.
    pub fn is_basic_user(&self) -> bool {
        !self.username.contains('\\')
    }
}

/// Options for the REST side (token requests and name lookups).
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ClientOptions {
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .timeout(self.timeout)
            .build()?)
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Filters of the subscription created on every new session
    pub filters: Vec<SubscriptionFilter>,
    /// Fetch current states after creating a session
    pub fetch_snapshot: bool,
    pub reconnect_backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            filters: camera_activity_filters(),
            fetch_snapshot: false,
            reconnect_backoff: RECONNECT_BACKOFF,
        }
    }
}

impl SupervisorConfig {
    /// Defaults for a viewer mode. Only the state viewer fetches a snapshot.
    pub fn for_mode(mode: ViewerMode) -> Self {
        Self::default().with_snapshot(mode == ViewerMode::StateViewer)
    }

    pub fn with_filters(mut self, filters: Vec<SubscriptionFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_snapshot(mut self, fetch_snapshot: bool) -> Self {
        self.fetch_snapshot = fetch_snapshot;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_address_validation() {
        assert!(is_valid_gateway_uri("https://vms.example.com"));
        assert!(is_valid_gateway_uri("http://10.0.0.5/"));
        assert!(!is_valid_gateway_uri("vms.example.com"));
        assert!(!is_valid_gateway_uri("https://vms.example.com/api"));
        assert!(!is_valid_gateway_uri("ftp://vms.example.com"));
    }

    #[test]
    fn settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        Settings::new("https://vms.example.com", "operator")
            .unwrap()
            .save(&path)
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["apigateway"], "https://vms.example.com");
        assert!(raw.get("password").is_none());

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.username, "operator");
    }

    #[test]
    fn invalid_settings_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"apigateway":"not a url","username":"u"}"#).unwrap();

        assert!(matches!(
            Settings::load(&path).unwrap_err(),
            EssError::ConfigError(_)
        ));
    }

    #[test]
    fn windows_users_are_not_basic() {
        let basic = Settings::new("https://vms", "operator").unwrap();
        let windows = Settings::new("https://vms", r"CORP\operator").unwrap();
        assert!(basic.is_basic_user());
        assert!(!windows.is_basic_user());
    }

    #[test]
    fn environment_overrides_skip_a_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let settings = Settings::from_sources(
            Some("https://vms.example.com".to_string()),
            Some("operator".to_string()),
            &path,
        )
        .unwrap();
        assert_eq!(settings.api_gateway, "https://vms.example.com");

        let err = Settings::from_sources(None, Some("operator".to_string()), &path).unwrap_err();
        assert!(matches!(err, EssError::SerializationError(_)));
    }

    #[test]
    fn missing_fields_are_taken_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        Settings::new("https://vms.example.com", "operator")
            .unwrap()
            .save(&path)
            .unwrap();

        let settings =
            Settings::from_sources(None, Some("auditor".to_string()), &path).unwrap();
        assert_eq!(settings.api_gateway, "https://vms.example.com");
        assert_eq!(settings.username, "auditor");

        let missing = dir.path().join("absent.json");
        assert!(matches!(
            Settings::from_sources(None, None, &missing).unwrap_err(),
            EssError::ConfigError(_)
        ));
    }

    #[test]
    fn only_the_state_viewer_fetches_a_snapshot() {
        assert!(SupervisorConfig::for_mode(ViewerMode::StateViewer).fetch_snapshot);
        assert!(!SupervisorConfig::for_mode(ViewerMode::EventViewer).fetch_snapshot);
    }

    #[test]
    fn supervisor_defaults_follow_sample_behaviour() {
        let config = SupervisorConfig::default();
        assert_eq!(config.reconnect_backoff, Duration::from_secs(1));
        assert!(!config.fetch_snapshot);
        assert_eq!(config.filters.len(), 1);
    }
}
