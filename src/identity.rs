use crate::config::Settings;
use crate::constants::{TOKEN_CLIENT_ID, TOKEN_PATH};
use crate::error::{EssError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Request a bearer token from the identity provider with the OAuth2 password grant.
///
/// Windows users (`DOMAIN\user`) need NTLM against the identity provider,
/// which this client does not speak.
pub async fn request_token(
    client: &Client,
    settings: &Settings,
    password: &str,
) -> Result<AccessToken> {
    if !settings.is_basic_user() {
        return Err(EssError::AuthenticationError(format!(
            "Windows user '{}' is not supported, use a basic user",
            settings.username
        )));
    }

    let url = format!(
        "{}{}",
        settings.api_gateway.trim_end_matches('/'),
        TOKEN_PATH
    );
    debug!(%url, username = %settings.username, "requesting access token");

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "password"),
            ("username", settings.username.as_str()),
            ("password", password),
            ("client_id", TOKEN_CLIENT_ID),
        ])
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(%status, "login failed");

    if status == StatusCode::UNAUTHORIZED || body.contains("InvalidCredential") {
        return Err(EssError::AuthenticationError(format!(
            "Invalid credentials ({})",
            status
        )));
    }

    Err(EssError::AuthenticationError(format!(
        "Login failed: {}",
        status
    )))
}
