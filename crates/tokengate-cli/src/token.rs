//! OAuth 2.0 client-credentials token requests
//!
//! Fetches an access token from `{issuer}/token` so remote-mode services can be
//! exercised end to end.

use crate::error::{CliError, CliResult};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Matches the JWKS fetch timeout of the library
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful token endpoint reply
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Client for the `client_credentials` grant
pub struct ClientCredentials {
    issuer: String,
    client_id: String,
    client_secret: SecretString,
    scope: Option<String>,
    http_client: reqwest::Client,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

impl ClientCredentials {
    /// Create a client for `issuer`
    ///
    /// # Errors
    ///
    /// [`CliError::Http`] if the HTTP client cannot be built.
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> CliResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret,
            scope: None,
            http_client,
        })
    }

    /// Request a scope with the token
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope.filter(|scope| !scope.is_empty());
        self
    }

    /// `{issuer}/token`
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.issuer.trim_end_matches('/'))
    }

    /// POST the grant and return the token reply
    ///
    /// # Errors
    ///
    /// - [`CliError::Http`] on transport failures, timeouts and non-2xx statuses
    /// - [`CliError::TokenRequest`] when the body lacks a non-empty `access_token`
    pub async fn fetch(&self) -> CliResult<TokenResponse> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret().as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let endpoint = self.token_endpoint();
        debug!(endpoint = %endpoint, client_id = %self.client_id, "Requesting client-credentials token");
        let body: Value = self
            .http_client
            .post(&endpoint)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let has_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .is_some_and(|token| !token.is_empty());
        if !has_token {
            return Err(CliError::TokenRequest(
                "token response missing access_token".to_string(),
            ));
        }
        Ok(serde_json::from_value(body)?)
    }
}

/// Shorten a token for display: first 8 and last 6 characters
pub fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 16 {
        return token.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{head}…{tail}")
}
