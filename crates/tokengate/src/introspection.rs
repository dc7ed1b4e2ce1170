//! OAuth 2.0 Token Introspection (RFC 7662)
//!
//! Remote trust model: instead of checking signatures locally, ask the
//! authority whether a token is active. Only the audience rule of the local
//! policy is applied to the answer; liveness is entirely the authority's call.
//!
//! # Example
//!
//! ```rust,no_run
//! use tokengate::introspection::{IntrospectionClient, RemoteVerifier};
//! use tokengate::{TokenVerifier, VerificationPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IntrospectionClient::new(
//!     "https://auth.example.com/oauth/introspect".to_string(),
//!     "service-b".to_string(),
//!     Some(secrecy::SecretString::new("client_secret".to_string())),
//! );
//! let verifier = RemoteVerifier::new(client, VerificationPolicy::new().with_audience("service-b"));
//!
//! let verified = verifier.verify("access_token_here").await?;
//! println!("subject: {:?}", verified.claims.sub());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::config::{DEFAULT_INTROSPECTION_TIMEOUT_SECS, VerificationPolicy};
use crate::engine::{TokenVerifier, VerificationSource, VerifiedToken};
use crate::error::{Result, VerifyError};
use crate::jwt::ClaimSet;
use crate::jwt::validator::check_audience;

/// Token introspection client
///
/// Authenticates to the endpoint with HTTP Basic (`client_id`, `client_secret`)
/// and posts the token form-encoded. Every call is bounded by a timeout.
#[derive(Clone)]
pub struct IntrospectionClient {
    /// Introspection endpoint URL
    endpoint: String,

    /// Client ID for authentication
    client_id: String,

    /// Client secret (None for public clients)
    client_secret: Option<SecretString>,

    /// Bound on one call
    timeout: Duration,

    /// HTTP client
    http_client: reqwest::Client,
}

// Manual Debug impl to prevent client_secret exposure in logs
impl std::fmt::Debug for IntrospectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntrospectionClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .field("http_client", &"<reqwest::Client>")
            .finish()
    }
}

impl IntrospectionClient {
    /// Create a new introspection client with the default 5 s timeout
    pub fn new(endpoint: String, client_id: String, client_secret: Option<SecretString>) -> Self {
        Self {
            endpoint,
            client_id,
            client_secret,
            timeout: Duration::from_secs(DEFAULT_INTROSPECTION_TIMEOUT_SECS),
            http_client: reqwest::Client::new(),
        }
    }

    /// Override the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Introspect a token and return the raw response object
    ///
    /// # Errors
    ///
    /// [`VerifyError::IntrospectionUnavailable`] on transport failure, timeout,
    /// a non-2xx status, or a body that is not a JSON object.
    pub async fn introspect(&self, token: &str) -> Result<Map<String, Value>> {
        let request = self
            .http_client
            .post(&self.endpoint)
            .basic_auth(
                &self.client_id,
                self.client_secret.as_ref().map(|s| s.expose_secret()),
            )
            .form(&[("token", token)]);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| {
                error!(endpoint = %self.endpoint, timeout = ?self.timeout, "Introspection timed out");
                VerifyError::introspection_unavailable(format!(
                    "no response within {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "Introspection request failed");
                VerifyError::introspection_unavailable(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = %self.endpoint, %status, "Introspection endpoint returned error status");
            return Err(VerifyError::introspection_unavailable(format!(
                "endpoint returned {status}"
            )));
        }

        let body = tokio::time::timeout(self.timeout, response.json::<Value>())
            .await
            .map_err(|_| VerifyError::introspection_unavailable("response body timed out"))?
            .map_err(|e| {
                VerifyError::introspection_unavailable(format!("invalid response body: {e}"))
            })?;

        match body {
            Value::Object(map) => Ok(map),
            _ => Err(VerifyError::introspection_unavailable(
                "response is not a JSON object",
            )),
        }
    }
}

/// [`TokenVerifier`] backed by an introspection endpoint
#[derive(Debug, Clone)]
pub struct RemoteVerifier {
    client: IntrospectionClient,
    policy: VerificationPolicy,
}

impl RemoteVerifier {
    /// Create a remote verifier; only the policy audience is enforced
    pub fn new(client: IntrospectionClient, policy: VerificationPolicy) -> Self {
        Self { client, policy }
    }

    /// The enforced policy
    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Introspect, then apply the activity and audience rules
    ///
    /// # Errors
    ///
    /// [`VerifyError::IntrospectionUnavailable`], then
    /// [`VerifyError::TokenInactive`] when `active` is not `true`, then
    /// [`VerifyError::AudienceMismatch`].
    pub async fn verify_remote(&self, token: &str) -> Result<VerifiedToken> {
        let response = self.client.introspect(token).await?;

        if response.get("active").and_then(Value::as_bool) != Some(true) {
            debug!(endpoint = %self.client.endpoint(), "Token reported inactive");
            return Err(VerifyError::TokenInactive);
        }

        let claims = ClaimSet::new(response);
        check_audience(self.policy.audience(), &claims)?;

        debug!(subject = ?claims.sub(), "Introspection accepted token");
        Ok(VerifiedToken {
            claims,
            key_id: None,
            algorithm: None,
            source: VerificationSource::Introspection,
        })
    }
}

#[async_trait]
impl TokenVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let result = self.verify_remote(token).await;
        if let Err(e) = &result {
            warn!(kind = %e.kind(), "Token rejected");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let client = IntrospectionClient::new(
            "https://auth.example.com/introspect".to_string(),
            "client_id".to_string(),
            Some(SecretString::new("hunter2".to_string())),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_default_timeout() {
        let client = IntrospectionClient::new("https://a/i".into(), "c".into(), None);
        assert_eq!(client.timeout, Duration::from_secs(5));
        let client = client.with_timeout(Duration::from_millis(250));
        assert_eq!(client.timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on loopback is closed in test environments
        let client = IntrospectionClient::new("http://127.0.0.1:9/introspect".into(), "c".into(), None)
            .with_timeout(Duration::from_secs(2));
        let err = client.introspect("t").await.unwrap_err();
        assert!(matches!(err, VerifyError::IntrospectionUnavailable { .. }));
    }
}
