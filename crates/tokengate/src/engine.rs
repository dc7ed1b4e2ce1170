//! Verification engine
//!
//! [`TokenVerifier`] is the single seam a boundary layer depends on. Two trust
//! models implement it:
//!
//! - [`LocalVerifier`]: header parse, key resolution, claim validation and an
//!   optional replay gate, all in-process
//! - [`RemoteVerifier`](crate::introspection::RemoteVerifier): liveness delegated
//!   to an introspection endpoint
//!
//! Every step fails fast with its own [`VerifyError`] kind. Nothing is retried
//! and a rejected token never touches the replay cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use tracing::{debug, info, warn};

use crate::bearer::extract_bearer;
use crate::clock::{Clock, SystemClock};
use crate::config::{TrustDomainConfig, VerificationPolicy};
use crate::error::{Result, VerifyError};
use crate::introspection::{IntrospectionClient, RemoteVerifier};
use crate::jwt::{ClaimSet, JwtValidator, KeyResolver, TokenHeader};
use crate::replay::{MemoryReplayCache, ReplayStore};

/// Which trust model accepted a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationSource {
    /// Signature checked against a locally held key
    LocalKey,
    /// Reported active by an introspection endpoint
    Introspection,
}

/// An accepted token
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// Normalized claims
    pub claims: ClaimSet,
    /// `kid` of the resolving key (local mode only)
    pub key_id: Option<String>,
    /// Header algorithm (local mode only)
    pub algorithm: Option<Algorithm>,
    /// Trust model that accepted the token
    pub source: VerificationSource,
}

/// Turns a raw bearer token into claims or a typed rejection
#[async_trait]
pub trait TokenVerifier: Send + Sync + std::fmt::Debug {
    /// Verify a raw token
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;

    /// Verify the credential carried by an `Authorization` header value
    async fn verify_bearer(&self, authorization: Option<&str>) -> Result<VerifiedToken> {
        let token = extract_bearer(authorization)?;
        self.verify(token).await
    }
}

/// In-process verifier for one trust domain
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tokengate::{KeyResolver, KeySet, LocalVerifier, VerificationPolicy};
///
/// let keys = Arc::new(KeyResolver::from_key_set(KeySet::new()));
/// let verifier = LocalVerifier::new(
///     VerificationPolicy::new().with_issuer("https://demo-issuer"),
///     keys,
/// );
/// assert!(!verifier.policy().replay_protection());
/// ```
#[derive(Debug, Clone)]
pub struct LocalVerifier {
    validator: JwtValidator,
    keys: Arc<KeyResolver>,
    replay: Arc<dyn ReplayStore>,
    clock: Arc<dyn Clock>,
}

impl LocalVerifier {
    /// Verifier with an in-memory replay cache and the system clock
    pub fn new(policy: VerificationPolicy, keys: Arc<KeyResolver>) -> Self {
        Self {
            validator: JwtValidator::new(Arc::new(policy)),
            keys,
            replay: Arc::new(MemoryReplayCache::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different replay store (shared across instances, for example)
    #[must_use]
    pub fn with_replay_store(mut self, store: Arc<dyn ReplayStore>) -> Self {
        self.replay = store;
        self
    }

    /// Use a different time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The enforced policy
    pub fn policy(&self) -> &VerificationPolicy {
        self.validator.policy()
    }

    /// The key resolver, for administrative reloads
    pub fn keys(&self) -> &Arc<KeyResolver> {
        &self.keys
    }

    /// Verify `token` as of `now` (Unix seconds)
    ///
    /// # Errors
    ///
    /// Header parsing, key resolution and claim validation errors as they
    /// occur; then [`VerifyError::MissingReplayId`] or [`VerifyError::Replay`]
    /// when replay protection is on.
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedToken> {
        let header = TokenHeader::parse(token)?;
        let key = self.keys.resolve(header.kid.as_deref())?;
        let claims = self.validator.validate(&header, token, &key, now)?;

        if self.policy().replay_protection() {
            let jti = claims.jti().ok_or(VerifyError::MissingReplayId)?;
            // exp was required by the validator; the entry lives until exp
            let expiry = claims.exp()?.unwrap_or(now);
            self.replay.check_and_record(jti, expiry, now).await?;
            debug!(jti = %jti, expiry, "Recorded token identifier");
        }

        Ok(VerifiedToken {
            claims,
            key_id: Some(key.kid().to_string()),
            algorithm: Some(header.alg),
            source: VerificationSource::LocalKey,
        })
    }
}

#[async_trait]
impl TokenVerifier for LocalVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let result = self.verify_at(token, self.clock.now()).await;
        if let Err(e) = &result {
            warn!(kind = %e.kind(), "Token rejected");
        }
        result
    }
}

/// Build the verifier a trust-domain configuration describes
///
/// An `introspection` section selects remote mode; otherwise the configured
/// JWKS source is loaded for local mode (no source means no keys).
///
/// # Errors
///
/// [`VerifyError::KeyLoad`] if the initial key load fails or the HTTP client
/// cannot be built.
pub async fn build_verifier(config: &TrustDomainConfig) -> Result<Arc<dyn TokenVerifier>> {
    let policy = config.policy();

    if let Some(introspection) = &config.introspection {
        let client = IntrospectionClient::new(
            introspection.endpoint.clone(),
            introspection.client_id.clone(),
            introspection.client_secret.clone(),
        )
        .with_timeout(introspection.timeout());
        info!(endpoint = %introspection.endpoint, "Using remote introspection");
        return Ok(Arc::new(RemoteVerifier::new(client, policy)));
    }

    let keys = KeyResolver::load(config.key_source()).await?;
    info!(
        kids = ?keys.snapshot().kids(),
        replay_protection = policy.replay_protection(),
        leeway = ?Duration::from_secs(config.leeway_secs),
        "Using local verification"
    );
    Ok(Arc::new(LocalVerifier::new(policy, Arc::new(keys))))
}
