//! JWKS (JSON Web Key Set) loading and key resolution
//!
//! Keys rotate out-of-band, so the resolver keeps the active [`KeySet`] in
//! memory and swaps it wholesale on reload:
//!
//! - **Atomic snapshots**: the set lives behind an `ArcSwap`; a resolution
//!   works against one `Arc<KeySet>` and never sees a half-built set
//! - **No lock across I/O**: the replacement set is fetched and parsed before
//!   the swap, so resolutions proceed while a reload is in flight
//! - **Failed reloads are harmless**: on any load error the previous set stays
//!   active
//!
//! Only keys whose `use` is absent or `"sig"` are retained.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, VerifyError};

/// Timeout for fetching a JWKS document over HTTP
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Cryptographic family of a key or algorithm
///
/// A key can only ever verify algorithms of its own family; this is what stops
/// an HMAC token from being checked against a public key's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Shared secret (`kty: oct`)
    Hmac,
    /// RSA public key (`kty: RSA`)
    Rsa,
    /// Elliptic curve public key (`kty: EC`)
    Ec,
    /// Edwards curve public key (`kty: OKP`)
    Ed,
}

impl KeyFamily {
    /// Family an algorithm belongs to
    pub fn of(alg: Algorithm) -> Self {
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Self::Hmac,
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Self::Rsa,
            Algorithm::ES256 | Algorithm::ES384 => Self::Ec,
            Algorithm::EdDSA => Self::Ed,
        }
    }

    fn from_kty(kty: &str) -> Option<Self> {
        match kty {
            "oct" => Some(Self::Hmac),
            "RSA" => Some(Self::Rsa),
            "EC" => Some(Self::Ec),
            "OKP" => Some(Self::Ed),
            _ => None,
        }
    }
}

/// A verification key from the active set
///
/// Immutable once loaded; replaced only by swapping the whole [`KeySet`].
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: Option<Algorithm>,
    family: KeyFamily,
    decoding_key: DecodingKey,
}

// Manual Debug impl to keep key material out of logs
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("family", &self.family)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl SigningKey {
    /// Build a symmetric key directly from secret bytes
    ///
    /// Used where a single shared secret is configured instead of a JWKS.
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if `algorithm` is not an HMAC algorithm.
    pub fn from_secret(kid: impl Into<String>, algorithm: Algorithm, secret: &[u8]) -> Result<Self> {
        if KeyFamily::of(algorithm) != KeyFamily::Hmac {
            return Err(VerifyError::key_load(format!(
                "{algorithm:?} cannot be used with a shared secret"
            )));
        }
        Ok(Self {
            kid: kid.into(),
            algorithm: Some(algorithm),
            family: KeyFamily::Hmac,
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Build a key from one JWKS entry
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if the entry has no `kid`, an unsupported `kty`
    /// or `alg`, or key material `jsonwebtoken` cannot decode.
    pub fn from_jwk_value(entry: &Value) -> Result<Self> {
        let kid = entry
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| VerifyError::key_load("JWK has no kid"))?
            .to_string();

        let kty = entry.get("kty").and_then(Value::as_str).unwrap_or_default();
        let family = KeyFamily::from_kty(kty).ok_or_else(|| {
            VerifyError::key_load(format!("JWK {kid}: unsupported key type '{kty}'"))
        })?;

        let algorithm = match entry.get("alg").and_then(Value::as_str) {
            Some(alg) => {
                let alg = Algorithm::from_str(alg).map_err(|e| {
                    VerifyError::key_load(format!("JWK {kid}: unsupported alg '{alg}': {e}"))
                })?;
                if KeyFamily::of(alg) != family {
                    return Err(VerifyError::key_load(format!(
                        "JWK {kid}: alg {alg:?} does not fit key type '{kty}'"
                    )));
                }
                Some(alg)
            }
            None => None,
        };

        let jwk: Jwk = serde_json::from_value(entry.clone())
            .map_err(|e| VerifyError::key_load(format!("JWK {kid}: {e}")))?;
        let decoding_key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| VerifyError::key_load(format!("JWK {kid}: invalid key material: {e}")))?;

        Ok(Self {
            kid,
            algorithm,
            family,
            decoding_key,
        })
    }

    /// Key identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm declared by the key, if any
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Key family
    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Whether a token header algorithm may be verified with this key
    pub fn permits(&self, alg: Algorithm) -> bool {
        match self.algorithm {
            Some(declared) => declared == alg,
            None => KeyFamily::of(alg) == self.family,
        }
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Mapping from `kid` to [`SigningKey`]
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
}

#[derive(Deserialize)]
struct JwksDocument {
    keys: Vec<Value>,
}

impl KeySet {
    /// An empty set; every lookup misses
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JWKS document
    ///
    /// Entries whose `use` is set to anything but `"sig"` are dropped, as are
    /// entries without a `kid` (they could never be resolved). A later entry
    /// replaces an earlier one with the same `kid`.
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if the document is not JSON of the shape
    /// `{"keys": [...]}` or any retained entry cannot be turned into a key.
    pub fn from_jwks_json(document: &str) -> Result<Self> {
        let jwks: JwksDocument = serde_json::from_str(document)
            .map_err(|e| VerifyError::key_load(format!("invalid JWKS document: {e}")))?;

        let mut set = Self::new();
        for entry in &jwks.keys {
            match entry.get("use").and_then(Value::as_str) {
                None | Some("sig") => {}
                Some(other) => {
                    debug!(kid = ?entry.get("kid"), key_use = other, "Skipping non-signing JWK");
                    continue;
                }
            }
            if entry.get("kid").and_then(Value::as_str).is_none() {
                warn!("Skipping JWK without kid");
                continue;
            }
            set.insert(SigningKey::from_jwk_value(entry)?);
        }
        Ok(set)
    }

    /// Add a key, replacing any key with the same `kid`
    pub fn insert(&mut self, key: SigningKey) {
        let kid = key.kid.clone();
        if self.keys.insert(kid.clone(), Arc::new(key)).is_some() {
            warn!(kid = %kid, "Duplicate kid in key set, keeping the later key");
        }
    }

    /// Look up a key
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    /// Whether a `kid` is present
    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// All key identifiers, sorted
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<SigningKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = SigningKey>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// Where a JWKS document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Inline JSON document
    Inline(String),
    /// JSON file on disk
    File(PathBuf),
    /// HTTP(S) endpoint; plain HTTP only for loopback hosts
    Url(String),
    /// Nothing configured: an empty key set
    Empty,
}

impl KeySource {
    /// Read and parse the source into a fresh [`KeySet`]
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if the source cannot be read or parsed.
    pub async fn load(&self, http_client: &reqwest::Client) -> Result<KeySet> {
        match self {
            Self::Inline(document) => KeySet::from_jwks_json(document),
            Self::File(path) => {
                let document = tokio::fs::read_to_string(path).await.map_err(|e| {
                    VerifyError::key_load(format!("cannot read {}: {e}", path.display()))
                })?;
                KeySet::from_jwks_json(&document)
            }
            Self::Url(uri) => {
                require_secure_endpoint(uri)?;
                let response = http_client
                    .get(uri)
                    .send()
                    .await
                    .map_err(|e| VerifyError::key_load(format!("JWKS fetch failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(VerifyError::key_load(format!(
                        "JWKS endpoint returned status {}",
                        response.status()
                    )));
                }
                let document = response
                    .text()
                    .await
                    .map_err(|e| VerifyError::key_load(format!("JWKS fetch failed: {e}")))?;
                KeySet::from_jwks_json(&document)
            }
            Self::Empty => Ok(KeySet::new()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Inline(_) => "inline".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Url(uri) => uri.clone(),
            Self::Empty => "none".to_string(),
        }
    }
}

/// Reject non-HTTPS endpoints unless they point at the local machine
pub(crate) fn require_secure_endpoint(uri: &str) -> Result<()> {
    let parsed = url::Url::parse(uri)
        .map_err(|e| VerifyError::key_load(format!("invalid JWKS URL '{uri}': {e}")))?;
    let loopback = matches!(
        parsed.host_str(),
        Some("localhost" | "127.0.0.1" | "[::1]")
    );
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        _ => Err(VerifyError::key_load(
            "JWKS endpoint must use HTTPS (HTTP only allowed for localhost)",
        )),
    }
}

/// Refreshable cache mapping `kid` to [`SigningKey`]
///
/// # Example
///
/// ```rust
/// use tokengate::jwt::{KeyResolver, KeySet};
///
/// let resolver = KeyResolver::from_key_set(KeySet::new());
/// assert!(resolver.resolve(Some("k1")).is_err());
/// ```
pub struct KeyResolver {
    source: KeySource,
    active: ArcSwap<KeySet>,
    // Serializes reloads only; resolution never touches it
    reload_lock: tokio::sync::Mutex<()>,
    http_client: reqwest::Client,
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("source", &self.source.describe())
            .field("kids", &self.active.load().kids())
            .finish()
    }
}

impl KeyResolver {
    /// Load the source once and build a resolver over it
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if the initial load fails.
    pub async fn load(source: KeySource) -> Result<Self> {
        let http_client = build_http_client()?;
        let set = source.load(&http_client).await?;
        info!(source = %source.describe(), key_count = set.len(), "Loaded signing keys");
        Ok(Self {
            source,
            active: ArcSwap::from_pointee(set),
            reload_lock: tokio::sync::Mutex::new(()),
            http_client,
        })
    }

    /// Resolver over a fixed set; reloading it keeps the set unchanged
    pub fn from_key_set(set: KeySet) -> Self {
        Self {
            source: KeySource::Empty,
            active: ArcSwap::from_pointee(set),
            reload_lock: tokio::sync::Mutex::new(()),
            http_client: reqwest::Client::new(),
        }
    }

    /// Find the key for a token header's `kid`
    ///
    /// # Errors
    ///
    /// - [`VerifyError::MissingKeyId`] when `kid` is `None`
    /// - [`VerifyError::UnknownKey`] when the active set has no such key
    pub fn resolve(&self, kid: Option<&str>) -> Result<Arc<SigningKey>> {
        let kid = kid.ok_or(VerifyError::MissingKeyId)?;
        self.active.load().get(kid).ok_or_else(|| {
            debug!(kid = kid, "Key ID not found in active key set");
            VerifyError::UnknownKey {
                kid: kid.to_string(),
            }
        })
    }

    /// The active key set, as one consistent snapshot
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.active.load_full()
    }

    /// Re-read the source and atomically replace the active set
    ///
    /// Returns the number of keys now active. A static resolver (built with
    /// [`KeyResolver::from_key_set`]) keeps its set. Overlapping reloads run
    /// one at a time, so the last reload to start is the last to store.
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeyLoad`] if the source cannot be loaded; the previous
    /// set stays active.
    pub async fn reload(&self) -> Result<usize> {
        if self.source == KeySource::Empty {
            return Ok(self.active.load().len());
        }

        let _reloading = self.reload_lock.lock().await;
        let set = match self.source.load(&self.http_client).await {
            Ok(set) => set,
            Err(e) => {
                warn!(
                    source = %self.source.describe(),
                    error = %e,
                    "Key reload failed, keeping previous key set"
                );
                return Err(e);
            }
        };

        let key_count = set.len();
        self.active.store(Arc::new(set));
        info!(source = %self.source.describe(), key_count, "Reloaded signing keys");
        Ok(key_count)
    }

    /// The configured source
    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(JWKS_FETCH_TIMEOUT)
        .build()
        .map_err(|e| VerifyError::key_load(format!("cannot build HTTP client: {e}")))
}
