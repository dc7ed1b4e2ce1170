//! Verification configuration
//!
//! [`TrustDomainConfig`] is what operators write (file and/or environment);
//! [`VerificationPolicy`] is the immutable snapshot the verifiers enforce.

use std::path::{Path, PathBuf};
use std::time::Duration;

use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde::Deserialize;

use crate::jwt::KeySource;

/// Default clock-skew leeway
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Default bound on a single introspection call
pub const DEFAULT_INTROSPECTION_TIMEOUT_SECS: u64 = 5;

/// Immutable claim policy for one trust domain
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use jsonwebtoken::Algorithm;
/// use tokengate::VerificationPolicy;
///
/// let policy = VerificationPolicy::new()
///     .with_issuer("https://demo-issuer")
///     .with_audience("workout10-api")
///     .with_algorithm(Algorithm::RS256)
///     .with_leeway(Duration::from_secs(30))
///     .with_replay_protection(true);
///
/// assert_eq!(policy.leeway_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    issuer: Option<String>,
    audience: Option<String>,
    algorithm: Option<Algorithm>,
    leeway: Duration,
    replay_protection: bool,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            algorithm: None,
            leeway: Duration::from_secs(DEFAULT_LEEWAY_SECS),
            replay_protection: false,
        }
    }
}

impl VerificationPolicy {
    /// Policy with no issuer/audience/algorithm pins, default leeway, replay off
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this exact `iss`
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require this value among the token audiences
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Pin the header algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Clock-skew tolerance for `exp` and `nbf`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Turn `jti` replay detection on or off
    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.replay_protection = enabled;
        self
    }

    /// Expected issuer
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Expected audience
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Pinned algorithm
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Leeway
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Leeway in whole seconds, saturated into `i64`
    pub fn leeway_secs(&self) -> i64 {
        i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX)
    }

    /// Whether replay detection is on
    pub fn replay_protection(&self) -> bool {
        self.replay_protection
    }
}

/// Where the JWKS comes from (first non-empty of `inline`, `path`, `url`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JwksConfig {
    /// Inline JWKS JSON
    #[serde(default)]
    pub inline: Option<String>,
    /// JWKS file
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// JWKS endpoint
    #[serde(default)]
    pub url: Option<String>,
}

impl JwksConfig {
    /// The key source this section selects
    pub fn source(&self) -> KeySource {
        if let Some(inline) = self.inline.as_ref().filter(|s| !s.trim().is_empty()) {
            KeySource::Inline(inline.clone())
        } else if let Some(path) = &self.path {
            KeySource::File(path.clone())
        } else if let Some(url) = &self.url {
            KeySource::Url(url.clone())
        } else {
            KeySource::Empty
        }
    }
}

/// Remote introspection endpoint and the credentials to call it with
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionConfig {
    /// Introspection endpoint URL
    pub endpoint: String,
    /// Client ID presented to the endpoint
    pub client_id: String,
    /// Client secret (stored securely with automatic zeroization on drop)
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    /// Bound on one call, in seconds
    #[serde(default = "default_introspection_timeout")]
    pub timeout_secs: u64,
}

fn default_introspection_timeout() -> u64 {
    DEFAULT_INTROSPECTION_TIMEOUT_SECS
}

fn default_leeway() -> u64 {
    DEFAULT_LEEWAY_SECS
}

impl IntrospectionConfig {
    /// Timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration surface of one trust domain
///
/// Remote (introspection) mode is selected when an `introspection` section is
/// present; otherwise tokens are verified locally against `jwks`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustDomainConfig {
    /// Expected `iss`
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected audience
    #[serde(default)]
    pub audience: Option<String>,
    /// Pinned algorithm (e.g. `"RS256"`)
    #[serde(default)]
    pub algorithm: Option<Algorithm>,
    /// Clock-skew leeway in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,
    /// Reject re-presented `jti`s
    #[serde(default)]
    pub replay_protection: bool,
    /// Local-mode key source
    #[serde(default)]
    pub jwks: Option<JwksConfig>,
    /// Remote-mode endpoint
    #[serde(default)]
    pub introspection: Option<IntrospectionConfig>,
}

impl Default for TrustDomainConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            algorithm: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            replay_protection: false,
            jwks: None,
            introspection: None,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Config file exists but cannot be inspected
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),
}

impl TrustDomainConfig {
    /// Load from a file, with `{env_prefix}_*` environment variables taking precedence
    ///
    /// Nested keys use `__`: `TOKENGATE_JWKS__PATH=/etc/keys.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, has an unsupported extension,
    /// or the merged configuration does not deserialize.
    pub fn from_file(path: impl AsRef<Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }
        let file = file_source(path)?;
        Self::build(Some(file), environment(env_prefix))
    }

    /// Load from environment variables only
    ///
    /// # Errors
    ///
    /// Returns an error if the variables do not deserialize.
    pub fn from_env(env_prefix: &str) -> Result<Self, ConfigError> {
        Self::build(None, environment(env_prefix))
    }

    fn build(
        file: Option<config::File<config::FileSourceFile, config::FileFormat>>,
        env: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        // Environment variables override file settings (12-factor app pattern)
        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }

    /// The immutable policy this configuration describes
    pub fn policy(&self) -> VerificationPolicy {
        let mut policy = VerificationPolicy::new()
            .with_leeway(Duration::from_secs(self.leeway_secs))
            .with_replay_protection(self.replay_protection);
        if let Some(issuer) = &self.issuer {
            policy = policy.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.audience {
            policy = policy.with_audience(audience.clone());
        }
        if let Some(algorithm) = self.algorithm {
            policy = policy.with_algorithm(algorithm);
        }
        policy
    }

    /// The local-mode key source
    pub fn key_source(&self) -> KeySource {
        self.jwks
            .as_ref()
            .map_or(KeySource::Empty, JwksConfig::source)
    }
}

fn file_source(
    path: &Path,
) -> Result<config::File<config::FileSourceFile, config::FileFormat>, ConfigError> {
    use config::{File, FileFormat};

    let format = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => FileFormat::Toml,
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => return Err(ConfigError::UnsupportedFormat),
    };
    let name = path.to_str().ok_or(ConfigError::UnsupportedFormat)?;
    Ok(File::new(name, format))
}

fn environment(prefix: &str) -> config::Environment {
    config::Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
