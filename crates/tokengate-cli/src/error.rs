//! Error types for CLI operations

use std::fmt;
use thiserror::Error;
use tokengate::{ConfigError, ErrorKind, VerifyError};

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Token rejected or keys unusable
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Trust-domain configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token endpoint unreachable, timed out or answered with an error status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token endpoint answered without a usable token
    #[error("Token request failed: {0}")]
    TokenRequest(String),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Verify(err) => match err.kind() {
                ErrorKind::MalformedToken => vec![
                    "Pass the compact form: three base64url segments joined by '.'",
                    "Run `tokengate decode` to inspect the header and payload",
                ],
                ErrorKind::MissingKeyId | ErrorKind::UnknownKey => vec![
                    "Check the token's `kid` header against the JWKS",
                    "Run `tokengate decode` to see which kid the token names",
                ],
                ErrorKind::AlgorithmMismatch => vec![
                    "Use --algorithm to match the key's declared algorithm",
                ],
                ErrorKind::Signature => vec!["Check that the secret or JWKS belongs to the issuer"],
                ErrorKind::Expired | ErrorKind::NotYetValid => vec![
                    "Check the system clock",
                    "Increase tolerance with --leeway",
                ],
                ErrorKind::IssuerMismatch | ErrorKind::AudienceMismatch => vec![
                    "Compare --issuer/--audience with the decoded payload",
                ],
                ErrorKind::KeyLoad => vec![
                    "Check that the JWKS file or URL is reachable and valid JSON",
                ],
                ErrorKind::IntrospectionUnavailable => vec![
                    "Check that the introspection endpoint is running",
                    "Verify the client credentials in the configuration",
                ],
                _ => vec![],
            },
            Self::Config(_) => vec![
                "Configuration files must end in .toml, .yaml, .yml or .json",
                "Environment overrides use the --env-prefix prefix, e.g. TOKENGATE_AUDIENCE",
            ],
            Self::InvalidArguments(_) => vec!["Use --help to see expected arguments"],
            Self::Http(_) | Self::TokenRequest(_) => vec![
                "Check --issuer: the token endpoint is <issuer>/token",
                "Verify --client-id and --secret with the authorization server",
            ],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Verify(err) if err.kind() == ErrorKind::KeyLoad => ErrorCategory::Keys,
            Self::Verify(err) if err.kind() == ErrorKind::IntrospectionUnavailable => {
                ErrorCategory::Upstream
            }
            Self::Verify(_) => ErrorCategory::Rejected,
            Self::Config(_) => ErrorCategory::Config,
            Self::InvalidArguments(_) => ErrorCategory::User,
            Self::Http(_) | Self::TokenRequest(_) => ErrorCategory::Upstream,
            Self::Json(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Rejected,
    Keys,
    Upstream,
    Config,
    User,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "Token Rejected"),
            Self::Keys => write!(f, "Key Loading"),
            Self::Upstream => write!(f, "Upstream"),
            Self::Config => write!(f, "Configuration"),
            Self::User => write!(f, "User Input"),
            Self::System => write!(f, "System"),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
