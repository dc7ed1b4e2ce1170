//! Verification error taxonomy
//!
//! Every check in the pipeline fails with its own variant. Nothing inside the
//! crate collapses a specific failure into a generic "invalid token"; callers
//! that face untrusted clients can use [`VerifyError::public_message`] for the
//! outward response and log [`VerifyError::kind`] internally.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, VerifyError>;

/// A rejected verification attempt or a failed key load
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// No bearer credential was presented
    #[error("Missing bearer credential")]
    MissingCredential,

    /// Token is not three dot-separated segments or a segment cannot be decoded
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// What was wrong with the token
        reason: String,
    },

    /// Token header carries no `kid`
    #[error("Token header has no key identifier")]
    MissingKeyId,

    /// `kid` is not present in the active key set
    #[error("Unknown signing key: {kid}")]
    UnknownKey {
        /// The key identifier from the token header
        kid: String,
    },

    /// Header algorithm disagrees with the key or the pinned policy algorithm
    #[error("Unexpected algorithm {found}; expected {expected}")]
    AlgorithmMismatch {
        /// Algorithm the caller is allowed to use
        expected: String,
        /// Algorithm named in the token header
        found: String,
    },

    /// Signature does not verify against the resolved key
    #[error("Signature verification failed")]
    Signature,

    /// `exp` plus leeway lies in the past
    #[error("Token expired at {exp} (now {now})")]
    Expired {
        /// Expiry claim
        exp: i64,
        /// Verification time
        now: i64,
    },

    /// `nbf` minus leeway lies in the future
    #[error("Token not valid before {nbf} (now {now})")]
    NotYetValid {
        /// Not-before claim
        nbf: i64,
        /// Verification time
        now: i64,
    },

    /// `iss` missing or different from the policy issuer
    #[error("Issuer mismatch: expected {expected}, found {}", .found.as_deref().unwrap_or("<none>"))]
    IssuerMismatch {
        /// Issuer the policy requires
        expected: String,
        /// Issuer carried by the token
        found: Option<String>,
    },

    /// Policy audience is not among the token audiences
    #[error("Audience mismatch: {expected} not in token audience")]
    AudienceMismatch {
        /// Audience the policy requires
        expected: String,
    },

    /// Replay protection is on and the token has no `jti`
    #[error("Missing jti claim")]
    MissingReplayId,

    /// The `jti` was already accepted and has not expired yet
    #[error("Token replay detected for jti {jti}")]
    Replay {
        /// The replayed token identifier
        jti: String,
    },

    /// Introspection endpoint unreachable, timed out, or answered unsuccessfully
    #[error("Introspection unavailable: {reason}")]
    IntrospectionUnavailable {
        /// Transport or status detail
        reason: String,
    },

    /// Introspection authority reports the token as inactive
    #[error("Token inactive")]
    TokenInactive,

    /// Key source unreadable or malformed
    #[error("Failed to load signing keys: {reason}")]
    KeyLoad {
        /// What went wrong while loading
        reason: String,
    },
}

/// Field-free discriminant of [`VerifyError`], suitable for log fields and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`VerifyError::MissingCredential`]
    MissingCredential,
    /// See [`VerifyError::MalformedToken`]
    MalformedToken,
    /// See [`VerifyError::MissingKeyId`]
    MissingKeyId,
    /// See [`VerifyError::UnknownKey`]
    UnknownKey,
    /// See [`VerifyError::AlgorithmMismatch`]
    AlgorithmMismatch,
    /// See [`VerifyError::Signature`]
    Signature,
    /// See [`VerifyError::Expired`]
    Expired,
    /// See [`VerifyError::NotYetValid`]
    NotYetValid,
    /// See [`VerifyError::IssuerMismatch`]
    IssuerMismatch,
    /// See [`VerifyError::AudienceMismatch`]
    AudienceMismatch,
    /// See [`VerifyError::MissingReplayId`]
    MissingReplayId,
    /// See [`VerifyError::Replay`]
    Replay,
    /// See [`VerifyError::IntrospectionUnavailable`]
    IntrospectionUnavailable,
    /// See [`VerifyError::TokenInactive`]
    TokenInactive,
    /// See [`VerifyError::KeyLoad`]
    KeyLoad,
}

impl ErrorKind {
    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedToken => "malformed_token",
            Self::MissingKeyId => "missing_key_id",
            Self::UnknownKey => "unknown_key",
            Self::AlgorithmMismatch => "algorithm_mismatch",
            Self::Signature => "signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::AudienceMismatch => "audience_mismatch",
            Self::MissingReplayId => "missing_replay_id",
            Self::Replay => "replay",
            Self::IntrospectionUnavailable => "introspection_unavailable",
            Self::TokenInactive => "token_inactive",
            Self::KeyLoad => "key_load",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl VerifyError {
    /// Build a [`VerifyError::MalformedToken`]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Build a [`VerifyError::KeyLoad`]
    pub fn key_load(reason: impl Into<String>) -> Self {
        Self::KeyLoad {
            reason: reason.into(),
        }
    }

    /// Build a [`VerifyError::IntrospectionUnavailable`]
    pub fn introspection_unavailable(reason: impl Into<String>) -> Self {
        Self::IntrospectionUnavailable {
            reason: reason.into(),
        }
    }

    /// The discriminant of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredential => ErrorKind::MissingCredential,
            Self::MalformedToken { .. } => ErrorKind::MalformedToken,
            Self::MissingKeyId => ErrorKind::MissingKeyId,
            Self::UnknownKey { .. } => ErrorKind::UnknownKey,
            Self::AlgorithmMismatch { .. } => ErrorKind::AlgorithmMismatch,
            Self::Signature => ErrorKind::Signature,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::NotYetValid { .. } => ErrorKind::NotYetValid,
            Self::IssuerMismatch { .. } => ErrorKind::IssuerMismatch,
            Self::AudienceMismatch { .. } => ErrorKind::AudienceMismatch,
            Self::MissingReplayId => ErrorKind::MissingReplayId,
            Self::Replay { .. } => ErrorKind::Replay,
            Self::IntrospectionUnavailable { .. } => ErrorKind::IntrospectionUnavailable,
            Self::TokenInactive => ErrorKind::TokenInactive,
            Self::KeyLoad { .. } => ErrorKind::KeyLoad,
        }
    }

    /// HTTP status a boundary layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Replay { .. } => StatusCode::CONFLICT,
            Self::IntrospectionUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::KeyLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message safe to show an untrusted client
    ///
    /// Token-content failures all read the same so that responses do not act as
    /// a verification oracle.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Missing Authorization header",
            Self::IntrospectionUnavailable { .. } => "Token introspection failed",
            Self::KeyLoad { .. } => "Token verification unavailable",
            _ => "Token verification failed",
        }
    }
}
