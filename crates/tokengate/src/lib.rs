//! # Tokengate - Bearer Token Verification
//!
//! Guards protected endpoints by turning a raw bearer token into a verified
//! claim set or a precise, typed rejection.
//!
//! ## Trust Models
//!
//! - **Local** - the token's `kid` selects a key from a refreshable JWKS cache,
//!   the signature is checked, then a declarative claim policy (issuer,
//!   audience, expiry, not-before, leeway) and an optional `jti` replay guard
//! - **Remote** - an OAuth 2.0 introspection endpoint (RFC 7662) decides
//!   liveness; only the audience rule is applied locally
//!
//! Both implement [`TokenVerifier`], so a boundary layer does not care which
//! one it talks to.
//!
//! ## Architecture
//!
//! - [`jwt`] - header parsing, key resolution ([`KeyResolver`]) and claim
//!   validation ([`JwtValidator`])
//! - [`replay`] - time-bounded `jti` deduplication
//! - [`engine`] - [`LocalVerifier`], [`TokenVerifier`], [`build_verifier`]
//! - [`introspection`] - [`IntrospectionClient`] and [`RemoteVerifier`]
//! - [`config`] - [`TrustDomainConfig`] and the immutable [`VerificationPolicy`]
//! - [`bearer`] - `Authorization` header parsing
//! - [`inspect`] - unverified decoding for diagnostics
//! - `tower` - Tower middleware (feature `middleware`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokengate::{KeyResolver, KeySource, LocalVerifier, TokenVerifier, VerificationPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let keys = KeyResolver::load(KeySource::File("/etc/tokengate/jwks.json".into())).await?;
//! let verifier = LocalVerifier::new(
//!     VerificationPolicy::new()
//!         .with_issuer("https://demo-issuer")
//!         .with_audience("workout10-api")
//!         .with_replay_protection(true),
//!     Arc::new(keys),
//! );
//!
//! let verified = verifier.verify_bearer(Some("Bearer eyJ...")).await?;
//! println!("kid={:?} sub={:?}", verified.key_id, verified.claims.sub());
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every rejection is a distinct [`VerifyError`] variant. Boundary layers should
//! show [`VerifyError::public_message`] to clients and log
//! [`VerifyError::kind`] internally.
//!
//! ## Feature Flags
//!
//! - `middleware` - Tower `Layer` / `Service` integration

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bearer;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod introspection;
pub mod jwt;
pub mod replay;

#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[doc(inline)]
pub use bearer::{bearer_from_headers, extract_bearer};
#[doc(inline)]
pub use clock::{Clock, ManualClock, SystemClock};
#[doc(inline)]
pub use config::{
    ConfigError, IntrospectionConfig, JwksConfig, TrustDomainConfig, VerificationPolicy,
};
#[doc(inline)]
pub use engine::{
    LocalVerifier, TokenVerifier, VerificationSource, VerifiedToken, build_verifier,
};
#[doc(inline)]
pub use error::{ErrorKind, Result, VerifyError};
#[doc(inline)]
pub use inspect::{UnverifiedToken, decode_unverified};
#[doc(inline)]
pub use introspection::{IntrospectionClient, RemoteVerifier};
#[doc(inline)]
pub use jwt::{
    ClaimSet, JwtValidator, KeyFamily, KeyResolver, KeySet, KeySource, SigningKey, TokenHeader,
};
#[doc(inline)]
pub use replay::{MemoryReplayCache, ReplayStore};

// Re-exported so callers can name algorithms without a direct dependency
pub use jsonwebtoken::Algorithm;
