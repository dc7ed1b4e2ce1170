//! # Tower middleware
//!
//! [`BearerAuthLayer`] guards any `http::Request<B>` service with a
//! [`TokenVerifier`](crate::TokenVerifier):
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use tokengate::tower::BearerAuthLayer;
//!
//! let verifier = tokengate::build_verifier(&config).await?;
//! let service = ServiceBuilder::new()
//!     .layer(BearerAuthLayer::new(verifier).bypass_path("/health"))
//!     .service(my_http_handler);
//! ```
//!
//! ## Request Extensions
//!
//! On success the [`VerifiedToken`](crate::VerifiedToken) is inserted into the
//! request's extensions:
//!
//! ```rust,ignore
//! if let Some(verified) = req.extensions().get::<VerifiedToken>() {
//!     println!("subject: {:?}", verified.claims.sub());
//! }
//! ```
//!
//! ## Rejections
//!
//! A rejected request never reaches the inner service. The response carries
//! [`VerifyError::status_code`](crate::VerifyError::status_code), a
//! `WWW-Authenticate: Bearer` header and an empty body; the specific error kind
//! is only logged.

mod layer;
mod service;

pub use layer::BearerAuthLayer;
pub use service::{BearerAuthFuture, BearerAuthService};

/// Configuration for the bearer auth layer
#[derive(Debug, Clone, Default)]
pub struct BearerAuthConfig {
    /// Paths served without a credential (exact match, e.g. `/health`)
    pub bypass_paths: Vec<String>,
}

impl BearerAuthConfig {
    /// Whether `path` skips verification
    pub fn should_bypass(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }
}
