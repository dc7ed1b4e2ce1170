//! Tower Layer for bearer-token verification

use std::sync::Arc;
use tower::Layer;

use crate::engine::TokenVerifier;

use super::BearerAuthConfig;
use super::service::BearerAuthService;

/// Tower Layer that wraps services with [`BearerAuthService`]
#[derive(Debug, Clone)]
pub struct BearerAuthLayer {
    verifier: Arc<dyn TokenVerifier>,
    config: BearerAuthConfig,
}

impl BearerAuthLayer {
    /// Create a new layer with default configuration
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            config: BearerAuthConfig::default(),
        }
    }

    /// Create a new layer with custom configuration
    pub fn with_config(verifier: Arc<dyn TokenVerifier>, config: BearerAuthConfig) -> Self {
        Self { verifier, config }
    }

    /// Serve `path` without a credential
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService::new(inner, Arc::clone(&self.verifier), self.config.clone())
    }
}
