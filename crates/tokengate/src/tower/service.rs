//! Tower Service for bearer-token verification

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, Request, Response};
use tower_service::Service;
use tracing::{debug, warn};

use crate::bearer::bearer_from_headers;
use crate::engine::TokenVerifier;
use crate::error::VerifyError;

use super::BearerAuthConfig;

/// Future type for [`BearerAuthService`] responses
pub type BearerAuthFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Verifies the bearer credential before forwarding to the inner service
#[derive(Debug, Clone)]
pub struct BearerAuthService<S> {
    inner: S,
    verifier: Arc<dyn TokenVerifier>,
    config: BearerAuthConfig,
}

impl<S> BearerAuthService<S> {
    /// Create a new service
    pub fn new(inner: S, verifier: Arc<dyn TokenVerifier>, config: BearerAuthConfig) -> Self {
        Self {
            inner,
            verifier,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn rejection<B: Default>(error: &VerifyError) -> Response<B> {
    let mut response = Response::new(B::default());
    *response.status_mut() = error.status_code();
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

impl<S, B, ResBody> Service<Request<B>> for BearerAuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BearerAuthFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let token = bearer_from_headers(req.headers()).map(str::to_string);
        let verifier = Arc::clone(&self.verifier);

        Box::pin(async move {
            let verified = match token {
                Ok(token) => verifier.verify(&token).await,
                Err(e) => Err(e),
            };

            match verified {
                Ok(verified) => {
                    debug!(subject = ?verified.claims.sub(), path = %req.uri().path(), "Request authenticated");
                    req.extensions_mut().insert(verified);
                    inner.call(req).await
                }
                Err(e) => {
                    warn!(
                        kind = %e.kind(),
                        status = e.status_code().as_u16(),
                        path = %req.uri().path(),
                        "Rejected request: {}",
                        e.public_message()
                    );
                    Ok(rejection(&e))
                }
            }
        })
    }
}
