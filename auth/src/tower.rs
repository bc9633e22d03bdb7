//! Tower layer for identity-provider authentication.
//!
//! Wraps any service answering with axum responses, for stacks assembled with
//! `tower::ServiceBuilder` rather than `axum::middleware::from_fn`.

use crate::middleware::IdpAuth;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer producing [`IdpAuthService`]
///
/// # Example
///
/// ```rust,ignore
/// use idp_auth::tower::IdpAuthLayer;
///
/// let service = tower::ServiceBuilder::new()
///     .layer(IdpAuthLayer::new(auth))
///     .service(inner);
/// ```
#[derive(Clone)]
pub struct IdpAuthLayer {
    auth: Arc<IdpAuth>,
}

impl IdpAuthLayer {
    pub fn new(auth: Arc<IdpAuth>) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for IdpAuthLayer {
    type Service = IdpAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdpAuthService {
            inner,
            auth: self.auth.clone(),
        }
    }
}

/// Authentication service wrapper.
///
/// Authenticated requests reach the inner service with the principal and the
/// credential in their extensions; the others are answered directly.
#[derive(Clone)]
pub struct IdpAuthService<S> {
    /// The inner service to wrap
    pub inner: S,
    pub auth: Arc<IdpAuth>,
}

impl<S, B> Service<http::Request<B>> for IdpAuthService<S>
where
    S: Service<http::Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        // the ready inner service is the one that must serve this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let auth = self.auth.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            match auth.authenticate(&parts).await {
                Ok((principal, credential)) => {
                    parts.extensions.insert(principal);
                    parts.extensions.insert(credential);
                    inner.call(http::Request::from_parts(parts, body)).await
                }
                Err(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}
