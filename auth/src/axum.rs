//! Axum middleware for identity-provider authentication
//!
//! Provides authentication middleware for Axum HTTP services that:
//! 1. Extracts the credential from the Authorization header or session cookie
//! 2. Validates it with the identity provider of the request's tenant
//! 3. Injects the [`Principal`] and [`Credential`] into request extensions
//! 4. Answers with a login redirect, 401, 403 or 500 when authentication fails

use crate::middleware::IdpAuth;
use crate::types::{Credential, Principal};
use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

/// Axum middleware authenticating requests with the identity provider
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware};
/// use idp_auth::axum::idp_auth_middleware;
/// use idp_auth::config::IdpAuthConfig;
/// use idp_auth::middleware::IdpAuth;
/// use std::sync::Arc;
///
/// let auth = Arc::new(IdpAuth::from_config(&IdpAuthConfig::default())?);
/// let app = Router::new()
///     .layer(middleware::from_fn(move |req, next| {
///         idp_auth_middleware(auth.clone(), req, next)
///     }));
/// ```
pub async fn idp_auth_middleware(auth: Arc<IdpAuth>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    match auth.authenticate(&parts).await {
        Ok((principal, credential)) => {
            parts.extensions.insert(principal);
            parts.extensions.insert(credential);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

fn extension<T: Clone + Send + Sync + 'static>(parts: &Parts) -> Result<T, StatusCode> {
    parts.extensions.get::<T>().cloned().ok_or_else(|| {
        error!(
            "{} missing from request extensions, is the authentication middleware installed?",
            std::any::type_name::<T>()
        );
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extension(parts)
    }
}

impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extension(parts)
    }
}
