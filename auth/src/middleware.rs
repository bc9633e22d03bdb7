//! Per-request authentication decision
//!
//! [`IdpAuth`] turns a request into either an authenticated identity or an
//! [`AuthRejection`] response. The axum middleware and the tower layer are
//! thin wrappers around [`IdpAuth::authenticate`].

use crate::config::IdpAuthConfig;
use crate::credential::extract_credential;
use crate::idp::{IdpError, IdpValidator, PrincipalValidator};
use crate::negotiate::should_redirect_to_login;
use crate::tenant::{ExtensionTenantContext, TenantContextProvider};
use crate::types::{Credential, Principal};
use axum::extract::OriginalUri;
use axum::response::{IntoResponse, Response};
use http::header::{ACCEPT, LOCATION, WWW_AUTHENTICATE};
use http::request::Parts;
use http::{HeaderValue, StatusCode, Uri};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::form_urlencoded;

/// Query parameter of the login url carrying the original request uri
pub const REDIRECT_PARAM: &str = "redirect";

/// Response sent instead of running the downstream handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// `302 Found` to the login page
    LoginRedirect { location: String },
    /// `401 Unauthorized` with `WWW-Authenticate: Bearer`
    Unauthorized,
    /// `403 Forbidden`
    Forbidden,
    /// `500 Internal Server Error`
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::LoginRedirect { location } => {
                let mut response = StatusCode::FOUND.into_response();
                match HeaderValue::from_str(&location) {
                    Ok(value) => {
                        response.headers_mut().insert(LOCATION, value);
                        response
                    }
                    Err(e) => {
                        error!("invalid login redirect location: {e}");
                        AuthRejection::Internal.into_response()
                    }
                }
            }
            AuthRejection::Unauthorized => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            AuthRejection::Forbidden => status_reason(StatusCode::FORBIDDEN),
            AuthRejection::Internal => status_reason(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

fn status_reason(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

/// Login url for a request, carrying its path and query as the redirect target
pub fn login_location(login_path: &str, uri: &Uri) -> String {
    let original = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let encoded: String = form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{login_path}?{REDIRECT_PARAM}={encoded}")
}

/// Identity-provider authentication shared by every request of a service
pub struct IdpAuth {
    validator: Arc<dyn PrincipalValidator>,
    tenant: Arc<dyn TenantContextProvider>,
    login_path: String,
    allow_external: bool,
}

impl std::fmt::Debug for IdpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpAuth")
            .field("login_path", &self.login_path)
            .field("allow_external", &self.allow_external)
            .finish_non_exhaustive()
    }
}

impl IdpAuth {
    /// Create the authentication with explicit collaborators
    pub fn new(
        validator: Arc<dyn PrincipalValidator>,
        tenant: Arc<dyn TenantContextProvider>,
        config: &IdpAuthConfig,
    ) -> Self {
        Self {
            validator,
            tenant,
            login_path: config.login_path.clone(),
            allow_external: config.allow_external,
        }
    }

    /// Create the authentication with the remote identity provider, an
    /// in-process principal cache and the tenant read from request extensions
    pub fn from_config(config: &IdpAuthConfig) -> anyhow::Result<Self> {
        let validator = Arc::new(IdpValidator::from_config(config)?);
        Ok(Self::new(validator, Arc::new(ExtensionTenantContext), config))
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn allow_external(&self) -> bool {
        self.allow_external
    }

    fn login_redirect(&self, parts: &Parts) -> AuthRejection {
        // nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        AuthRejection::LoginRedirect {
            location: login_location(&self.login_path, uri),
        }
    }

    /// Resolve the caller of a request
    pub async fn authenticate(
        &self,
        parts: &Parts,
    ) -> Result<(Principal, Credential), AuthRejection> {
        let credential = match extract_credential(&parts.headers) {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                let accept = parts.headers.get(ACCEPT).and_then(|h| h.to_str().ok());
                if should_redirect_to_login(&parts.method, accept) {
                    debug!("no credential, redirecting to login uri={}", parts.uri);
                    return Err(self.login_redirect(parts));
                }
                debug!("no credential method={} uri={}", parts.method, parts.uri);
                return Err(AuthRejection::Unauthorized);
            }
            Err(e) => {
                error!("reading credential: {e}");
                return Err(AuthRejection::Internal);
            }
        };

        let system_base_uri = self.tenant.system_base_uri(parts).map_err(|e| {
            error!("{e}");
            AuthRejection::Internal
        })?;
        let tenant_id = self.tenant.tenant_id(parts).map_err(|e| {
            error!("{e}");
            AuthRejection::Internal
        })?;

        match self
            .validator
            .validate(
                &system_base_uri,
                &tenant_id,
                credential.as_str(),
                self.allow_external,
            )
            .await
        {
            Ok(principal) => {
                info!(
                    "authenticated: tenant={tenant_id} id={} user={} external={}",
                    principal.id,
                    principal.user_name,
                    principal.is_external()
                );
                Ok((principal, credential))
            }
            Err(IdpError::InvalidCredential) => {
                info!("invalid credential tenant={tenant_id} uri={}", parts.uri);
                Err(self.login_redirect(parts))
            }
            Err(IdpError::ExternalNotAllowed) => {
                info!("external principal rejected tenant={tenant_id}");
                Err(AuthRejection::Forbidden)
            }
            Err(e) => {
                error!(
                    "validating credential tenant={tenant_id} timeout={}: {e}",
                    e.is_timeout()
                );
                Err(AuthRejection::Internal)
            }
        }
    }
}
