//! Credential validation against the platform identity provider

use crate::cache::{MokaPrincipalCache, PrincipalCache, cache_key};
use crate::config::IdpAuthConfig;
use crate::types::Principal;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use http::StatusCode;
use http::header::{ACCEPT, CACHE_CONTROL, HeaderMap};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Path of the validation endpoint, relative to the system base uri
pub const VALIDATE_PATH: &str = "/identityprovider/validate";

/// Query flag asking the identity provider to admit external principals
pub const ALLOW_EXTERNAL_PARAM: &str = "allowExternalValidation";

/// Outcome of a failed validation
#[derive(Debug, Error)]
pub enum IdpError {
    /// The credential is unknown or expired
    #[error("credential rejected by identity provider")]
    InvalidCredential,
    /// The credential belongs to an external principal and external admission is off
    #[error("external principal not allowed")]
    ExternalNotAllowed,
    /// Malformed or incomplete response from the identity provider
    #[error("invalid identity provider response: {0}")]
    RemoteProtocol(String),
    /// Unexpected status from the identity provider
    #[error("identity provider responded with {status}: {body}")]
    RemoteStatus { status: StatusCode, body: String },
    /// Network failure or timeout
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The validation url could not be built from the system base uri
    #[error("invalid identity provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl IdpError {
    /// True if the remote call timed out, the caller may retry
    pub fn is_timeout(&self) -> bool {
        matches!(self, IdpError::Transport(e) if e.is_timeout())
    }
}

/// Exchanges a credential for a principal
#[async_trait]
pub trait PrincipalValidator: Send + Sync {
    async fn validate(
        &self,
        system_base_uri: &Url,
        tenant_id: &str,
        credential: &str,
        allow_external: bool,
    ) -> Result<Principal, IdpError>;
}

/// Build the validation url for a system base uri
pub fn validation_url(system_base_uri: &Url, allow_external: bool) -> Result<Url, IdpError> {
    let mut url = system_base_uri.join(VALIDATE_PATH)?;
    if allow_external {
        url.query_pairs_mut().append_pair(ALLOW_EXTERNAL_PARAM, "true");
    }
    Ok(url)
}

/// Duration a response may be cached, from its `Cache-Control: max-age` directive.
///
/// Returns `None` when the directive is missing, not a non-negative integer, or zero.
pub fn cache_max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(','))
        .filter_map(|directive| directive.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("max-age"))
        .and_then(|(_, value)| value.trim().trim_matches('"').parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Validates credentials against the platform identity provider.
///
/// Successful validations are cached per tenant and credential for the
/// duration advertised by the identity provider.
pub struct IdpValidator {
    client: reqwest::Client,
    cache: Arc<dyn PrincipalCache>,
}

impl std::fmt::Debug for IdpValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpValidator").finish_non_exhaustive()
    }
}

impl IdpValidator {
    pub fn new(client: reqwest::Client, cache: Arc<dyn PrincipalCache>) -> Self {
        Self { client, cache }
    }

    /// Build a validator with its own http client and an in-process cache
    pub fn from_config(config: &IdpAuthConfig) -> Result<Self> {
        // redirects are not followed so credentials are only ever sent to the configured host
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {e:?}"))?;
        let cache = Arc::new(MokaPrincipalCache::new(config.principal_cache_size));
        Ok(Self::new(client, cache))
    }

    /// Call the identity provider, returning the principal and how long it may be cached
    async fn fetch_principal(
        &self,
        system_base_uri: &Url,
        credential: &str,
        allow_external: bool,
    ) -> Result<(Principal, Option<Duration>), IdpError> {
        let url = validation_url(system_base_uri, allow_external)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(credential)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let max_age = cache_max_age(response.headers());
        // read the whole body on every path so the connection goes back to the pool
        let body = response.bytes().await;

        match status {
            StatusCode::OK => {
                let body = body?;
                let principal: Principal = serde_json::from_slice(&body)
                    .map_err(|e| IdpError::RemoteProtocol(format!("invalid principal: {e}")))?;
                if principal.id.is_empty() && !principal.is_external() {
                    return Err(IdpError::RemoteProtocol(
                        "principal without id is not an external principal".to_string(),
                    ));
                }
                Ok((principal, max_age))
            }
            StatusCode::UNAUTHORIZED => Err(IdpError::InvalidCredential),
            StatusCode::FORBIDDEN => Err(IdpError::ExternalNotAllowed),
            status => {
                let body = body?;
                Err(IdpError::RemoteStatus {
                    status,
                    body: String::from_utf8_lossy(&body).into_owned(),
                })
            }
        }
    }
}

#[async_trait]
impl PrincipalValidator for IdpValidator {
    async fn validate(
        &self,
        system_base_uri: &Url,
        tenant_id: &str,
        credential: &str,
        allow_external: bool,
    ) -> Result<Principal, IdpError> {
        let key = cache_key(tenant_id, credential);
        if let Some(principal) = self.cache.get(&key).await {
            debug!("principal cache hit tenant={tenant_id} user={}", principal.user_name);
            // the entry may have been stored by a caller admitting external principals
            if !allow_external && principal.is_external() {
                return Err(IdpError::ExternalNotAllowed);
            }
            return Ok(principal);
        }

        let (principal, max_age) = self
            .fetch_principal(system_base_uri, credential, allow_external)
            .await?;

        if let Some(ttl) = max_age {
            debug!(
                "caching principal tenant={tenant_id} user={} ttl={ttl:?}",
                principal.user_name
            );
            self.cache.set(key, principal.clone(), ttl).await;
        }
        Ok(principal)
    }
}
