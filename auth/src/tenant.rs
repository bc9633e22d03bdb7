//! Tenant information published by the tenant-resolution layer
//!
//! The tenant-resolution middleware runs before authentication and inserts a
//! [`TenantContext`] in the request extensions. Authentication reads it through
//! a [`TenantContextProvider`] so services with another source can plug it in.

use http::request::Parts;
use thiserror::Error;
use url::Url;

/// Tenant resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// Base URI of the platform serving the tenant, the identity provider lives under it
    pub system_base_uri: Url,
    /// Tenant identifier
    pub tenant_id: String,
}

impl TenantContext {
    pub fn new(system_base_uri: Url, tenant_id: impl Into<String>) -> Self {
        Self {
            system_base_uri,
            tenant_id: tenant_id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TenantContextError {
    #[error("system base uri not available for request: {0}")]
    MissingSystemBaseUri(String),
    #[error("tenant id not available for request: {0}")]
    MissingTenantId(String),
}

/// Source of the tenant information for a request
pub trait TenantContextProvider: Send + Sync {
    fn system_base_uri(&self, parts: &Parts) -> Result<Url, TenantContextError>;

    fn tenant_id(&self, parts: &Parts) -> Result<String, TenantContextError>;
}

/// Reads the [`TenantContext`] request extension
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionTenantContext;

impl TenantContextProvider for ExtensionTenantContext {
    fn system_base_uri(&self, parts: &Parts) -> Result<Url, TenantContextError> {
        parts
            .extensions
            .get::<TenantContext>()
            .map(|ctx| ctx.system_base_uri.clone())
            .ok_or_else(|| TenantContextError::MissingSystemBaseUri(parts.uri.path().to_string()))
    }

    fn tenant_id(&self, parts: &Parts) -> Result<String, TenantContextError> {
        parts
            .extensions
            .get::<TenantContext>()
            .map(|ctx| ctx.tenant_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TenantContextError::MissingTenantId(parts.uri.path().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with(ctx: Option<TenantContext>) -> Parts {
        let mut request = http::Request::builder()
            .uri("/resource")
            .body(())
            .expect("build request");
        if let Some(ctx) = ctx {
            request.extensions_mut().insert(ctx);
        }
        request.into_parts().0
    }

    #[test]
    fn test_reads_extension() {
        let base = Url::parse("https://platform.example.com/").expect("url");
        let parts = parts_with(Some(TenantContext::new(base.clone(), "tenant-a")));
        let provider = ExtensionTenantContext;
        assert_eq!(provider.system_base_uri(&parts).expect("base uri"), base);
        assert_eq!(provider.tenant_id(&parts).expect("tenant id"), "tenant-a");
    }

    #[test]
    fn test_missing_extension() {
        let parts = parts_with(None);
        let provider = ExtensionTenantContext;
        assert!(matches!(
            provider.system_base_uri(&parts),
            Err(TenantContextError::MissingSystemBaseUri(_))
        ));
        assert!(matches!(
            provider.tenant_id(&parts),
            Err(TenantContextError::MissingTenantId(_))
        ));
    }

    #[test]
    fn test_empty_tenant_id() {
        let base = Url::parse("https://platform.example.com/").expect("url");
        let parts = parts_with(Some(TenantContext::new(base, "")));
        assert!(ExtensionTenantContext.tenant_id(&parts).is_err());
    }
}
