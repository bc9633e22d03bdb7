//! Identity-provider authentication for multi-tenant services
//!
//! This crate authenticates incoming HTTP requests against the platform
//! identity provider of the request's tenant:
//!
//! - **Credential extraction**: `Authorization: Bearer` header, then the
//!   `AuthSessionId` cookie
//! - **Validation**: remote call to `/identityprovider/validate`, with results
//!   cached for the duration the identity provider advertises
//! - **Rejection shaping**: browsers are redirected to the login page, API
//!   clients get `401 Unauthorized`
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{Router, middleware, routing::get};
//! use idp_auth::axum::idp_auth_middleware;
//! use idp_auth::config::IdpAuthConfig;
//! use idp_auth::middleware::IdpAuth;
//! use idp_auth::types::Principal;
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let auth = Arc::new(IdpAuth::from_config(&IdpAuthConfig::from_env()?)?);
//!
//! // the tenant-resolution layer must run before, publishing a TenantContext
//! let app: Router = Router::new()
//!     .route("/whoami", get(|principal: Principal| async move { principal.user_name }))
//!     .layer(middleware::from_fn(move |req, next| {
//!         idp_auth_middleware(auth.clone(), req, next)
//!     }));
//! # Ok(())
//! # }
//! ```

/// Principal and credential types
pub mod types;

/// Credential extraction from request headers and cookies
pub mod credential;

/// Accept header negotiation
pub mod negotiate;

/// Principal cache with per-entry expiration
pub mod cache;

/// Tenant context supplied by the tenant-resolution layer
pub mod tenant;

/// Configuration
pub mod config;

/// Identity provider validation client
pub mod idp;

/// Per-request authentication decision
pub mod middleware;

/// Axum middleware and extractors
pub mod axum;

/// Tower layer
pub mod tower;
