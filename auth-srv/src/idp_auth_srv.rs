mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use axum::http::header::ACCEPT;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json, Router, middleware, routing::get};
use clap::Parser;
use error::SrvError;
use idp_auth::axum::idp_auth_middleware;
use idp_auth::config::IdpAuthConfig;
use idp_auth::middleware::IdpAuth;
use idp_auth::negotiate::preferred;
use idp_auth::tenant::TenantContext;
use idp_auth::types::Principal;
use idp_axum_utils::observability_middleware;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[clap(name = "Identity provider authentication demo server")]
#[clap(about = "Serves routes protected by the platform identity provider", version)]
struct Cli {
    #[clap(long, default_value = "0.0.0.0:3000")]
    listen_endpoint_http: SocketAddr,

    /// Base uri of the platform hosting the identity provider
    #[clap(long, env = "IDP_SYSTEM_BASE_URI")]
    system_base_uri: Url,

    /// Tenant served by this instance
    #[clap(long, env = "IDP_TENANT_ID")]
    tenant_id: String,
}

const JSON: &str = "application/json";
const HTML: &str = "text/html";

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

async fn whoami(headers: HeaderMap, principal: Principal) -> Result<Response, SrvError> {
    let accept = headers.get(ACCEPT).and_then(|h| h.to_str().ok());
    if preferred(accept, &[JSON, HTML]) == Some(HTML) {
        let groups = principal
            .groups
            .iter()
            .map(|g| escape_html(g.display.as_deref().unwrap_or(&g.value)))
            .collect::<Vec<_>>()
            .join(", ");
        return Ok(Html(format!(
            "<html><body><h1>{}</h1><p>{}</p><p>{}</p></body></html>",
            escape_html(&principal.display_name),
            escape_html(principal.primary_email().unwrap_or_default()),
            groups
        ))
        .into_response());
    }
    let body = serde_json::to_value(&principal).context("serializing principal")?;
    Ok(Json(body).into_response())
}

fn make_app(auth: Arc<IdpAuth>, tenant: TenantContext) -> Router {
    let protected = Router::new()
        .route("/whoami", get(whoami))
        .route_layer(middleware::from_fn(move |req, next| {
            idp_auth_middleware(auth.clone(), req, next)
        }));
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(protected)
        .layer(middleware::from_fn(observability_middleware))
        .layer(Extension(tenant))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Cli::parse();
    let config = IdpAuthConfig::from_env()?;
    let auth = Arc::new(IdpAuth::from_config(&config)?);
    info!(
        "tenant={} identity provider base={} allow_external={}",
        args.tenant_id, args.system_base_uri, config.allow_external
    );
    let app = make_app(auth, TenantContext::new(args.system_base_uri, args.tenant_id));
    let listener = tokio::net::TcpListener::bind(args.listen_endpoint_http)
        .await
        .with_context(|| format!("binding {}", args.listen_endpoint_http))?;
    info!("Server running on {}", args.listen_endpoint_http);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app() -> Router {
        let auth = Arc::new(IdpAuth::from_config(&IdpAuthConfig::default()).expect("create auth"));
        let tenant = TenantContext::new(
            Url::parse("http://127.0.0.1:1/").expect("url"),
            "tenant-a",
        );
        make_app(auth, tenant)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("call service");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_whoami_requires_credential() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(ACCEPT, JSON)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call service");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_whoami_unreachable_identity_provider() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(axum::http::header::AUTHORIZATION, "Bearer token")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("call service");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }
}
