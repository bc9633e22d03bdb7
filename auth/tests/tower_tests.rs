use async_trait::async_trait;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use http::header::{ACCEPT, AUTHORIZATION, COOKIE, LOCATION, WWW_AUTHENTICATE};
use http::{Request, StatusCode};
use idp_auth::config::IdpAuthConfig;
use idp_auth::idp::{IdpError, PrincipalValidator};
use idp_auth::middleware::IdpAuth;
use idp_auth::tenant::{ExtensionTenantContext, TenantContext};
use idp_auth::tower::IdpAuthLayer;
use idp_auth::types::{Credential, Principal};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};
use url::Url;

/// Validator answering from a fixed table instead of a remote identity provider
struct StaticValidator;

#[async_trait]
impl PrincipalValidator for StaticValidator {
    async fn validate(
        &self,
        _system_base_uri: &Url,
        tenant_id: &str,
        credential: &str,
        _allow_external: bool,
    ) -> Result<Principal, IdpError> {
        match credential {
            "secret" => Ok(Principal {
                id: format!("{tenant_id}-user"),
                user_name: "test".to_string(),
                ..Default::default()
            }),
            "external" => Err(IdpError::ExternalNotAllowed),
            _ => Err(IdpError::InvalidCredential),
        }
    }
}

// Mock service checking the identity published by the authentication layer
#[derive(Clone)]
struct MockService;

impl Service<Request<Body>> for MockService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let principal = req.extensions().get::<Principal>().cloned();
        let credential = req.extensions().get::<Credential>().cloned();
        Box::pin(async move {
            let response = match (principal, credential) {
                (Some(p), Some(c)) => format!("{}:{}", p.id, c.as_str()).into_response(),
                _ => StatusCode::IM_A_TEAPOT.into_response(),
            };
            Ok(response)
        })
    }
}

fn auth() -> Arc<IdpAuth> {
    Arc::new(IdpAuth::new(
        Arc::new(StaticValidator),
        Arc::new(ExtensionTenantContext),
        &IdpAuthConfig::default(),
    ))
}

fn request(headers: &[(http::HeaderName, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri("/reports?id=3");
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    let mut req = builder.body(Body::empty()).expect("build request");
    req.extensions_mut().insert(TenantContext::new(
        Url::parse("https://platform.example.com/").expect("url"),
        "tenant-a",
    ));
    req
}

#[tokio::test]
async fn test_layer_with_valid_credential() {
    let service = IdpAuthLayer::new(auth()).layer(MockService);

    let response = service
        .oneshot(request(&[(AUTHORIZATION, "Bearer secret")]))
        .await
        .expect("call service");

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert_eq!(&body[..], b"tenant-a-user:secret");
}

#[tokio::test]
async fn test_layer_with_cookie_credential() {
    let mut service = IdpAuthLayer::new(auth()).layer(MockService);

    let response = service
        .ready()
        .await
        .expect("ready")
        .call(request(&[(COOKIE, "AuthSessionId=secret")]))
        .await
        .expect("call service");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_layer_without_credential() {
    let service = IdpAuthLayer::new(auth()).layer(MockService);

    let response = service
        .clone()
        .oneshot(request(&[(ACCEPT, "application/json")]))
        .await
        .expect("call service");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");

    let response = service
        .oneshot(request(&[(ACCEPT, "text/html")]))
        .await
        .expect("call service");
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[LOCATION],
        "/identityprovider/login?redirect=%2Freports%3Fid%3D3"
    );
}

#[tokio::test]
async fn test_layer_with_rejected_credentials() {
    let service = IdpAuthLayer::new(auth()).layer(MockService);

    let response = service
        .clone()
        .oneshot(request(&[(AUTHORIZATION, "Bearer wrong")]))
        .await
        .expect("call service");
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = service
        .oneshot(request(&[(AUTHORIZATION, "Bearer external")]))
        .await
        .expect("call service");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_layer_without_tenant_context() {
    let service = IdpAuthLayer::new(auth()).layer(MockService);
    let req = Request::builder()
        .uri("/reports")
        .header(AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .expect("build request");

    let response = service.oneshot(req).await.expect("call service");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
