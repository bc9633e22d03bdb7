//! axum-utils : observability middleware

use axum::response::Response;
use axum::{extract::Request, middleware::Next};
use std::time::Instant;
use tracing::{info, warn};

/// Log every request with its response status and duration.
///
/// Only the path is logged, query strings can carry secrets.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    info!("request method={method} path={path}");
    let begin = Instant::now();
    let response = next.run(Request::from_parts(parts, body)).await;
    let duration = begin.elapsed();
    let status = response.status();
    if status.is_server_error() {
        warn!("response status={status} method={method} path={path} duration={duration:?}");
    } else {
        info!("response status={status} method={method} path={path} duration={duration:?}");
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_response_passes_through() {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/fail",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            )
            .layer(axum::middleware::from_fn(observability_middleware));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ok?token=x").body(Body::empty()).expect("request"))
            .await
            .expect("call service");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/fail").body(Body::empty()).expect("request"))
            .await
            .expect("call service");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
