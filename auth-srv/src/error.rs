use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum SrvError {
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for SrvError {
    fn into_response(self) -> Response<Body> {
        match &self {
            SrvError::Internal(err) => {
                // details stay in the logs
                error!("{err:?}");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, status.canonical_reason().unwrap_or_default()).into_response()
            }
        }
    }
}
