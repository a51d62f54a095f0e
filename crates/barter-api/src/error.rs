use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use barter_db::StoreError;

use crate::pages;

/// Request-scoped failures. Validation problems are not errors: handlers
/// re-render their form instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing row, or a row the requester is not allowed to touch.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("auth: {0}")]
    Auth(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, pages::not_found()).into_response(),
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, pages::server_error()).into_response()
            }
        }
    }
}
