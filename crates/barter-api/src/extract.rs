use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use tracing::debug;

use crate::AppError;

/// Numeric `{id}` path segment. Anything that is not an integer is a 404,
/// the same as an id with no row behind it.
#[derive(Debug, Clone, Copy)]
pub struct RowId(pub i64);

impl<S> FromRequestParts<S> for RowId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(RowId(id)),
            Err(rejection) => {
                debug!(uri = %parts.uri, %rejection, "Malformed id in path");
                Err(AppError::NotFound)
            }
        }
    }
}
