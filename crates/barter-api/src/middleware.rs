use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::{AppState, current_user};
use crate::redirect;

/// Validate the session cookie and expose its `Claims` as a request extension.
/// Anonymous visitors are sent to the login page and brought back afterwards.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match current_user(&jar, &state) {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            debug!(uri = %req.uri(), "Anonymous request to protected route");
            redirect(login_url(req.uri()))
        }
    }
}

pub fn login_url(uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("/login/?next={next}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_keeps_path_and_query() {
        let uri: Uri = "/proposals/?status=pending".parse().unwrap();
        assert_eq!(
            login_url(&uri),
            "/login/?next=%2Fproposals%2F%3Fstatus%3Dpending"
        );
    }
}
