pub mod ads;
pub mod auth;
pub mod error;
pub mod extract;
pub mod forms;
pub mod middleware;
pub mod pages;
pub mod proposals;

use axum::{
    Router,
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};

use barter_db::Database;

pub use auth::{AppState, AppStateInner};
pub use error::AppError;

/// Build the full route table. Protected routes redirect anonymous visitors to the login page.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(|| async { redirect("/ads/") }))
        .route("/health", get(|| async { "ok" }))
        .route("/ads/", get(ads::list))
        .route("/ads/{id}/", get(ads::detail))
        .route("/signup/", get(auth::signup_page).post(auth::signup))
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/logout/", get(auth::logout).post(auth::logout));

    let protected_routes = Router::new()
        .route("/ads/create/", get(ads::create_page).post(ads::create))
        .route("/ads/{id}/edit/", get(ads::edit_page).post(ads::edit))
        .route("/ads/{id}/delete/", get(ads::delete_page).post(ads::delete))
        .route("/proposals/", get(proposals::list))
        .route(
            "/proposals/create/",
            get(proposals::create_page).post(proposals::create),
        )
        .route("/proposals/{id}/", get(proposals::detail))
        .route(
            "/proposals/{id}/update/",
            get(proposals::update_page).post(proposals::update),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// 302 Found, the way browsers expect after a successful form post.
pub(crate) fn redirect(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// Run store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db)).await?
}
