#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt; // for `collect`
use tower::ServiceExt;
use uuid::Uuid;

use barter_api::auth::{SESSION_COOKIE, create_token, hash_password};
use barter_api::{AppState, AppStateInner};
use barter_db::Database;
use barter_db::models::AdFields;
use barter_types::models::Condition;

pub const SECRET: &str = "test-secret";
pub const PASSWORD: &str = "complexpass123";

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let state = Arc::new(AppStateInner {
            db,
            secret: SECRET.to_string(),
            secure_cookies: false,
        });
        Self { state }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn router(&self) -> Router {
        barter_api::router(self.state.clone())
    }

    pub fn create_user(&self, username: &str) -> User {
        let id = Uuid::new_v4();
        // Argon2 is slow in debug builds; every fixture user shares one hash.
        static HASH: OnceLock<String> = OnceLock::new();
        let hash = HASH.get_or_init(|| hash_password(PASSWORD).unwrap());
        self.db()
            .create_user(
                &id.to_string(),
                username,
                &format!("{username}@example.com"),
                hash,
            )
            .unwrap();
        User {
            id,
            username: username.to_string(),
        }
    }

    pub fn create_ad(&self, owner: &User, title: &str, category: &str, condition: Condition) -> i64 {
        let fields = AdFields {
            title: title.to_string(),
            description: format!("Description of {title}"),
            image_url: None,
            category: category.to_string(),
            condition,
        };
        self.db().insert_ad(&owner.id.to_string(), &fields).unwrap()
    }

    pub async fn get(&self, uri: &str, user: Option<&User>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::COOKIE, user.cookie());
        }
        self.router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_form(
        &self,
        uri: &str,
        user: Option<&User>,
        fields: &[(&str, &str)],
    ) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(user) = user {
            builder = builder.header(header::COOKIE, user.cookie());
        }
        self.router()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }
}

pub struct User {
    pub id: Uuid,
    pub username: String,
}

impl User {
    pub fn cookie(&self) -> String {
        let token = create_token(SECRET, self.id, &self.username).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), to);
}

/// The session token set by a login or signup response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}
