mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

use common::{PASSWORD, TestApp, assert_redirect, body_string, location, session_cookie};

fn signup_fields<'a>(username: &'a str, password1: &'a str, password2: &'a str) -> [(&'a str, &'a str); 4] {
    [
        ("username", username),
        ("email", "newuser@gmail.com"),
        ("password1", password1),
        ("password2", password2),
    ]
}

async fn get_with_cookie(app: &TestApp, uri: &str, cookie: &str) -> axum::http::Response<Body> {
    app.router()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn signup_creates_user_and_logs_in() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/signup/",
            None,
            &signup_fields("newuser", "complexpass123", "complexpass123"),
        )
        .await;

    assert_redirect(&response, "/ads/");
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(app.db().get_user_by_username("newuser").unwrap().is_some());

    let protected = get_with_cookie(&app, "/ads/create/", &cookie).await;
    assert_eq!(protected.status(), StatusCode::OK);
}

#[tokio::test]
async fn signup_rejects_mismatch_and_taken_username() {
    let app = TestApp::new();
    app.create_user("user1");

    let mismatch = app
        .post_form(
            "/signup/",
            None,
            &signup_fields("newuser", "complexpass123", "complexpass124"),
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::OK);
    assert!(session_cookie(&mismatch).is_none());
    assert!(app.db().get_user_by_username("newuser").unwrap().is_none());

    let taken = app
        .post_form(
            "/signup/",
            None,
            &signup_fields("user1", "complexpass123", "complexpass123"),
        )
        .await;
    assert_eq!(taken.status(), StatusCode::OK);
    assert!(body_string(taken).await.contains("already exists"));
}

#[tokio::test]
async fn signup_rejects_weak_password() {
    let app = TestApp::new();

    let response = app
        .post_form("/signup/", None, &signup_fields("newuser", "12345678", "12345678"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("This password is too common."));
    assert!(body.contains("This password is entirely numeric."));
    assert!(app.db().get_user_by_username("newuser").unwrap().is_none());
}

#[tokio::test]
async fn login_follows_next_and_logout_clears_session() {
    let app = TestApp::new();
    let user1 = app.create_user("user1");

    let page = app.get("/login/?next=/proposals/", None).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_string(page).await.contains(r#"value="/proposals/""#));

    let response = app
        .post_form(
            "/login/",
            None,
            &[("username", "user1"), ("password", PASSWORD), ("next", "/proposals/")],
        )
        .await;
    assert_redirect(&response, "/proposals/");
    let cookie = session_cookie(&response).expect("session cookie");

    let protected = get_with_cookie(&app, "/proposals/", &cookie).await;
    assert_eq!(protected.status(), StatusCode::OK);

    let logout = app.post_form("/logout/", Some(&user1), &[]).await;
    assert_redirect(&logout, "/ads/");
    let cleared = logout
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("barter_session=") && v.contains("Max-Age=0"));
    assert!(cleared);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::new();
    app.create_user("user1");

    let response = app
        .post_form(
            "/login/",
            None,
            &[("username", "user1"), ("password", "wrong-password")],
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert!(body_string(response).await.contains("Please enter a correct username and password."));
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let app = TestApp::new();
    app.create_user("user1");

    let response = app
        .post_form(
            "/login/",
            None,
            &[
                ("username", "user1"),
                ("password", PASSWORD),
                ("next", "https://evil.example/"),
            ],
        )
        .await;

    assert_redirect(&response, "/ads/");
}

#[tokio::test]
async fn tampered_session_is_anonymous() {
    let app = TestApp::new();

    let response = get_with_cookie(&app, "/ads/create/", "barter_session=not-a-token").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(location(&response).starts_with("/login/"));
}

#[tokio::test]
async fn root_and_health() {
    let app = TestApp::new();

    assert_redirect(&app.get("/", None).await, "/ads/");

    let health = app.get("/health", None).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_string(health).await, "ok");
}

#[tokio::test]
async fn signup_post_ad_and_trade_end_to_end() {
    let app = TestApp::new();
    let user2 = app.create_user("user2");
    let wanted = app.create_ad(&user2, "Camera", "Photo", barter_types::models::Condition::Used);

    let signup = app
        .post_form(
            "/signup/",
            None,
            &signup_fields("newuser", "complexpass123", "complexpass123"),
        )
        .await;
    let cookie = session_cookie(&signup).expect("session cookie");

    let create = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ads/create/")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "title=Tripod&description=Sturdy+tripod&image_url=https%3A%2F%2Fimg.example%2Ft.jpg&category=Photo&condition=used",
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::FOUND);
    let offered: i64 = location(&create)
        .trim_start_matches("/ads/")
        .trim_end_matches('/')
        .parse()
        .unwrap();

    let propose = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/proposals/create/")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "ad_sender={offered}&ad_receiver={wanted}&comment=Tripod+for+your+camera%3F"
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(propose.status(), StatusCode::FOUND);
    let proposal_path = location(&propose).to_string();
    let proposal_id: i64 = proposal_path
        .trim_start_matches("/proposals/")
        .trim_end_matches('/')
        .parse()
        .unwrap();

    let accept = app
        .post_form(
            &format!("{proposal_path}update/"),
            Some(&user2),
            &[("status", "accepted")],
        )
        .await;
    assert_redirect(&accept, &proposal_path);

    let mine = body_string(get_with_cookie(&app, "/proposals/?status=accepted", &cookie).await).await;
    assert!(mine.contains("Tripod (newuser)"));
    assert!(mine.contains("Camera (user2)"));

    let detail = app.db().get_proposal(proposal_id).unwrap().unwrap();
    assert_eq!(detail.comment, "Tripod for your camera?");
}
