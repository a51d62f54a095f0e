use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use barter_db::Database;
use barter_types::api::{Claims, LoginForm, LoginQuery, SignupForm};

use crate::forms::{self, FormErrors};
use crate::{AppError, blocking, pages, redirect};

pub const SESSION_COOKIE: &str = "barter_session";

const SESSION_DAYS: i64 = 30;
const MIN_PASSWORD_LENGTH: usize = 8;

/// A handful of the passwords every credential-stuffing list starts with.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwertyui",
    "qwerty123",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "trustno1",
    "abc12345",
];

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub secret: String,
    /// Mark the session cookie `Secure`. Off for plain-HTTP local runs.
    pub secure_cookies: bool,
}

// -- Passwords --

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Auth(format!("hash password: {e}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Strength rules a new password must satisfy. Empty means acceptable.
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    let email_local = email.split('@').next().unwrap_or_default();
    for (label, attribute) in [("username", username), ("email address", email_local)] {
        if too_similar(&lowered, &attribute.to_lowercase()) {
            problems.push(format!("The password is too similar to the {label}."));
            break;
        }
    }

    problems
}

fn too_similar(password: &str, attribute: &str) -> bool {
    if attribute.chars().count() < 3 || password.is_empty() {
        return false;
    }
    password.contains(attribute) || attribute.contains(password)
}

// -- Session tokens --

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Auth(format!("sign session: {e}")))
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// The logged-in user, if the request carries a valid session cookie.
pub fn current_user(jar: &CookieJar, state: &AppState) -> Option<Claims> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| decode_token(&state.secret, cookie.value()))
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .build()
}

fn log_in(jar: CookieJar, state: &AppState, user_id: Uuid, username: &str) -> Result<CookieJar, AppError> {
    let token = create_token(&state.secret, user_id, username)?;
    Ok(jar.add(session_cookie(state, token)))
}

/// Only same-site paths are followed after login.
fn safe_next(next: &str) -> Option<&str> {
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then_some(next)
}

// -- Handlers --

pub async fn signup_page(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let user = current_user(&jar, &state);
    pages::signup(user.as_ref(), &SignupForm::default(), &FormErrors::default())
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let submitted = form.clone();
    let outcome = blocking(&state, move |db| {
        let input = match forms::clean_signup(db, &submitted)? {
            Ok(input) => input,
            Err(errors) => return Ok(Err(errors)),
        };
        let password_hash = hash_password(&input.password)?;
        let user_id = Uuid::new_v4();
        db.create_user(
            &user_id.to_string(),
            &input.username,
            &input.email,
            &password_hash,
        )?;
        Ok(Ok((user_id, input.username)))
    })
    .await?;

    match outcome {
        Ok((user_id, username)) => {
            info!(%user_id, %username, "User signed up");
            let jar = log_in(jar, &state, user_id, &username)?;
            Ok((jar, redirect("/ads/")).into_response())
        }
        Err(errors) => {
            let user = current_user(&jar, &state);
            Ok(pages::signup(user.as_ref(), &form, &errors).into_response())
        }
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let user = current_user(&jar, &state);
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..Default::default()
    };
    pages::login(user.as_ref(), &form, &FormErrors::default())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let mut errors = FormErrors::default();
    if form.username.trim().is_empty() {
        errors.add("username", forms::REQUIRED);
    }
    if form.password.is_empty() {
        errors.add("password", forms::REQUIRED);
    }

    if errors.is_empty() {
        let username = form.username.trim().to_string();
        let password = form.password.clone();
        let user = blocking(&state, move |db| {
            let user = db.get_user_by_username(&username)?;
            Ok(user.filter(|u| verify_password(&password, &u.password)))
        })
        .await?;

        match user {
            Some(user) => {
                let user_id: Uuid = user
                    .id
                    .parse()
                    .map_err(|e| AppError::Auth(format!("corrupt user id '{}': {e}", user.id)))?;
                info!(%user_id, username = %user.username, "User logged in");
                let jar = log_in(jar, &state, user_id, &user.username)?;
                let target = safe_next(&form.next).unwrap_or("/ads/");
                return Ok((jar, redirect(target)).into_response());
            }
            None => {
                warn!(username = %form.username.trim(), "Failed login attempt");
                errors.add_non_field(
                    "Please enter a correct username and password. Note that both fields may be case-sensitive.",
                );
            }
        }
    }

    let user = current_user(&jar, &state);
    let form = LoginForm {
        password: String::new(),
        ..form
    };
    Ok(pages::login(user.as_ref(), &form, &errors).into_response())
}

pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, redirect("/ads/")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("complexpass123").unwrap();
        assert!(verify_password("complexpass123", &hash));
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("complexpass123", "not-a-hash"));
    }

    #[test]
    fn session_token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", user_id, "user1").unwrap();

        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "user1");

        assert!(decode_token("other-secret", &token).is_none());
        assert!(decode_token("secret", "garbage").is_none());
    }

    #[test]
    fn strong_password_has_no_problems() {
        assert!(password_problems("complexpass123", "newuser", "newuser@gmail.com").is_empty());
    }

    #[test]
    fn weak_passwords_are_reported() {
        let short = password_problems("abc12", "newuser", "n@example.com");
        assert!(short.iter().any(|p| p.contains("too short")));

        let numeric = password_problems("1234567890", "newuser", "n@example.com");
        assert!(numeric.iter().any(|p| p.contains("entirely numeric")));
        assert!(numeric.iter().any(|p| p.contains("too common")));

        let similar = password_problems("newuser2024", "newuser", "n@example.com");
        assert!(similar.iter().any(|p| p.contains("similar to the username")));

        let similar_email = password_problems("tradermike!", "someone", "tradermike@example.com");
        assert!(similar_email.iter().any(|p| p.contains("email address")));
    }

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next("/proposals/"), Some("/proposals/"));
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("https://evil.example"), None);
        assert_eq!(safe_next(""), None);
    }
}
