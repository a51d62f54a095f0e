//! Form cleaning. Every `clean_*` function either produces the typed values a
//! handler needs or a [`FormErrors`] to re-render the form with. Nothing here
//! mutates the store.

use std::collections::BTreeMap;

use url::Url;
use validator::{Validate, ValidationErrors};

use barter_db::Database;
use barter_db::models::{AdFields, AdRow};
use barter_types::api::{AdForm, ProposalForm, SignupForm};
use barter_types::models::Condition;

use crate::auth;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_URL: &str = "Enter a valid URL.";
pub const DUPLICATE_PROPOSAL: &str =
    "You've already sent an exchange proposal for this same pair of ads.";

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn with_non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add_non_field(message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Fold in declarative rule failures, skipping fields that already failed
    /// an earlier check so each field reports its first problem only.
    fn merge(&mut self, errors: &ValidationErrors) {
        for (field, failures) in errors.field_errors() {
            let field = field.to_string();
            if self.fields.contains_key(&field) {
                continue;
            }
            for failure in failures.iter() {
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                self.add(&field, message);
            }
        }
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

/// Trimmed value of a required field, or `None` after recording the error.
fn required(errors: &mut FormErrors, field: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        None
    } else {
        Some(value.to_string())
    }
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https" | "ftp" | "ftps") && url.has_host())
        .unwrap_or(false)
}

// -- Ads --

pub fn clean_ad(form: &AdForm) -> Result<AdFields, FormErrors> {
    let mut errors = FormErrors::default();

    let title = required(&mut errors, "title", &form.title);
    let description = required(&mut errors, "description", &form.description);
    let category = required(&mut errors, "category", &form.category);
    let condition = required(&mut errors, "condition", &form.condition).and_then(|raw| {
        raw.parse::<Condition>()
            .map_err(|_| errors.add("condition", INVALID_CHOICE))
            .ok()
    });

    let image_url = Some(form.image_url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    if let Some(url) = &image_url {
        if !is_web_url(url) {
            errors.add("image_url", INVALID_URL);
        }
    }

    if let Err(e) = form.validate() {
        errors.merge(&e);
    }

    errors.into_result(|| AdFields {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        image_url,
        category: category.unwrap_or_default(),
        condition: condition.unwrap_or(Condition::New),
    })
}

/// Prefill the edit form with an ad's current values.
pub fn ad_form_from(ad: &AdRow) -> AdForm {
    AdForm {
        title: ad.title.clone(),
        description: ad.description.clone(),
        image_url: ad.image_url.clone().unwrap_or_default(),
        category: ad.category.clone(),
        condition: ad.condition.as_str().to_string(),
    }
}

// -- Exchange proposals --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalInput {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub comment: String,
}

/// Both ads must exist, and the pair must not already have a pending or
/// accepted proposal. The unique index still guards the insert itself.
pub fn clean_proposal(
    db: &Database,
    form: &ProposalForm,
) -> barter_db::Result<Result<ProposalInput, FormErrors>> {
    let mut errors = FormErrors::default();

    let sender_id = existing_ad(db, &mut errors, "ad_sender", &form.ad_sender)?;
    let receiver_id = existing_ad(db, &mut errors, "ad_receiver", &form.ad_receiver)?;
    let comment = required(&mut errors, "comment", &form.comment);

    if let (Some(sender_id), Some(receiver_id)) = (sender_id, receiver_id) {
        if db.has_open_proposal(sender_id, receiver_id)? {
            errors.add_non_field(DUPLICATE_PROPOSAL);
        }
    }

    Ok(errors.into_result(|| ProposalInput {
        sender_id: sender_id.unwrap_or_default(),
        receiver_id: receiver_id.unwrap_or_default(),
        comment: comment.unwrap_or_default(),
    }))
}

fn existing_ad(
    db: &Database,
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
) -> barter_db::Result<Option<i64>> {
    let Some(raw) = required(errors, field, raw) else {
        return Ok(None);
    };
    let Ok(id) = raw.parse::<i64>() else {
        errors.add(field, INVALID_CHOICE);
        return Ok(None);
    };
    if db.get_ad(id)?.is_none() {
        errors.add(field, INVALID_CHOICE);
        return Ok(None);
    }
    Ok(Some(id))
}

// -- Accounts --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn clean_signup(
    db: &Database,
    form: &SignupForm,
) -> barter_db::Result<Result<SignupInput, FormErrors>> {
    let mut errors = FormErrors::default();

    let username = required(&mut errors, "username", &form.username);
    let email = required(&mut errors, "email", &form.email);
    if form.password1.is_empty() {
        errors.add("password1", REQUIRED);
    }
    if form.password2.is_empty() {
        errors.add("password2", REQUIRED);
    }

    if let Some(name) = &username {
        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add("username", INVALID_USERNAME);
        } else if db.get_user_by_username(name)?.is_some() {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    if !form.password1.is_empty() && !form.password2.is_empty() {
        if form.password1 != form.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else {
            let problems = auth::password_problems(
                &form.password2,
                username.as_deref().unwrap_or_default(),
                email.as_deref().unwrap_or_default(),
            );
            for problem in problems {
                errors.add("password2", problem);
            }
        }
    }

    let trimmed = SignupForm {
        username: username.clone().unwrap_or_default(),
        email: email.clone().unwrap_or_default(),
        ..form.clone()
    };
    if let Err(e) = trimmed.validate() {
        errors.merge(&e);
    }

    Ok(errors.into_result(|| SignupInput {
        username: username.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: form.password1.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad_form(title: &str, condition: &str, image_url: &str) -> AdForm {
        AdForm {
            title: title.into(),
            description: "Third".into(),
            image_url: image_url.into(),
            category: "CatC".into(),
            condition: condition.into(),
        }
    }

    fn signup_form(username: &str, email: &str, p1: &str, p2: &str) -> SignupForm {
        SignupForm {
            username: username.into(),
            email: email.into(),
            password1: p1.into(),
            password2: p2.into(),
        }
    }

    #[test]
    fn valid_ad_is_trimmed_and_typed() {
        let fields = clean_ad(&ad_form("  Gamma ", "used", "")).unwrap();
        assert_eq!(fields.title, "Gamma");
        assert_eq!(fields.condition, Condition::Used);
        assert_eq!(fields.image_url, None);

        let with_image = clean_ad(&ad_form("Gamma", "new", "https://img.example/a.png")).unwrap();
        assert_eq!(with_image.image_url.as_deref(), Some("https://img.example/a.png"));
    }

    #[test]
    fn ad_field_errors_are_reported_per_field() {
        let errors = clean_ad(&AdForm::default()).unwrap_err();
        for field in ["title", "description", "category", "condition"] {
            assert_eq!(errors.field(field), [REQUIRED.to_string()], "{field}");
        }
        assert!(errors.field("image_url").is_empty());

        let errors = clean_ad(&ad_form("Gamma", "broken", "not a url")).unwrap_err();
        assert_eq!(errors.field("condition"), [INVALID_CHOICE.to_string()]);
        assert_eq!(errors.field("image_url"), [INVALID_URL.to_string()]);

        let errors = clean_ad(&ad_form(&"x".repeat(256), "new", "")).unwrap_err();
        assert_eq!(errors.field("title").len(), 1);
        assert!(errors.field("title")[0].contains("at most 255"));
    }

    #[test]
    fn image_url_needs_a_web_scheme() {
        assert!(is_web_url("http://example.com/x.jpg"));
        assert!(!is_web_url("mailto:someone@example.com"));
        assert!(!is_web_url("example.com/x.jpg"));
    }

    #[test]
    fn proposal_requires_existing_ads_and_open_pair() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "user1", "u1@example.com", "hash").unwrap();
        let fields = clean_ad(&ad_form("Alpha", "new", "")).unwrap();
        let alpha = db.insert_ad("u1", &fields).unwrap();
        let beta = db.insert_ad("u1", &fields).unwrap();

        let form = ProposalForm {
            ad_sender: alpha.to_string(),
            ad_receiver: "999".into(),
            comment: String::new(),
        };
        let errors = clean_proposal(&db, &form).unwrap().unwrap_err();
        assert_eq!(errors.field("ad_receiver"), [INVALID_CHOICE.to_string()]);
        assert_eq!(errors.field("comment"), [REQUIRED.to_string()]);
        assert!(errors.non_field().is_empty());

        let form = ProposalForm {
            ad_sender: alpha.to_string(),
            ad_receiver: beta.to_string(),
            comment: "Let us swap".into(),
        };
        let input = clean_proposal(&db, &form).unwrap().unwrap();
        assert_eq!(input.sender_id, alpha);
        assert_eq!(input.receiver_id, beta);

        db.insert_proposal(alpha, beta, "Let us swap").unwrap();
        let errors = clean_proposal(&db, &form).unwrap().unwrap_err();
        assert_eq!(errors.non_field(), [DUPLICATE_PROPOSAL.to_string()]);
    }

    #[test]
    fn signup_checks_passwords_and_username() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "user1", "u1@example.com", "hash").unwrap();

        let ok = clean_signup(
            &db,
            &signup_form("newuser", "newuser@gmail.com", "complexpass123", "complexpass123"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(ok.username, "newuser");

        let mismatch = clean_signup(
            &db,
            &signup_form("newuser", "newuser@gmail.com", "complexpass123", "complexpass124"),
        )
        .unwrap()
        .unwrap_err();
        assert_eq!(mismatch.field("password2"), [PASSWORD_MISMATCH.to_string()]);

        let taken = clean_signup(
            &db,
            &signup_form("user1", "x@gmail.com", "complexpass123", "complexpass123"),
        )
        .unwrap()
        .unwrap_err();
        assert_eq!(taken.field("username"), [USERNAME_TAKEN.to_string()]);

        let bad = clean_signup(&db, &signup_form("bad name!", "not-an-email", "short", "short"))
            .unwrap()
            .unwrap_err();
        assert_eq!(bad.field("username"), [INVALID_USERNAME.to_string()]);
        assert_eq!(bad.field("email"), ["Enter a valid email address.".to_string()]);
        assert!(bad.field("password2")[0].contains("too short"));
    }
}
