use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// -- Session Claims --

/// Session token payload. Signed by barter-api and carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

/// Treats an empty query parameter the same as a missing one.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// -- Accounts --

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct SignupForm {
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// -- Ads --

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct AdForm {
    #[validate(length(max = 255, message = "Ensure this value has at most 255 characters."))]
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub category: String,
    pub condition: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub page: Option<String>,
}

impl AdListQuery {
    /// Requested page number. A missing or non-integer value means the first
    /// page; zero and negative numbers are passed through as out of range.
    pub fn page_number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

// -- Exchange proposals --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProposalForm {
    pub ad_sender: String,
    pub ad_receiver: String,
    pub comment: String,
}

/// `GET /proposals/create/?ad_receiver=<id>` preselects the ad being asked for.
#[derive(Debug, Default, Deserialize)]
pub struct ProposalCreateQuery {
    pub ad_receiver: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProposalStatusForm {
    pub status: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProposalListQuery {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_query(page: Option<&str>) -> AdListQuery {
        AdListQuery {
            page: page.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn page_number_defaults_to_first_page() {
        assert_eq!(list_query(None).page_number(), 1);
        assert_eq!(list_query(Some("")).page_number(), 1);
        assert_eq!(list_query(Some("abc")).page_number(), 1);
        assert_eq!(list_query(Some("4")).page_number(), 4);
        assert_eq!(list_query(Some("0")).page_number(), 0);
        assert_eq!(list_query(Some("-3")).page_number(), -3);
    }

    #[test]
    fn empty_parameters_are_absent() {
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some(String::new())), None);
        assert_eq!(present(&Some("CatA".into())), Some("CatA"));
    }
}
