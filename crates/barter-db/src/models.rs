//! Database row types. Ads and proposals carry the joined owner usernames and
//! ad titles the pages need, so handlers never issue follow-up lookups.

use barter_types::models::{Condition, ProposalStatus};
use chrono::{DateTime, Utc};

/// What login needs from a user row.
pub struct UserRow {
    pub id: String,
    pub username: String,
    /// Argon2 PHC hash.
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AdRow {
    pub id: i64,
    pub owner_id: String,
    pub owner_username: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub condition: Condition,
    pub created_at: DateTime<Utc>,
}

/// The user-editable columns of an ad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdFields {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub condition: Condition,
}

/// One side of an exchange proposal.
#[derive(Debug, Clone)]
pub struct AdRef {
    pub id: i64,
    pub title: String,
    pub owner_username: String,
}

#[derive(Debug, Clone)]
pub struct ProposalRow {
    pub id: i64,
    pub sender: AdRef,
    pub receiver: AdRef,
    pub comment: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, already clamped into `1..=num_pages`.
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}
