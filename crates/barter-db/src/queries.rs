use barter_types::api::{AdListQuery, ProposalListQuery, present};
use barter_types::models::ProposalStatus;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::models::{AdFields, AdRef, AdRow, Page, ProposalRow, UserRow};
use crate::{Database, Result, StoreError};

const AD_SELECT: &str = "SELECT a.id, a.owner_id, u.username, a.title, a.description, a.image_url,
        a.category, a.condition, a.created_at
     FROM ads a
     JOIN users u ON u.id = a.owner_id";

const PROPOSAL_SELECT: &str = "SELECT p.id,
        s.id, s.title, su.username,
        r.id, r.title, ru.username,
        p.comment, p.status, p.created_at
     FROM exchange_proposals p
     JOIN ads s ON s.id = p.ad_sender_id
     JOIN users su ON su.id = s.owner_id
     JOIN ads r ON r.id = p.ad_receiver_id
     JOIN users ru ON ru.id = r.owner_id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, email, password_hash, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, password FROM users WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            password: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }

    // -- Ads --

    pub fn insert_ad(&self, owner_id: &str, ad: &AdFields) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ads (owner_id, title, description, image_url, category, condition, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner_id,
                    ad.title,
                    ad.description,
                    ad.image_url,
                    ad.category,
                    ad.condition.as_str(),
                    Utc::now(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_ad(&self, id: i64) -> Result<Option<AdRow>> {
        self.with_conn(|conn| {
            let ad = conn
                .query_row(&format!("{AD_SELECT} WHERE a.id = ?1"), [id], ad_from_row)
                .optional()?;
            Ok(ad)
        })
    }

    /// Looks up an ad only if `owner_id` owns it, so strangers get the same answer as for a missing ad.
    pub fn get_owned_ad(&self, id: i64, owner_id: &str) -> Result<Option<AdRow>> {
        self.with_conn(|conn| {
            let ad = conn
                .query_row(
                    &format!("{AD_SELECT} WHERE a.id = ?1 AND a.owner_id = ?2"),
                    params![id, owner_id],
                    ad_from_row,
                )
                .optional()?;
            Ok(ad)
        })
    }

    /// Rewrites the editable columns. Ownership never changes. Returns false if
    /// the ad does not exist or belongs to someone else.
    pub fn update_ad(&self, id: i64, owner_id: &str, ad: &AdFields) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE ads
                 SET title = ?1, description = ?2, image_url = ?3, category = ?4, condition = ?5
                 WHERE id = ?6 AND owner_id = ?7",
                params![
                    ad.title,
                    ad.description,
                    ad.image_url,
                    ad.category,
                    ad.condition.as_str(),
                    id,
                    owner_id,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes an owned ad along with every proposal it sends or receives.
    pub fn delete_ad(&self, id: i64, owner_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM ads WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Every ad, oldest first. Used for the proposal form's choices.
    pub fn list_all_ads(&self) -> Result<Vec<AdRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{AD_SELECT} ORDER BY a.id"))?;
            let rows = stmt
                .query_map([], ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Search, filter and paginate ads, newest first.
    ///
    /// `q` matches title or description as a case-insensitive substring,
    /// `category` and `condition` must match exactly ignoring case. A page number
    /// outside `1..=num_pages` (past the end, zero or negative) yields the last page.
    pub fn list_ads(&self, query: &AdListQuery, per_page: u32) -> Result<Page<AdRow>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(q) = present(&query.q) {
            clauses.push(
                "(instr(casefold(a.title), casefold(?)) > 0 OR instr(casefold(a.description), casefold(?)) > 0)",
            );
            args.push(q.to_string());
            args.push(q.to_string());
        }
        if let Some(category) = present(&query.category) {
            clauses.push("casefold(a.category) = casefold(?)");
            args.push(category.to_string());
        }
        if let Some(condition) = present(&query.condition) {
            clauses.push("casefold(a.condition) = casefold(?)");
            args.push(condition.to_string());
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM ads a {where_sql}"),
                params_from_iter(args.iter()),
                |r| r.get(0),
            )?;
            let total = total.max(0) as u64;

            let per_page = per_page.max(1);
            let num_pages = (total.div_ceil(per_page as u64) as u32).max(1);
            let requested = query.page_number();
            let number = if (1..=i64::from(num_pages)).contains(&requested) {
                requested as u32
            } else {
                num_pages
            };
            let offset = (number - 1) as u64 * per_page as u64;

            let mut stmt = conn.prepare(&format!(
                "{AD_SELECT} {where_sql} ORDER BY a.created_at DESC, a.id DESC LIMIT {per_page} OFFSET {offset}"
            ))?;
            let items = stmt
                .query_map(params_from_iter(args.iter()), ad_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Page {
                items,
                number,
                num_pages,
                total,
            })
        })
    }

    // -- Exchange proposals --

    /// Inserts a pending proposal. The partial unique index rejects a second
    /// open proposal for the same pair even if the caller skipped the pre-check.
    pub fn insert_proposal(&self, sender_id: i64, receiver_id: i64, comment: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO exchange_proposals (ad_sender_id, ad_receiver_id, comment, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sender_id,
                    receiver_id,
                    comment,
                    ProposalStatus::Pending.as_str(),
                    Utc::now(),
                ],
            )
            .map_err(duplicate_or_sqlite)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// True when a pending or accepted proposal already links `sender_id` to `receiver_id`.
    pub fn has_open_proposal(&self, sender_id: i64, receiver_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM exchange_proposals
                    WHERE ad_sender_id = ?1 AND ad_receiver_id = ?2 AND status <> ?3
                 )",
                params![sender_id, receiver_id, ProposalStatus::Rejected.as_str()],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn get_proposal(&self, id: i64) -> Result<Option<ProposalRow>> {
        self.with_conn(|conn| {
            let proposal = conn
                .query_row(
                    &format!("{PROPOSAL_SELECT} WHERE p.id = ?1"),
                    [id],
                    proposal_from_row,
                )
                .optional()?;
            Ok(proposal)
        })
    }

    /// Returns false if the proposal does not exist. Reopening a rejected
    /// proposal whose pair already has a new open one fails with `DuplicateProposal`.
    pub fn update_proposal_status(&self, id: i64, status: ProposalStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE exchange_proposals SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )
                .map_err(duplicate_or_sqlite)?;
            Ok(changed > 0)
        })
    }

    /// Proposals where `user_id` owns the sending or the receiving ad, newest first,
    /// narrowed by the optional sender/receiver username and status filters.
    pub fn list_proposals_for_user(
        &self,
        user_id: &str,
        query: &ProposalListQuery,
    ) -> Result<Vec<ProposalRow>> {
        let mut sql = format!("{PROPOSAL_SELECT} WHERE (s.owner_id = ? OR r.owner_id = ?)");
        let mut args: Vec<String> = vec![user_id.to_string(), user_id.to_string()];

        if let Some(sender) = present(&query.sender) {
            sql.push_str(" AND su.username = ?");
            args.push(sender.to_string());
        }
        if let Some(receiver) = present(&query.receiver) {
            sql.push_str(" AND ru.username = ?");
            args.push(receiver.to_string());
        }
        if let Some(status) = present(&query.status) {
            sql.push_str(" AND p.status = ?");
            args.push(status.to_string());
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), proposal_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<AdRow> {
    Ok(AdRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_username: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        image_url: row.get(5)?,
        category: row.get(6)?,
        condition: parse_choice(row, 7)?,
        created_at: row.get(8)?,
    })
}

fn proposal_from_row(row: &Row<'_>) -> rusqlite::Result<ProposalRow> {
    Ok(ProposalRow {
        id: row.get(0)?,
        sender: AdRef {
            id: row.get(1)?,
            title: row.get(2)?,
            owner_username: row.get(3)?,
        },
        receiver: AdRef {
            id: row.get(4)?,
            title: row.get(5)?,
            owner_username: row.get(6)?,
        },
        comment: row.get(7)?,
        status: parse_choice(row, 8)?,
        created_at: row.get(9)?,
    })
}

fn parse_choice<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn duplicate_or_sqlite(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::DuplicateProposal
        }
        _ => StoreError::Sqlite(e),
    }
}
