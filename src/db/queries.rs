use chrono::Utc;
use rusqlite::{Connection, ErrorCode, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{FEEDBACK_COLS, LICENSE_COLS, query_all, query_one};

pub fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, rusqlite::types::Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set_opt<V: Into<rusqlite::types::Value>>(
        mut self,
        column: &'static str,
        value: Option<V>,
    ) -> Self {
        if let Some(v) = value {
            self.fields.push((column, v.into()));
        }
        self
    }

    fn execute(mut self, conn: &Connection) -> rusqlite::Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<rusqlite::types::Value> =
            self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Licenses ============

/// Insert a license. Domain uniqueness is enforced by the UNIQUE constraint;
/// a constraint violation surfaces as Conflict rather than an internal error,
/// which closes the check-then-insert race two concurrent creates would hit.
pub fn create_license(conn: &Connection, input: &NewLicense) -> Result<License> {
    let id = gen_id();
    let now = now();
    let metadata_json = serde_json::to_string(&input.metadata)?;

    let result = conn.execute(
        "INSERT INTO licenses (id, key, type, email, domain, status, purchased_at, expires_at,
                               usage_count, last_used, source, metadata, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, NULL, ?9, ?10, ?11, ?12)",
        params![
            &id,
            &input.key,
            input.license_type.as_ref(),
            &input.email,
            &input.domain,
            LicenseStatus::Active.as_ref(),
            now,
            input.expires_at,
            input.source.as_ref(),
            &metadata_json,
            now,
            now
        ],
    );

    if let Err(err) = result {
        return Err(map_license_constraint_error(err));
    }

    Ok(License {
        id,
        key: input.key.clone(),
        license_type: input.license_type,
        email: input.email.clone(),
        domain: input.domain.clone(),
        status: LicenseStatus::Active,
        purchased_at: now,
        expires_at: input.expires_at,
        usage_count: 0,
        last_used: None,
        source: input.source,
        metadata: input.metadata.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Classify UNIQUE violations on license writes. Both the insert and the
/// domain-changing update funnel through this, so a domain already bound
/// elsewhere is a Conflict on either path.
fn map_license_constraint_error(err: rusqlite::Error) -> AppError {
    if let rusqlite::Error::SqliteFailure(e, Some(ref msg)) = err
        && e.code == ErrorCode::ConstraintViolation
    {
        if msg.contains("licenses.domain") {
            return AppError::Conflict("License already exists for this domain".into());
        }
        if msg.contains("licenses.key") {
            return AppError::Conflict("License key already exists".into());
        }
    }
    err.into()
}

pub fn get_license_by_key(conn: &Connection, key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE key = ?1", LICENSE_COLS),
        &[&key],
    )
}

/// List licenses, newest first. `search` matches key, email or domain as a
/// case-insensitive substring.
pub fn list_licenses(
    conn: &Connection,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> Result<Vec<License>> {
    match search {
        Some(term) => {
            let pattern = format!("%{}%", term.to_lowercase());
            query_all(
                conn,
                &format!(
                    "SELECT {} FROM licenses
                     WHERE LOWER(key) LIKE ?1 OR LOWER(email) LIKE ?1 OR LOWER(domain) LIKE ?1
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                    LICENSE_COLS
                ),
                params![&pattern, limit, offset],
            )
        }
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM licenses ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                LICENSE_COLS
            ),
            params![limit, offset],
        ),
    }
}

pub fn license_stats(conn: &Connection) -> Result<LicenseStats> {
    conn.query_row(
        "SELECT
            COUNT(*),
            COUNT(CASE WHEN status = 'active' THEN 1 END),
            COUNT(CASE WHEN last_used IS NOT NULL THEN 1 END),
            COUNT(CASE WHEN type = 'FREE' THEN 1 END),
            COUNT(CASE WHEN type = 'PRO' THEN 1 END),
            COUNT(CASE WHEN status = 'inactive' THEN 1 END),
            COUNT(CASE WHEN status = 'suspended' THEN 1 END),
            COUNT(CASE WHEN status = 'expired' THEN 1 END)
         FROM licenses",
        [],
        |row| {
            Ok(LicenseStats {
                total: row.get(0)?,
                active: row.get(1)?,
                used: row.get(2)?,
                by_type: LicenseTypeCounts {
                    free: row.get(3)?,
                    pro: row.get(4)?,
                },
                by_status: LicenseStatusCounts {
                    active: row.get(1)?,
                    inactive: row.get(5)?,
                    suspended: row.get(6)?,
                    expired: row.get(7)?,
                },
            })
        },
    )
    .map_err(Into::into)
}

pub fn update_license_status(conn: &Connection, id: &str, status: LicenseStatus) -> Result<()> {
    conn.execute(
        "UPDATE licenses SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_ref(), now(), id],
    )?;
    Ok(())
}

/// Partial update of mutable license fields. Only supplied fields change.
pub fn update_license_fields(
    conn: &Connection,
    id: &str,
    email: Option<&str>,
    domain: Option<&str>,
) -> Result<bool> {
    UpdateBuilder::new("licenses", id)
        .with_updated_at()
        .set_opt("email", email.map(String::from))
        .set_opt("domain", domain.map(String::from))
        .execute(conn)
        .map_err(map_license_constraint_error)
}

pub fn delete_license(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM licenses WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Record a successful verification: one atomic in-place increment, safe
/// under concurrent verifications of the same license.
pub fn record_usage(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "UPDATE licenses
         SET usage_count = usage_count + 1, last_used = ?1, updated_at = ?1
         WHERE id = ?2",
        params![now(), id],
    )?;
    Ok(())
}

// ============ Feedback ============

pub fn create_feedback(conn: &Connection, input: &CreateFeedbackBody) -> Result<FeedbackRequest> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO feedback_requests (id, name, email, tel, tg, message, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            &id,
            &input.name,
            &input.email,
            &input.tel,
            &input.tg,
            &input.message,
            FeedbackStatus::Active.as_ref(),
            now,
            now
        ],
    )?;

    Ok(FeedbackRequest {
        id,
        name: input.name.clone(),
        email: input.email.clone(),
        tel: input.tel.clone(),
        tg: input.tg.clone(),
        message: input.message.clone(),
        status: FeedbackStatus::Active,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_feedback_by_id(conn: &Connection, id: &str) -> Result<Option<FeedbackRequest>> {
    query_one(
        conn,
        &format!("SELECT {} FROM feedback_requests WHERE id = ?1", FEEDBACK_COLS),
        &[&id],
    )
}

pub fn list_feedback(
    conn: &Connection,
    limit: i64,
    offset: i64,
    status: Option<FeedbackStatus>,
) -> Result<Vec<FeedbackRequest>> {
    match status {
        Some(status) => query_all(
            conn,
            &format!(
                "SELECT {} FROM feedback_requests WHERE status = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                FEEDBACK_COLS
            ),
            params![status.as_ref(), limit, offset],
        ),
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM feedback_requests ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                FEEDBACK_COLS
            ),
            params![limit, offset],
        ),
    }
}

pub fn update_feedback_status(
    conn: &Connection,
    id: &str,
    status: FeedbackStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE feedback_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_ref(), now(), id],
    )?;
    Ok(affected > 0)
}

pub fn feedback_stats(conn: &Connection) -> Result<FeedbackStats> {
    conn.query_row(
        "SELECT
            COUNT(*),
            COUNT(CASE WHEN status = 'active' THEN 1 END),
            COUNT(CASE WHEN status = 'in_progress' THEN 1 END),
            COUNT(CASE WHEN status = 'closed' THEN 1 END)
         FROM feedback_requests",
        [],
        |row| {
            Ok(FeedbackStats {
                total: row.get(0)?,
                active: row.get(1)?,
                in_progress: row.get(2)?,
                closed: row.get(3)?,
            })
        },
    )
    .map_err(Into::into)
}
