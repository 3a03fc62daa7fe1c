//! Row-to-struct mapping helpers shared by the query layer.

use rusqlite::types::Type;
use rusqlite::{Connection, Row, ToSql};

use crate::error::Result;
use crate::models::{FeedbackRequest, License, Metadata};

pub(super) const LICENSE_COLS: &str = "id, key, type, email, domain, status, purchased_at, \
     expires_at, usage_count, last_used, source, metadata, created_at, updated_at";

pub(super) const FEEDBACK_COLS: &str =
    "id, name, email, tel, tg, message, status, created_at, updated_at";

pub(super) trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Parse a TEXT column into a strum-backed enum, reporting the column index
/// on failure instead of panicking.
fn parse_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = strum::ParseError>,
{
    row.get::<_, String>(idx)?
        .parse()
        .map_err(|e: strum::ParseError| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
}

impl FromRow for License {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let metadata: Metadata = row
            .get::<_, String>(11)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Ok(License {
            id: row.get(0)?,
            key: row.get(1)?,
            license_type: parse_enum(row, 2)?,
            email: row.get(3)?,
            domain: row.get(4)?,
            status: parse_enum(row, 5)?,
            purchased_at: row.get(6)?,
            expires_at: row.get(7)?,
            usage_count: row.get(8)?,
            last_used: row.get(9)?,
            source: parse_enum(row, 10)?,
            metadata,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl FromRow for FeedbackRequest {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(FeedbackRequest {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            tel: row.get(3)?,
            tg: row.get(4)?,
            message: row.get(5)?,
            status: parse_enum(row, 6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

pub(super) fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, T::from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub(super) fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
