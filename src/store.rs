//! SQLite access to the vCon store
//!
//! Read-only from this crate's perspective: the tools only ever query.
//! The schema bootstrap exists so the binary can start against an empty
//! database file; ingest happens elsewhere in the pipeline.
//!
//! `created_at` is stored as microseconds since the Unix epoch so that
//! date-range bounds widened to `23:59:59.999999` compare exactly.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

/// A full vCon record as returned by UUID lookup.
#[derive(Debug, Clone, Serialize)]
pub struct VconRecord {
    pub uuid: String,
    pub created_at: DateTime<Utc>,
    pub subject: Option<String>,
    /// The vCon document itself, as stored.
    pub document: serde_json::Value,
}

/// Borrowed handle over the shared pool. Tools construct this per call
/// and must not close or reconfigure the underlying pool.
pub struct VconStore<'a> {
    pub db: &'a SqlitePool,
}

impl<'a> VconStore<'a> {
    pub fn new(db: &'a SqlitePool) -> Self {
        Self { db }
    }

    /// UUIDs of vCons that list the given identity as a participant.
    /// Exact match, OR across tel / mailto / name.
    pub async fn find_by_party(&self, party: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT vcon_uuid FROM parties
            WHERE tel = $1 OR mailto = $1 OR name = $1
            "#,
        )
        .bind(party)
        .fetch_all(self.db)
        .await?;

        Ok(rows.into_iter().map(|r| r.get("vcon_uuid")).collect())
    }

    /// UUIDs of vCons created within [start, end], ordered by creation
    /// time, paged by limit/offset.
    pub async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
        offset: i64,
        newest_first: bool,
    ) -> Result<Vec<String>> {
        let sql = if newest_first {
            r#"
            SELECT uuid FROM vcons
            WHERE created_at BETWEEN $1 AND $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        } else {
            r#"
            SELECT uuid FROM vcons
            WHERE created_at BETWEEN $1 AND $2
            ORDER BY created_at ASC
            LIMIT $3 OFFSET $4
            "#
        };

        let rows = sqlx::query(sql)
            .bind(start.timestamp_micros())
            .bind(end.timestamp_micros())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db)
            .await?;

        Ok(rows.into_iter().map(|r| r.get("uuid")).collect())
    }

    /// Fetch one full record by exact UUID.
    pub async fn fetch_by_uuid(&self, uuid: &str) -> Result<Option<VconRecord>> {
        let row = sqlx::query(
            r#"
            SELECT uuid, created_at, subject, document FROM vcons
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .fetch_optional(self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let uuid: String = row.get("uuid");
        let micros: i64 = row.get("created_at");
        let subject: Option<String> = row.get("subject");
        let document_json: String = row.get("document");

        let created_at = DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now);
        let document = serde_json::from_str(&document_json).unwrap_or_else(|e| {
            debug!("vCon {} has unparsable document body: {}", uuid, e);
            serde_json::Value::String(document_json)
        });

        Ok(Some(VconRecord {
            uuid,
            created_at,
            subject,
            document,
        }))
    }
}

/// Create the vCon tables if they do not exist yet.
pub async fn ensure_schema(db: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vcons (
            uuid       TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            subject    TEXT,
            document   TEXT NOT NULL
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parties (
            vcon_uuid TEXT NOT NULL REFERENCES vcons(uuid),
            tel       TEXT,
            mailto    TEXT,
            name      TEXT
        )
        "#,
    )
    .execute(db)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_parties_vcon ON parties(vcon_uuid)")
        .execute(db)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vcons_created ON vcons(created_at)")
        .execute(db)
        .await?;

    Ok(())
}
