//! Shared helpers for integration tests
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use vcon_chat::semantic::SemanticSearch;

/// In-memory store with the vCon schema applied. One connection so every
/// query sees the same database.
pub async fn memory_store() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    vcon_chat::store::ensure_schema(&pool).await.expect("schema");
    pool
}

/// A semantic client with no backends configured (is_available() == false)
pub async fn offline_semantic() -> SemanticSearch {
    SemanticSearch::new(
        None,
        None,
        "text-embedding-ada-002".into(),
        "vcons_collection".into(),
    )
    .await
}

/// Insert one vCon with its parties. `created_at` is RFC 3339.
pub async fn seed_vcon(
    pool: &SqlitePool,
    uuid: &str,
    created_at: &str,
    subject: Option<&str>,
    parties: &[Party<'_>],
) {
    let created: DateTime<Utc> = created_at
        .parse()
        .unwrap_or_else(|e| panic!("bad test timestamp {}: {}", created_at, e));

    let document = serde_json::json!({
        "uuid": uuid,
        "vcon": "0.0.1",
        "created_at": created_at,
        "subject": subject,
        "parties": parties
            .iter()
            .map(|p| serde_json::json!({"tel": p.tel, "mailto": p.mailto, "name": p.name}))
            .collect::<Vec<_>>(),
    });

    sqlx::query("INSERT INTO vcons (uuid, created_at, subject, document) VALUES ($1, $2, $3, $4)")
        .bind(uuid)
        .bind(created.timestamp_micros())
        .bind(subject)
        .bind(document.to_string())
        .execute(pool)
        .await
        .expect("insert vcon");

    for p in parties {
        sqlx::query("INSERT INTO parties (vcon_uuid, tel, mailto, name) VALUES ($1, $2, $3, $4)")
            .bind(uuid)
            .bind(p.tel)
            .bind(p.mailto)
            .bind(p.name)
            .execute(pool)
            .await
            .expect("insert party");
    }
}

#[derive(Default)]
pub struct Party<'a> {
    pub tel: Option<&'a str>,
    pub mailto: Option<&'a str>,
    pub name: Option<&'a str>,
}

impl<'a> Party<'a> {
    pub fn tel(tel: &'a str) -> Self {
        Self {
            tel: Some(tel),
            ..Default::default()
        }
    }

    pub fn mailto(mailto: &'a str) -> Self {
        Self {
            mailto: Some(mailto),
            ..Default::default()
        }
    }
}
