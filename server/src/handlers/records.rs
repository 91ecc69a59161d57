//! Record handlers - authoritative listing and lookup for an owner.

use crate::db;
use crate::error::{AppError, Result};
use reel_engine::RemoteRecord;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Query parameters for record listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Optional case-insensitive name-substring filter.
    pub q: Option<String>,
}

/// Response for record listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub records: Vec<RemoteRecord>,
}

/// List an owner's records, optionally filtered by name substring.
pub async fn handle_list_records(
    pool: &PgPool,
    owner_id: &str,
    query: ListQuery,
) -> Result<ListResponse> {
    let mut conn = pool.acquire().await?;
    let mut records: Vec<RemoteRecord> = db::fetch_owner_records(&mut *conn, owner_id)
        .await?
        .iter()
        .map(db::StoredRecord::to_remote)
        .collect();

    if let Some(q) = query.q.filter(|q| !q.trim().is_empty()) {
        let needle = q.trim().to_lowercase();
        records.retain(|r| r.name.to_lowercase().contains(&needle));
    }

    Ok(ListResponse { records })
}

/// Fetch one of an owner's records by id.
pub async fn handle_get_record(
    pool: &PgPool,
    owner_id: &str,
    record_id: &str,
) -> Result<RemoteRecord> {
    let mut conn = pool.acquire().await?;
    let stored = db::fetch_owner_record(&mut *conn, owner_id, record_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No record with id {record_id}")))?;

    Ok(stored.to_remote())
}
