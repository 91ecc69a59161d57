//! Sync handler - the authority side of a reconciliation pass.
//!
//! The client ships its full non-SYNCED record set in one request. The
//! merge policy applied here is `reel_engine::merge_batch`, the same
//! function the client-side reconciler trusts the authority to mirror:
//! strictly-newer local edits win, ties keep the stored copy, tombstones
//! delete. Upserts are applied before deletions, and the whole application
//! plus the authoritative re-read happen in one transaction.

use crate::db;
use crate::error::Result;
use chrono::Utc;
use reel_engine::{merge_batch, Record, RemoteRecord};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Request body for sync.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// The client's non-SYNCED records, tombstones included.
    pub records: Vec<Record>,
}

/// Response for sync.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// The full authoritative record set for the owner after the merge.
    pub records: Vec<RemoteRecord>,
    /// Server wall clock (milliseconds since epoch), for client telemetry.
    pub server_time: i64,
}

/// Process a sync request for an authenticated owner.
pub async fn handle_sync(
    pool: &PgPool,
    owner_id: &str,
    request: SyncRequest,
) -> Result<SyncResponse> {
    let mut tx = pool.begin().await?;

    let existing: Vec<RemoteRecord> = db::fetch_owner_records(&mut *tx, owner_id)
        .await?
        .iter()
        .map(db::StoredRecord::to_remote)
        .collect();

    let outcome = merge_batch(&existing, &request.records);

    tracing::debug!(
        owner_id,
        incoming = request.records.len(),
        upserts = outcome.upserts.len(),
        deletes = outcome.deleted.len(),
        "applying sync batch"
    );

    db::upsert_records(&mut *tx, owner_id, &outcome.upserts).await?;
    db::delete_records(&mut *tx, owner_id, &outcome.deleted).await?;

    let merged: Vec<RemoteRecord> = db::fetch_owner_records(&mut *tx, owner_id)
        .await?
        .iter()
        .map(db::StoredRecord::to_remote)
        .collect();

    tx.commit().await?;

    Ok(SyncResponse {
        records: merged,
        server_time: Utc::now().timestamp_millis(),
    })
}
