//! Remote gateway contract and the in-memory reference authority.
//!
//! A gateway is one opaque round trip: the full non-`Synced` local set goes
//! out, the authoritative post-merge remote set comes back. Transport and
//! authentication are the caller's concern; the engine only sees the trait.

use crate::{
    error::Result, reconcile::merge_batch, OwnerId, Record, RecordId, SyncStatus, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A record as the remote authority stores and returns it.
///
/// The remote never tracks local lifecycle status; fetched records are
/// re-tagged `Synced` and re-owned when they land in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: RecordId,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RemoteRecord {
    /// Project a local record onto its wire shape.
    pub fn from_local(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            payload: record.payload.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Materialize as a local `Synced` record owned by `owner_id`.
    pub fn to_local(&self, owner_id: &str, now: Timestamp) -> Record {
        Record {
            id: self.id.clone(),
            owner_id: owner_id.to_string(),
            name: self.name.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            status: SyncStatus::Synced,
            last_synced_at: Some(now),
        }
    }
}

/// One round trip to the remote authority.
pub trait RemoteGateway {
    /// Push the given local records and return the full authoritative
    /// record set for the owner afterwards.
    ///
    /// Implementations map transport failures to [`Error::Transport`];
    /// a failed call must leave the remote side unchanged or retryable.
    ///
    /// [`Error::Transport`]: crate::Error::Transport
    fn sync_batch(&mut self, remote_owner_id: &str, records: &[Record])
        -> Result<Vec<RemoteRecord>>;
}

/// In-process authority used by tests and benchmarks.
///
/// It applies the same shared merge as the HTTP server, which makes it the
/// reference implementation of the authority side of a sync pass.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    owners: HashMap<OwnerId, HashMap<RecordId, RemoteRecord>>,
}

impl MemoryGateway {
    /// Create an empty authority.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly into the authority's store.
    pub fn seed(&mut self, remote_owner_id: impl Into<OwnerId>, record: RemoteRecord) {
        self.owners
            .entry(remote_owner_id.into())
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// The authority's current record set for an owner, ordered by id.
    pub fn records_for(&self, remote_owner_id: &str) -> Vec<RemoteRecord> {
        let mut records: Vec<RemoteRecord> = self
            .owners
            .get(remote_owner_id)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

impl RemoteGateway for MemoryGateway {
    fn sync_batch(
        &mut self,
        remote_owner_id: &str,
        records: &[Record],
    ) -> Result<Vec<RemoteRecord>> {
        let existing = self.records_for(remote_owner_id);
        let outcome = merge_batch(&existing, records);

        let collection = self.owners.entry(remote_owner_id.to_string()).or_default();
        // Upserts first, deletions after, same as the server.
        for upsert in outcome.upserts {
            collection.insert(upsert.id.clone(), upsert);
        }
        for id in &outcome.deleted {
            collection.remove(id);
        }

        Ok(self.records_for(remote_owner_id))
    }
}
