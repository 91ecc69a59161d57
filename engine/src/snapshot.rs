//! Snapshot types for persisting and restoring engine state.
//!
//! Snapshots are the bridge between the in-memory store and whatever the
//! host application uses for durability. They serialize deterministically
//! (`BTreeMap` ordering) so identical state always produces identical bytes.

use crate::{
    error::Result, Error, IdentityBinder, LocalIdentity, OwnerId, Record, RecordId, RecordStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the identity and every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version.
    pub format_version: u32,
    /// The local identity, including any remote binding.
    pub identity: LocalIdentity,
    /// All records by owner, then by record id. Tombstones included - a
    /// pending deletion must survive a restart.
    pub records: BTreeMap<OwnerId, BTreeMap<RecordId, Record>>,
}

impl StoreSnapshot {
    /// Capture the current store state and identity.
    pub fn capture(store: &RecordStore, identity: &LocalIdentity) -> Self {
        let mut records: BTreeMap<OwnerId, BTreeMap<RecordId, Record>> = BTreeMap::new();
        for owner_id in store.owner_ids() {
            if let Some(collection) = store.collection(owner_id) {
                let owner_records = records.entry(owner_id.clone()).or_default();
                for record in collection.all_records() {
                    owner_records.insert(record.id.clone(), record.clone());
                }
            }
        }

        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            identity: identity.clone(),
            records,
        }
    }

    /// Rebuild a store and identity binder from this snapshot.
    ///
    /// The duplicate-name policy is construction-time configuration, not
    /// state, so the restored store uses the default (permissive) policy.
    pub fn restore(self) -> (RecordStore, IdentityBinder) {
        let mut store = RecordStore::new();
        for (_, owner_records) in self.records {
            for (_, record) in owner_records {
                store.put(record);
            }
        }

        let now = self.identity.updated_at;
        let id = self.identity.id.clone();
        let binder = IdentityBinder::initialize(vec![self.identity], id, now);
        (store, binder)
    }

    /// Total record count, tombstones included.
    pub fn record_count(&self) -> usize {
        self.records.values().map(|c| c.len()).sum()
    }

    /// Count of records with outstanding sync work.
    pub fn pending_count(&self) -> usize {
        self.records
            .values()
            .flat_map(|c| c.values())
            .filter(|r| r.is_pending())
            .count()
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON, rejecting formats newer than this build.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }

    /// Cheap summary without cloning the record data.
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: self.format_version,
            owner_id: self.identity.id.clone(),
            bound: self.identity.is_bound(),
            record_count: self.record_count(),
            pending_count: self.pending_count(),
        }
    }
}

/// Metadata about a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub owner_id: OwnerId,
    pub bound: bool,
    pub record_count: usize,
    pub pending_count: usize,
}
