//! Record types for animation assets.

use crate::{OwnerId, RecordId, SyncStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// A synchronizable animation asset plus its sync metadata.
///
/// The `payload` is the animation document itself; the engine never looks
/// inside it. Conflict resolution is driven entirely by `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Caller-generated identifier, unique per owner across both stores.
    pub id: RecordId,
    /// Local identity that owns the record while offline.
    pub owner_id: OwnerId,
    /// Display label.
    pub name: String,
    /// Opaque animation document (JSON value).
    pub payload: serde_json::Value,
    /// When the record was first created (milliseconds since epoch).
    pub created_at: Timestamp,
    /// When the record was last updated; authority for conflict resolution.
    /// Monotonically non-decreasing per record.
    pub updated_at: Timestamp,
    /// Lifecycle status relative to the remote authority.
    pub status: SyncStatus,
    /// When the last successful reconciliation touched this record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<Timestamp>,
}

/// A partial edit to a record. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl RecordPatch {
    /// Patch that renames the record.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            payload: None,
        }
    }

    /// Patch that replaces the animation document.
    pub fn replace_payload(payload: serde_json::Value) -> Self {
        Self {
            name: None,
            payload: Some(payload),
        }
    }
}

impl Record {
    /// Create a new locally-authored record with status `Created`.
    pub fn new(
        id: impl Into<RecordId>,
        owner_id: impl Into<OwnerId>,
        name: impl Into<String>,
        payload: serde_json::Value,
        now: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            payload,
            created_at: now,
            updated_at: now,
            status: SyncStatus::Created,
            last_synced_at: None,
        }
    }

    /// Whether this record still has work outstanding against the remote.
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Whether this record is a deletion tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.status == SyncStatus::Deleted
    }

    /// Apply a user edit, bumping `updated_at` and the status transition.
    ///
    /// `updated_at` never moves backwards even if the caller's clock does.
    pub fn apply_edit(&mut self, patch: RecordPatch, now: Timestamp) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(payload) = patch.payload {
            self.payload = payload;
        }
        self.updated_at = now.max(self.updated_at);
        self.status = self.status.on_edit();
    }

    /// Turn this record into a deletion tombstone.
    pub fn mark_deleted(&mut self, now: Timestamp) {
        self.status = SyncStatus::Deleted;
        self.updated_at = now.max(self.updated_at);
    }

    /// Mark this record as reconciled with the remote as of `now`.
    pub fn mark_synced(&mut self, now: Timestamp) {
        self.status = SyncStatus::Synced;
        self.last_synced_at = Some(now);
    }
}
