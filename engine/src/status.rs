//! Sync status lifecycle for records.
//!
//! Every record carries a status tag describing what the reconciler still
//! owes the remote authority for it. Transitions are total functions on a
//! closed enum, so an invalid transition cannot be written down.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a record relative to the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Local and remote are known identical as of `last_synced_at`.
    Synced,
    /// Exists only locally; never pushed.
    Created,
    /// Exists remotely but carries local edits not yet pushed.
    Updated,
    /// Local tombstone; the remote deletion is still pending.
    Deleted,
    /// Transient "presumed stale" marker set while a merge is in flight.
    Modified,
}

/// What a delete request does to a record, depending on its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    /// The remote never saw this record; remove it physically right away.
    RemoveNow,
    /// Keep a tombstone until reconciliation confirms the remote deletion.
    Tombstone,
}

impl SyncStatus {
    /// Whether this record still has work outstanding against the remote.
    pub fn is_pending(self) -> bool {
        !matches!(self, SyncStatus::Synced)
    }

    /// Whether this record belongs in the upsert batch of a sync pass.
    ///
    /// Everything except `Synced` (nothing to send) and `Deleted` (goes in
    /// the delete set instead) qualifies. Keeping tombstones out of the
    /// upsert set is what guarantees an id never appears in both batches.
    pub fn is_upsert_candidate(self) -> bool {
        !matches!(self, SyncStatus::Synced | SyncStatus::Deleted)
    }

    /// Status after a user edit.
    ///
    /// A `Synced` record becomes `Updated`; a record that already has
    /// unpushed work keeps its status (re-editing is idempotent).
    pub fn on_edit(self) -> SyncStatus {
        match self {
            SyncStatus::Synced => SyncStatus::Updated,
            other => other,
        }
    }

    /// What a user delete does to a record with this status.
    pub fn on_delete(self) -> DeleteAction {
        match self {
            SyncStatus::Created => DeleteAction::RemoveNow,
            SyncStatus::Synced
            | SyncStatus::Updated
            | SyncStatus::Deleted
            | SyncStatus::Modified => DeleteAction::Tombstone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synced_is_the_only_settled_status() {
        assert!(!SyncStatus::Synced.is_pending());
        assert!(SyncStatus::Created.is_pending());
        assert!(SyncStatus::Updated.is_pending());
        assert!(SyncStatus::Deleted.is_pending());
        assert!(SyncStatus::Modified.is_pending());
    }

    #[test]
    fn upsert_candidates_exclude_synced_and_tombstones() {
        assert!(SyncStatus::Created.is_upsert_candidate());
        assert!(SyncStatus::Updated.is_upsert_candidate());
        assert!(SyncStatus::Modified.is_upsert_candidate());
        assert!(!SyncStatus::Synced.is_upsert_candidate());
        assert!(!SyncStatus::Deleted.is_upsert_candidate());
    }

    #[test]
    fn edit_transitions() {
        assert_eq!(SyncStatus::Synced.on_edit(), SyncStatus::Updated);
        assert_eq!(SyncStatus::Created.on_edit(), SyncStatus::Created);
        assert_eq!(SyncStatus::Updated.on_edit(), SyncStatus::Updated);
    }

    #[test]
    fn delete_transitions() {
        assert_eq!(SyncStatus::Created.on_delete(), DeleteAction::RemoveNow);
        assert_eq!(SyncStatus::Synced.on_delete(), DeleteAction::Tombstone);
        assert_eq!(SyncStatus::Updated.on_delete(), DeleteAction::Tombstone);
    }

    #[test]
    fn wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&SyncStatus::Created).unwrap();
        assert_eq!(json, "\"CREATED\"");

        let parsed: SyncStatus = serde_json::from_str("\"SYNCED\"").unwrap();
        assert_eq!(parsed, SyncStatus::Synced);
    }
}
