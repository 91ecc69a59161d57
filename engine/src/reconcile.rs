//! Reconciliation: the push-then-pull-then-merge sync pass.
//!
//! The authority-side merge policy is defined once here ([`merge_batch`])
//! and shared by every authority implementation - the in-memory gateway and
//! the HTTP server apply the identical function, so both sides of the wire
//! resolve conflicts the same way.
//!
//! # Pass structure
//!
//! 1. Snapshot the owner's local records; everything non-`Synced` forms the
//!    outgoing batch (tombstones included).
//! 2. One gateway round trip: the authority partitions the batch into
//!    upserts and deletions, applies upserts then deletions, and returns its
//!    full post-merge record set.
//! 3. The fetched set is committed into the local store as a single staged
//!    swap (mark-stale, overwrite/insert, drop leftovers).
//!
//! Any failure before step 3 leaves the local store byte-for-byte unchanged,
//! and re-running a pass with identical inputs produces identical state.

use crate::{
    error::Result, Error, LocalIdentity, OwnerId, Record, RecordId, RecordStore, RemoteGateway,
    RemoteRecord, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// What the authority decided to do with one incoming batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Locally-authoritative records to overwrite or create remotely.
    pub upserts: Vec<RemoteRecord>,
    /// Ids whose remote records are to be removed.
    pub deleted: Vec<RecordId>,
}

/// The authority-side merge policy.
///
/// Partition `incoming` against the authority's `existing` set:
/// - records whose status is neither `Synced` nor `Deleted` are upsert
///   candidates; a candidate wins iff it has no remote counterpart or its
///   `updated_at` is strictly later. Ties favor the remote copy, which
///   keeps retries with identical inputs idempotent.
/// - `Deleted` records contribute their ids to the delete set.
///
/// An id can never appear in both sets: tombstones are excluded from the
/// candidate pool by construction.
pub fn merge_batch(existing: &[RemoteRecord], incoming: &[Record]) -> MergeOutcome {
    let by_id: HashMap<&str, &RemoteRecord> =
        existing.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut upserts = Vec::new();
    let mut deleted = Vec::new();

    for record in incoming {
        if record.is_tombstone() {
            deleted.push(record.id.clone());
            continue;
        }
        if !record.status.is_upsert_candidate() {
            continue;
        }
        let local_wins = match by_id.get(record.id.as_str()) {
            None => true,
            Some(remote) => record.updated_at > remote.updated_at,
        };
        if local_wins {
            upserts.push(RemoteRecord::from_local(record));
        }
    }

    debug_assert!(
        upserts.iter().all(|u| !deleted.contains(&u.id)),
        "an id may not be both upserted and deleted in one pass"
    );

    MergeOutcome { upserts, deleted }
}

/// Summary of one completed sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records sent to the authority (the non-`Synced` set).
    pub pushed: usize,
    /// Records in the authoritative set that came back.
    pub fetched: usize,
    /// Fetched records that did not exist locally.
    pub inserted: usize,
    /// Fetched records that overwrote a local copy.
    pub overwritten: usize,
    /// Local records dropped because the remote no longer has them.
    pub removed: usize,
}

/// Drives sync passes and serializes them per owner.
///
/// A second trigger for an owner whose pass is still in flight is rejected
/// with [`Error::SyncInFlight`] rather than queued or interleaved, so the
/// transient mid-merge state can never be observed by another pass.
#[derive(Debug, Default)]
pub struct Reconciler {
    in_flight: Mutex<HashSet<OwnerId>>,
}

impl Reconciler {
    /// Create a reconciler with no passes in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one full sync pass for the identity's records.
    ///
    /// Requires a bound remote identity. On success every surviving local
    /// record is `Synced`; on any gateway failure the local store is
    /// untouched and the pass may simply be retried.
    pub fn sync<G>(
        &self,
        store: &mut RecordStore,
        identity: &LocalIdentity,
        gateway: &mut G,
        now: Timestamp,
    ) -> Result<SyncReport>
    where
        G: RemoteGateway + ?Sized,
    {
        let remote_owner_id = identity
            .remote_id
            .clone()
            .ok_or(Error::IdentityMissing)?;
        let _guard = self.begin(&identity.id)?;

        // Snapshot at entry: edits made while the gateway call is in flight
        // belong to the next pass.
        let outgoing: Vec<Record> = store
            .query(&identity.id)
            .include_tombstones()
            .all()
            .into_iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();

        let fetched = gateway.sync_batch(&remote_owner_id, &outgoing)?;
        let (inserted, overwritten, removed) = store.apply_remote_set(&identity.id, &fetched, now);

        Ok(SyncReport {
            pushed: outgoing.len(),
            fetched: fetched.len(),
            inserted,
            overwritten,
            removed,
        })
    }

    fn begin(&self, owner_id: &OwnerId) -> Result<FlightGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(owner_id.clone()) {
            return Err(Error::SyncInFlight(owner_id.clone()));
        }
        Ok(FlightGuard {
            owners: &self.in_flight,
            owner_id: owner_id.clone(),
        })
    }
}

/// Releases the per-owner slot when a pass ends, success or failure.
struct FlightGuard<'a> {
    owners: &'a Mutex<HashSet<OwnerId>>,
    owner_id: OwnerId,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryGateway, SyncStatus};
    use serde_json::json;

    fn local(id: &str, status: SyncStatus, updated_at: Timestamp) -> Record {
        let mut record = Record::new(id, "owner-1", format!("Asset {id}"), json!({}), 1000);
        record.status = status;
        record.updated_at = updated_at;
        record
    }

    fn remote(id: &str, updated_at: Timestamp) -> RemoteRecord {
        RemoteRecord {
            id: id.into(),
            name: format!("Remote {id}"),
            payload: json!({}),
            created_at: 500,
            updated_at,
        }
    }

    fn bound_identity() -> LocalIdentity {
        let mut identity = LocalIdentity::new("owner-1", 0);
        identity.remote_id = Some("remote-1".into());
        identity
    }

    #[test]
    fn merge_new_record_is_upserted() {
        let outcome = merge_batch(&[], &[local("anim-1", SyncStatus::Created, 2000)]);

        assert_eq!(outcome.upserts.len(), 1);
        assert!(outcome.deleted.is_empty());
    }

    #[test]
    fn merge_strictly_newer_local_wins() {
        let outcome = merge_batch(
            &[remote("anim-1", 1000)],
            &[local("anim-1", SyncStatus::Updated, 2000)],
        );

        assert_eq!(outcome.upserts.len(), 1);
        assert_eq!(outcome.upserts[0].updated_at, 2000);
    }

    #[test]
    fn merge_tie_favors_remote() {
        let outcome = merge_batch(
            &[remote("anim-1", 2000)],
            &[local("anim-1", SyncStatus::Updated, 2000)],
        );

        assert!(outcome.upserts.is_empty());
    }

    #[test]
    fn merge_older_local_is_dropped() {
        let outcome = merge_batch(
            &[remote("anim-1", 3000)],
            &[local("anim-1", SyncStatus::Updated, 2000)],
        );

        assert!(outcome.upserts.is_empty());
    }

    #[test]
    fn merge_synced_records_send_nothing() {
        let outcome = merge_batch(&[], &[local("anim-1", SyncStatus::Synced, 9000)]);

        assert!(outcome.upserts.is_empty());
        assert!(outcome.deleted.is_empty());
    }

    #[test]
    fn merge_tombstones_go_to_the_delete_set() {
        let outcome = merge_batch(
            &[remote("anim-1", 1000)],
            &[local("anim-1", SyncStatus::Deleted, 2000)],
        );

        assert!(outcome.upserts.is_empty());
        assert_eq!(outcome.deleted, vec!["anim-1".to_string()]);
    }

    #[test]
    fn merge_modified_records_still_push() {
        // A stranded mid-merge marker behaves like an unpushed edit.
        let outcome = merge_batch(&[], &[local("anim-1", SyncStatus::Modified, 2000)]);

        assert_eq!(outcome.upserts.len(), 1);
    }

    #[test]
    fn sync_without_remote_identity_fails() {
        let reconciler = Reconciler::new();
        let mut store = RecordStore::new();
        let mut gateway = MemoryGateway::new();
        let identity = LocalIdentity::new("owner-1", 0);

        let result = reconciler.sync(&mut store, &identity, &mut gateway, 1000);
        assert!(matches!(result, Err(Error::IdentityMissing)));
    }

    #[test]
    fn sync_pushes_and_retags() {
        let reconciler = Reconciler::new();
        let mut store = RecordStore::new();
        store
            .create("owner-1", "anim-1", "Bounce", json!({"fr": 30}), 2000)
            .unwrap();
        let mut gateway = MemoryGateway::new();

        let report = reconciler
            .sync(&mut store, &bound_identity(), &mut gateway, 3000)
            .unwrap();

        assert_eq!(report.pushed, 1);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.overwritten, 1);
        assert_eq!(
            store.get("owner-1", "anim-1").unwrap().status,
            SyncStatus::Synced
        );
        assert_eq!(gateway.records_for("remote-1").len(), 1);
    }

    #[test]
    fn failed_pass_releases_the_owner_slot() {
        struct BrokenGateway;
        impl RemoteGateway for BrokenGateway {
            fn sync_batch(&mut self, _: &str, _: &[Record]) -> Result<Vec<RemoteRecord>> {
                Err(Error::Transport("boom".into()))
            }
        }

        let reconciler = Reconciler::new();
        let mut store = RecordStore::new();
        let identity = bound_identity();

        let result = reconciler.sync(&mut store, &identity, &mut BrokenGateway, 1000);
        assert!(matches!(result, Err(Error::Transport(_))));

        // The guard was dropped; a retry is allowed.
        let mut gateway = MemoryGateway::new();
        assert!(reconciler
            .sync(&mut store, &identity, &mut gateway, 2000)
            .is_ok());
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_local_wins_iff_strictly_newer(
                local_ts in 1000u64..5000,
                remote_ts in 1000u64..5000,
            ) {
                let outcome = merge_batch(
                    &[remote("anim-1", remote_ts)],
                    &[local("anim-1", SyncStatus::Updated, local_ts)],
                );

                if local_ts > remote_ts {
                    prop_assert_eq!(outcome.upserts.len(), 1);
                } else {
                    prop_assert!(outcome.upserts.is_empty());
                }
            }

            #[test]
            fn prop_merge_deterministic(
                local_ts in 1000u64..5000,
                remote_ts in 1000u64..5000,
            ) {
                let existing = vec![remote("anim-1", remote_ts)];
                let incoming = vec![local("anim-1", SyncStatus::Updated, local_ts)];

                let first = merge_batch(&existing, &incoming);
                let second = merge_batch(&existing, &incoming);

                prop_assert_eq!(first, second);
            }

            #[test]
            fn prop_no_id_in_both_sets(
                tombstone_count in 0usize..5,
                create_count in 0usize..5,
            ) {
                let mut incoming = Vec::new();
                for i in 0..tombstone_count {
                    incoming.push(local(&format!("dead-{i}"), SyncStatus::Deleted, 2000));
                }
                for i in 0..create_count {
                    incoming.push(local(&format!("new-{i}"), SyncStatus::Created, 2000));
                }

                let outcome = merge_batch(&[], &incoming);

                prop_assert_eq!(outcome.deleted.len(), tombstone_count);
                prop_assert_eq!(outcome.upserts.len(), create_count);
                for upsert in &outcome.upserts {
                    prop_assert!(!outcome.deleted.contains(&upsert.id));
                }
            }

            #[test]
            fn prop_repeated_pass_is_idempotent(
                seed_ts in 1000u64..5000,
            ) {
                let reconciler = Reconciler::new();
                let mut store = RecordStore::new();
                store
                    .create("owner-1", "anim-1", "Bounce", json!({}), seed_ts)
                    .unwrap();
                let mut gateway = MemoryGateway::new();
                let identity = bound_identity();

                reconciler
                    .sync(&mut store, &identity, &mut gateway, seed_ts + 1)
                    .unwrap();
                let first_local = store.clone();
                let first_remote = gateway.records_for("remote-1");

                let report = reconciler
                    .sync(&mut store, &identity, &mut gateway, seed_ts + 1)
                    .unwrap();

                prop_assert_eq!(report.pushed, 0);
                prop_assert_eq!(store.list("owner-1"), first_local.list("owner-1"));
                prop_assert_eq!(gateway.records_for("remote-1"), first_remote);
            }
        }
    }
}
