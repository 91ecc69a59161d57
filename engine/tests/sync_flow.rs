//! End-to-end sync scenarios over the in-memory authority.
//!
//! These exercise full passes: offline edits, sign-in, push, conflict
//! resolution, tombstone completion, and failure/abort behavior.

use reel_engine::{
    Error, IdentityBinder, LocalIdentity, MemoryGateway, Reconciler, Record, RecordPatch,
    RecordStore, RemoteGateway, RemoteRecord, SyncStatus,
};
use serde_json::json;

fn bound_identity(owner: &str, remote: &str) -> LocalIdentity {
    let mut identity = LocalIdentity::new(owner, 0);
    identity.remote_id = Some(remote.into());
    identity
}

fn remote(id: &str, name: &str, updated_at: u64) -> RemoteRecord {
    RemoteRecord {
        id: id.into(),
        name: name.into(),
        payload: json!({"layers": []}),
        created_at: 500,
        updated_at,
    }
}

#[test]
fn created_record_reaches_remote_and_becomes_synced() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    store
        .create("owner-1", "anim-1", "Bounce", json!({"fr": 30}), 1000)
        .unwrap();

    let report = reconciler
        .sync(&mut store, &identity, &mut gateway, 2000)
        .unwrap();

    assert_eq!(report.pushed, 1);
    assert_eq!(gateway.records_for("remote-1").len(), 1);

    let local = store.get("owner-1", "anim-1").unwrap();
    assert_eq!(local.status, SyncStatus::Synced);
    assert!(local.last_synced_at.unwrap() >= 2000);
}

#[test]
fn newer_local_edit_wins_on_both_sides() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    // Remote has an older copy of anim-2.
    gateway.seed("remote-1", remote("anim-2", "B-remote", 2000));
    let mut local = Record::new("anim-2", "owner-1", "B-local", json!({}), 1000);
    local.status = SyncStatus::Updated;
    local.updated_at = 3000;
    store.put(local);

    reconciler
        .sync(&mut store, &identity, &mut gateway, 4000)
        .unwrap();

    assert_eq!(store.get("owner-1", "anim-2").unwrap().name, "B-local");
    assert_eq!(
        store.get("owner-1", "anim-2").unwrap().status,
        SyncStatus::Synced
    );
    assert_eq!(gateway.records_for("remote-1")[0].name, "B-local");
}

#[test]
fn older_or_tied_local_edit_is_overwritten_by_remote() {
    let reconciler = Reconciler::new();
    let identity = bound_identity("owner-1", "remote-1");

    for local_ts in [1500, 2000] {
        let mut store = RecordStore::new();
        let mut gateway = MemoryGateway::new();
        gateway.seed("remote-1", remote("anim-2", "B-remote", 2000));

        let mut local = Record::new("anim-2", "owner-1", "B-local", json!({}), 1000);
        local.status = SyncStatus::Updated;
        local.updated_at = local_ts;
        store.put(local);

        reconciler
            .sync(&mut store, &identity, &mut gateway, 4000)
            .unwrap();

        let merged = store.get("owner-1", "anim-2").unwrap();
        assert_eq!(merged.name, "B-remote", "local_ts={local_ts}");
        assert_eq!(merged.status, SyncStatus::Synced);
    }
}

#[test]
fn tombstone_completes_remote_deletion() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    gateway.seed("remote-1", remote("anim-3", "Doomed", 1000));
    let mut local = Record::new("anim-3", "owner-1", "Doomed", json!({}), 1000);
    local.mark_synced(1000);
    store.put(local);

    store.delete("owner-1", "anim-3", 2000).unwrap();
    reconciler
        .sync(&mut store, &identity, &mut gateway, 3000)
        .unwrap();

    assert!(store.get_including_deleted("owner-1", "anim-3").is_none());
    assert!(gateway.records_for("remote-1").is_empty());
}

#[test]
fn orphan_creation_is_removed_immediately_and_never_pushed() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    store
        .create("owner-1", "anim-4", "Never synced", json!({}), 1000)
        .unwrap();
    store.delete("owner-1", "anim-4", 1500).unwrap();

    // Physically gone before any sync.
    assert!(store.get_including_deleted("owner-1", "anim-4").is_none());

    let report = reconciler
        .sync(&mut store, &identity, &mut gateway, 2000)
        .unwrap();

    assert_eq!(report.pushed, 0);
    assert!(gateway.records_for("remote-1").is_empty());
}

#[test]
fn record_deleted_elsewhere_does_not_reappear() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    // Locally synced, but the remote no longer has it.
    let mut local = Record::new("anim-5", "owner-1", "Gone remotely", json!({}), 1000);
    local.mark_synced(1000);
    store.put(local);

    reconciler
        .sync(&mut store, &identity, &mut gateway, 2000)
        .unwrap();

    assert!(store.get_including_deleted("owner-1", "anim-5").is_none());
}

#[test]
fn repeated_sync_is_idempotent() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let identity = bound_identity("owner-1", "remote-1");

    store
        .create("owner-1", "anim-1", "Bounce", json!({"fr": 30}), 1000)
        .unwrap();
    store
        .create("owner-1", "anim-2", "Spinner", json!({"fr": 60}), 1100)
        .unwrap();

    reconciler
        .sync(&mut store, &identity, &mut gateway, 2000)
        .unwrap();
    let after_first: Vec<Record> = sorted(&store);
    let remote_first = gateway.records_for("remote-1");

    let report = reconciler
        .sync(&mut store, &identity, &mut gateway, 2000)
        .unwrap();

    assert_eq!(report.pushed, 0);
    assert_eq!(sorted(&store), after_first);
    assert_eq!(gateway.records_for("remote-1"), remote_first);
}

#[test]
fn sign_in_pulls_down_records_created_elsewhere() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    gateway.seed("remote-1", remote("anim-7", "From another device", 5000));

    let mut binder = IdentityBinder::initialize(vec![], "owner-1", 0);
    binder
        .sign_in("remote-1", None, &mut store, &mut gateway, &reconciler, 6000)
        .unwrap();

    let pulled = store.get("owner-1", "anim-7").unwrap();
    assert_eq!(pulled.owner_id, "owner-1");
    assert_eq!(pulled.status, SyncStatus::Synced);
}

#[test]
fn sign_out_then_sign_in_repushes_local_state() {
    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let mut binder = IdentityBinder::initialize(vec![], "owner-1", 0);

    store
        .create("owner-1", "anim-1", "Bounce", json!({}), 1000)
        .unwrap();
    binder
        .sign_in("remote-1", None, &mut store, &mut gateway, &reconciler, 2000)
        .unwrap();
    binder.sign_out(&mut store, 3000);

    // Edit while signed out; the record is already re-tagged Updated.
    store
        .edit("owner-1", "anim-1", RecordPatch::rename("Bounce v2"), 4000)
        .unwrap();

    // Remote lost the record in the meantime; the re-push restores it.
    let mut empty_gateway = MemoryGateway::new();
    let report = binder
        .sign_in(
            "remote-1",
            None,
            &mut store,
            &mut empty_gateway,
            &reconciler,
            5000,
        )
        .unwrap();

    assert_eq!(report.pushed, 1);
    assert_eq!(
        empty_gateway.records_for("remote-1")[0].name,
        "Bounce v2"
    );
}

#[test]
fn transport_failure_leaves_local_state_untouched() {
    struct FlakyGateway;
    impl RemoteGateway for FlakyGateway {
        fn sync_batch(
            &mut self,
            _: &str,
            _: &[Record],
        ) -> reel_engine::Result<Vec<RemoteRecord>> {
            Err(Error::Transport("connection reset".into()))
        }
    }

    let reconciler = Reconciler::new();
    let mut store = RecordStore::new();
    let identity = bound_identity("owner-1", "remote-1");

    store
        .create("owner-1", "anim-1", "Bounce", json!({}), 1000)
        .unwrap();
    store
        .create("owner-1", "anim-2", "Spinner", json!({}), 1100)
        .unwrap();
    store
        .update_status("owner-1", "anim-2", SyncStatus::Synced)
        .unwrap();
    store.delete("owner-1", "anim-2", 1200).unwrap();
    let before = sorted(&store);

    let result = reconciler.sync(&mut store, &identity, &mut FlakyGateway, 2000);

    assert!(matches!(result, Err(Error::Transport(_))));
    // No record was touched: statuses, tombstones, timestamps all intact,
    // and in particular no transient Modified marker survived.
    assert_eq!(sorted(&store), before);
}

#[test]
fn concurrent_pass_for_same_owner_is_rejected() {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    /// Parks inside the round trip until released, so a second trigger can
    /// arrive while the first pass is provably still in flight.
    struct ParkedGateway {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }
    impl RemoteGateway for ParkedGateway {
        fn sync_batch(
            &mut self,
            _: &str,
            _: &[Record],
        ) -> reel_engine::Result<Vec<RemoteRecord>> {
            self.entered.send(()).ok();
            self.release.recv().ok();
            Ok(vec![])
        }
    }

    let reconciler = Arc::new(Reconciler::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();

    let background = {
        let reconciler = Arc::clone(&reconciler);
        thread::spawn(move || {
            let mut store = RecordStore::new();
            let mut gateway = ParkedGateway {
                entered: entered_tx,
                release: release_rx,
            };
            reconciler.sync(
                &mut store,
                &bound_identity("owner-1", "remote-1"),
                &mut gateway,
                1000,
            )
        })
    };

    // Wait until the first pass is inside its gateway call.
    entered_rx.recv().unwrap();

    let mut store = RecordStore::new();
    let mut gateway = MemoryGateway::new();
    let second = reconciler.sync(
        &mut store,
        &bound_identity("owner-1", "remote-1"),
        &mut gateway,
        1000,
    );
    assert!(matches!(second, Err(Error::SyncInFlight(_))));

    // A different owner is not blocked.
    let other = reconciler.sync(
        &mut store,
        &bound_identity("owner-2", "remote-2"),
        &mut gateway,
        1000,
    );
    assert!(other.is_ok());

    release_tx.send(()).unwrap();
    background.join().unwrap().unwrap();

    // And once the first pass finished, the owner is free again.
    let retry = reconciler.sync(
        &mut store,
        &bound_identity("owner-1", "remote-1"),
        &mut gateway,
        2000,
    );
    assert!(retry.is_ok());
}

fn sorted(store: &RecordStore) -> Vec<Record> {
    let mut records: Vec<Record> = store
        .query("owner-1")
        .include_tombstones()
        .all()
        .into_iter()
        .cloned()
        .collect();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    records
}
