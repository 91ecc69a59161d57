//! # Reel Engine
//!
//! A deterministic sync engine for offline-first animation asset libraries.
//!
//! This crate provides the core logic for keeping a locally-mutated record
//! collection consistent with a remote authority: a status-tagged record
//! store, a timestamp-driven reconciliation pass, and the identity binding
//! that gates it. The same inputs always produce the same outputs.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or platform
//! - **Deterministic**: same inputs always produce same outputs
//! - **Testable**: pure logic, no mocks needed
//! - **Portable**: runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! An animation asset is a [`Record`]: a caller-generated id, an owner, a
//! display name, an opaque animation document, timestamps, and a
//! [`SyncStatus`] lifecycle tag (`Synced`, `Created`, `Updated`, `Deleted`,
//! `Modified`) that tells the reconciler what work is outstanding.
//!
//! ### Reconciliation
//!
//! A sync pass is push-then-pull-then-merge: the non-`Synced` records go to
//! the authority in one [`RemoteGateway::sync_batch`] round trip, the
//! authority resolves conflicts by `updated_at` (strictly newer local wins,
//! ties favor remote), and the returned authoritative set is committed to
//! the local store as one staged swap. Passes are idempotent and safe to
//! retry; the [`Reconciler`] serializes them per owner.
//!
//! The authority-side merge ([`merge_batch`]) is defined once and shared:
//! the in-memory [`MemoryGateway`] and the HTTP server apply the identical
//! function.
//!
//! ### Identity
//!
//! A [`LocalIdentity`] always exists so offline-created records have an
//! owner before any account does. The [`IdentityBinder`] binds it to a
//! remote identity on sign-in (triggering a sync pass) and unbinds on
//! sign-out without discarding local state.
//!
//! ## Quick Start
//!
//! ```rust
//! use reel_engine::{IdentityBinder, MemoryGateway, Reconciler, RecordStore, SyncStatus};
//! use serde_json::json;
//!
//! let mut store = RecordStore::new();
//! let mut binder = IdentityBinder::initialize(vec![], "owner-1", 0);
//!
//! // Work offline.
//! store
//!     .create("owner-1", "anim-1", "Bounce", json!({"fr": 30}), 1_000)
//!     .unwrap();
//!
//! // Sign in and reconcile.
//! let mut gateway = MemoryGateway::new();
//! let reconciler = Reconciler::new();
//! let report = binder
//!     .sign_in("remote-1", None, &mut store, &mut gateway, &reconciler, 2_000)
//!     .unwrap();
//!
//! assert_eq!(report.pushed, 1);
//! assert_eq!(
//!     store.get("owner-1", "anim-1").unwrap().status,
//!     SyncStatus::Synced
//! );
//! ```
//!
//! ## Persistence
//!
//! Use [`StoreSnapshot::capture`] and [`StoreSnapshot::restore`] for
//! durability. Snapshots serialize to JSON with deterministic ordering.

pub mod error;
pub mod gateway;
pub mod identity;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod status;
pub mod store;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use gateway::{MemoryGateway, RemoteGateway, RemoteRecord};
pub use identity::{IdentityBinder, LocalIdentity};
pub use reconcile::{merge_batch, MergeOutcome, Reconciler, SyncReport};
pub use record::{Record, RecordPatch};
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use status::{DeleteAction, SyncStatus};
pub use store::{Collection, QueryBuilder, RecordStore};

/// Type aliases for clarity
pub type RecordId = String;
pub type OwnerId = String;
pub type Timestamp = u64;
