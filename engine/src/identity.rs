//! Local identity and its binding to a remote identity.
//!
//! A local identity always exists so records created offline have an owner
//! before any account does. Binding to a remote identity is what makes a
//! sync pass possible; unbinding keeps the records and re-tags them so a
//! later sign-in pushes them again.

use crate::{
    error::Result, OwnerId, Reconciler, RecordStore, RemoteGateway, SyncReport, Timestamp,
};
use serde::{Deserialize, Serialize};

/// The stable local identity owning this store's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    /// Stable local owner id, created on first run and reused forever.
    pub id: OwnerId,
    /// Email of the bound account, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Remote identity id once authentication has succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl LocalIdentity {
    /// Create a fresh, unbound identity.
    pub fn new(id: impl Into<OwnerId>, now: Timestamp) -> Self {
        Self {
            id: id.into(),
            email: None,
            remote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a remote identity is currently bound.
    pub fn is_bound(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Owns the single local identity and its remote binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBinder {
    identity: LocalIdentity,
    /// Ids of duplicate identities discarded at initialization.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    discarded: Vec<OwnerId>,
}

impl IdentityBinder {
    /// Initialize from whatever identities the persisted store held.
    ///
    /// Normally `existing` holds zero or one entry. If a race ever produced
    /// more, the earliest by `(created_at, id)` is kept deterministically
    /// and the rest are discarded; with none, a fresh identity is created
    /// under `new_id`.
    pub fn initialize(
        mut existing: Vec<LocalIdentity>,
        new_id: impl Into<OwnerId>,
        now: Timestamp,
    ) -> Self {
        if existing.is_empty() {
            return Self {
                identity: LocalIdentity::new(new_id, now),
                discarded: Vec::new(),
            };
        }

        existing.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        let identity = existing.remove(0);
        let discarded = existing.into_iter().map(|i| i.id).collect();

        Self {
            identity,
            discarded,
        }
    }

    /// The current local identity.
    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Duplicate identity ids dropped at initialization, if any.
    pub fn discarded(&self) -> &[OwnerId] {
        &self.discarded
    }

    /// Bind a remote identity without syncing (used by session restore).
    pub fn bind(
        &mut self,
        remote_id: impl Into<String>,
        email: Option<String>,
        now: Timestamp,
    ) {
        self.identity.remote_id = Some(remote_id.into());
        self.identity.email = email;
        self.identity.updated_at = now;
    }

    /// Bind a remote identity and immediately run a full sync pass.
    ///
    /// The binding sticks even if the pass fails; the caller may retry the
    /// sync on its own (the pass is idempotent).
    pub fn sign_in<G>(
        &mut self,
        remote_id: impl Into<String>,
        email: Option<String>,
        store: &mut RecordStore,
        gateway: &mut G,
        reconciler: &Reconciler,
        now: Timestamp,
    ) -> Result<SyncReport>
    where
        G: RemoteGateway + ?Sized,
    {
        self.bind(remote_id, email, now);
        reconciler.sync(store, &self.identity, gateway, now)
    }

    /// Unbind the remote identity, preserving local records.
    ///
    /// Previously synced records are re-tagged as locally edited so the next
    /// sign-in pushes them instead of silently discarding them.
    pub fn sign_out(&mut self, store: &mut RecordStore, now: Timestamp) {
        store.mark_all_updated(&self.identity.id);
        self.identity.remote_id = None;
        self.identity.email = None;
        self.identity.updated_at = now;
    }
}
