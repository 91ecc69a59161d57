//! Record store - the local state container.
//!
//! The store holds every record keyed by `(owner, id)` and enforces the
//! status lifecycle on the user-facing CRUD path. Durability is handled by
//! snapshots; within a process all mutation goes through `&mut self`, which
//! is what makes each operation atomic with respect to an in-flight sync.

use crate::{
    error::Result, DeleteAction, Error, OwnerId, Record, RecordId, RecordPatch, RemoteRecord,
    SyncStatus, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All records belonging to one owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    records: HashMap<RecordId, Record>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Get a record by id, tombstones included.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Insert a record, replacing any existing one with the same id.
    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.id.clone(), record);
    }

    /// All records that are not tombstones.
    pub fn active_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values().filter(|r| !r.is_tombstone())
    }

    /// All records including tombstones.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Count of active records.
    pub fn len(&self) -> usize {
        self.records.values().filter(|r| !r.is_tombstone()).count()
    }

    /// Whether the collection has no active records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The local record store, keyed by owner then record id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordStore {
    owners: HashMap<OwnerId, Collection>,
    /// Reject creates whose name collides with an existing record of the
    /// same owner (case-insensitive). Off unless opted in.
    unique_names: bool,
}

impl RecordStore {
    /// Create an empty store with the default (permissive) name policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects duplicate names per owner.
    pub fn with_unique_names() -> Self {
        Self {
            owners: HashMap::new(),
            unique_names: true,
        }
    }

    /// Create a new record with status `Created`.
    ///
    /// The id is caller-generated; creating an id that already exists for
    /// the owner (even as a tombstone) is an error.
    pub fn create(
        &mut self,
        owner_id: impl Into<OwnerId>,
        id: impl Into<RecordId>,
        name: impl Into<String>,
        payload: serde_json::Value,
        now: Timestamp,
    ) -> Result<&Record> {
        let owner_id = owner_id.into();
        let id = id.into();
        let name = name.into();

        let collection = self.owners.entry(owner_id.clone()).or_default();
        if collection.records.contains_key(&id) {
            return Err(Error::RecordAlreadyExists(id));
        }
        if self.unique_names {
            let lowered = name.to_lowercase();
            if collection
                .active_records()
                .any(|r| r.name.to_lowercase() == lowered)
            {
                return Err(Error::DuplicateName(name));
            }
        }

        let record = Record::new(id.clone(), owner_id, name, payload, now);
        Ok(collection.records.entry(id).or_insert(record))
    }

    /// Get an active record by owner and id.
    pub fn get(&self, owner_id: &str, id: &str) -> Option<&Record> {
        self.owners
            .get(owner_id)
            .and_then(|c| c.get(id))
            .filter(|r| !r.is_tombstone())
    }

    /// Get a record including tombstones (sync machinery).
    pub fn get_including_deleted(&self, owner_id: &str, id: &str) -> Option<&Record> {
        self.owners.get(owner_id).and_then(|c| c.get(id))
    }

    /// List an owner's active records, in no particular order.
    pub fn list(&self, owner_id: &str) -> Vec<&Record> {
        self.query(owner_id).all()
    }

    /// Start a filtered query over an owner's records.
    pub fn query(&self, owner_id: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(self.owners.get(owner_id))
    }

    /// Apply a user edit; `Synced` records transition to `Updated`.
    pub fn edit(
        &mut self,
        owner_id: &str,
        id: &str,
        patch: RecordPatch,
        now: Timestamp,
    ) -> Result<&Record> {
        let exists = self
            .owners
            .get(owner_id)
            .and_then(|c| c.get(id))
            .is_some_and(|r| !r.is_tombstone());
        if !exists {
            return Err(Error::RecordNotFound(id.to_string()));
        }

        if self.unique_names {
            if let Some(new_name) = patch.name.as_deref() {
                let lowered = new_name.to_lowercase();
                if let Some(collection) = self.owners.get(owner_id) {
                    if collection
                        .active_records()
                        .any(|r| r.id != id && r.name.to_lowercase() == lowered)
                    {
                        return Err(Error::DuplicateName(new_name.to_string()));
                    }
                }
            }
        }

        let record = self
            .owners
            .get_mut(owner_id)
            .and_then(|c| c.records.get_mut(id))
            .filter(|r| !r.is_tombstone())
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;

        record.apply_edit(patch, now);
        Ok(record)
    }

    /// Delete a record: physical removal when it was never pushed, a
    /// tombstone otherwise.
    pub fn delete(&mut self, owner_id: &str, id: &str, now: Timestamp) -> Result<DeleteAction> {
        let collection = self
            .owners
            .get_mut(owner_id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        let record = collection
            .records
            .get_mut(id)
            .filter(|r| !r.is_tombstone())
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;

        let action = record.status.on_delete();
        match action {
            DeleteAction::RemoveNow => {
                collection.records.remove(id);
            }
            DeleteAction::Tombstone => record.mark_deleted(now),
        }
        Ok(action)
    }

    /// Overwrite a record's status, tombstones included.
    pub fn update_status(&mut self, owner_id: &str, id: &str, status: SyncStatus) -> Result<()> {
        let record = self
            .owners
            .get_mut(owner_id)
            .and_then(|c| c.records.get_mut(id))
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        record.status = status;
        Ok(())
    }

    /// Raw upsert, bypassing lifecycle checks (snapshot restore, tests).
    pub fn put(&mut self, record: Record) {
        self.owners
            .entry(record.owner_id.clone())
            .or_default()
            .insert(record);
    }

    /// Physically remove a record, returning it if present.
    pub fn remove(&mut self, owner_id: &str, id: &str) -> Option<Record> {
        self.owners.get_mut(owner_id)?.records.remove(id)
    }

    /// Re-tag an owner's records after sign-out so a future sign-in pushes
    /// them again instead of discarding local edits.
    ///
    /// `Synced` and `Modified` become `Updated`. `Created` stays `Created`
    /// (the remote never saw it) and `Deleted` stays `Deleted` (re-tagging a
    /// tombstone would resurrect it on the next pass).
    pub fn mark_all_updated(&mut self, owner_id: &str) {
        if let Some(collection) = self.owners.get_mut(owner_id) {
            for record in collection.records.values_mut() {
                if matches!(record.status, SyncStatus::Synced | SyncStatus::Modified) {
                    record.status = SyncStatus::Updated;
                    record.last_synced_at = None;
                }
            }
        }
    }

    /// Apply the authoritative post-merge remote set for one owner.
    ///
    /// This is the three-way merge commit of a sync pass, staged on a copy
    /// of the owner's collection and swapped in whole so an abort anywhere
    /// earlier in the pass leaves no trace:
    /// 1. every existing record is marked `Modified` ("presumed stale"),
    /// 2. each fetched record overwrites or inserts as `Synced` with
    ///    `last_synced_at = now` and ownership rewritten to the local owner,
    /// 3. records still `Modified` afterwards no longer exist remotely and
    ///    are dropped.
    ///
    /// Returns `(inserted, overwritten, removed)` counts.
    pub fn apply_remote_set(
        &mut self,
        owner_id: &str,
        fetched: &[RemoteRecord],
        now: Timestamp,
    ) -> (usize, usize, usize) {
        let mut staged = self.owners.get(owner_id).cloned().unwrap_or_default();

        for record in staged.records.values_mut() {
            record.status = SyncStatus::Modified;
        }

        let mut inserted = 0;
        let mut overwritten = 0;
        for remote in fetched {
            match staged.records.get_mut(&remote.id) {
                Some(local) => {
                    local.name = remote.name.clone();
                    local.payload = remote.payload.clone();
                    local.created_at = remote.created_at;
                    local.updated_at = remote.updated_at;
                    local.mark_synced(now);
                    overwritten += 1;
                }
                None => {
                    staged.insert(remote.to_local(owner_id, now));
                    inserted += 1;
                }
            }
        }

        let before = staged.records.len();
        staged
            .records
            .retain(|_, r| r.status != SyncStatus::Modified);
        let removed = before - staged.records.len();

        self.owners.insert(owner_id.to_string(), staged);
        (inserted, overwritten, removed)
    }

    /// Iterate over every owner id present in the store.
    pub fn owner_ids(&self) -> impl Iterator<Item = &OwnerId> {
        self.owners.keys()
    }

    /// Borrow one owner's collection.
    pub fn collection(&self, owner_id: &str) -> Option<&Collection> {
        self.owners.get(owner_id)
    }
}

/// Builder for querying one owner's records.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    collection: Option<&'a Collection>,
    status: Option<SyncStatus>,
    name_query: Option<String>,
    include_tombstones: bool,
}

impl<'a> QueryBuilder<'a> {
    fn new(collection: Option<&'a Collection>) -> Self {
        Self {
            collection,
            status: None,
            name_query: None,
            include_tombstones: false,
        }
    }

    /// Only records with the given status.
    pub fn status(mut self, status: SyncStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Only records whose name contains `query`, case-insensitively.
    pub fn name_contains(mut self, query: impl Into<String>) -> Self {
        self.name_query = Some(query.into().to_lowercase());
        self
    }

    /// Include deletion tombstones in results.
    pub fn include_tombstones(mut self) -> Self {
        self.include_tombstones = true;
        self
    }

    fn matches(&self, record: &Record) -> bool {
        if !self.include_tombstones && record.is_tombstone() {
            return false;
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(query) = &self.name_query {
            if !record.name.to_lowercase().contains(query) {
                return false;
            }
        }
        true
    }

    /// All matching records.
    pub fn all(self) -> Vec<&'a Record> {
        match self.collection {
            Some(collection) => collection
                .all_records()
                .filter(|r| self.matches(r))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The first matching record, if any.
    pub fn first(self) -> Option<&'a Record> {
        match self.collection {
            Some(collection) => collection.all_records().find(|r| self.matches(r)),
            None => None,
        }
    }

    /// Count of matching records.
    pub fn count(self) -> usize {
        match self.collection {
            Some(collection) => collection.all_records().filter(|r| self.matches(r)).count(),
            None => 0,
        }
    }
}
