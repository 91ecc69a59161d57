//! In-memory session table mapping bearer tokens to owner ids.
//!
//! Sessions live for the process lifetime; a restart signs everyone out,
//! which is safe because clients keep their local state and simply sign in
//! again (the sync pass is idempotent).

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Concurrent token -> owner id map.
#[derive(Debug, Default)]
pub struct SessionStore {
    tokens: DashMap<String, String>,
}

impl SessionStore {
    /// Create a shared session store.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Issue a fresh bearer token for an owner.
    pub fn issue(&self, owner_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), owner_id.to_string());
        token
    }

    /// Resolve a bearer token to its owner id.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }

    /// Revoke a token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }
}
