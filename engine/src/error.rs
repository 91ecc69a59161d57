//! Error types for the reel engine.

use crate::{OwnerId, RecordId};
use thiserror::Error;

/// All possible errors from the reel engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Store errors
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(RecordId),

    #[error("a record named '{0}' already exists for this owner")]
    DuplicateName(String),

    // Sync errors
    #[error("no remote identity is bound; sign in before syncing")]
    IdentityMissing,

    #[error("a sync pass is already in flight for owner {0}")]
    SyncInFlight(OwnerId),

    #[error("sync transport failed: {0}")]
    Transport(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
