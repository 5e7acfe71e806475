//! Error types for the warps core library.

use thiserror::Error;

use crate::types::{BlockLocation, WorldId};

/// Top-level error type for all warps operations.
///
/// Ordinary registry outcomes (a missing warp, a duplicate location on the
/// boolean add path) are not errors. Only persistence and configuration
/// produce values of this type on the hot path.
#[derive(Error, Debug)]
pub enum WarpsError {
    /// The exact block is already claimed as a warp in its world.
    #[error("Warp location already claimed: {location}")]
    DuplicateWarpLocation {
        /// The contested block.
        location: BlockLocation,
    },

    /// A persisted record names a world that is not currently active.
    #[error("Unresolved world reference: {world}")]
    UnresolvedWorld {
        /// The world named by the record.
        world: WorldId,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store failed to load at start, so writing the in-memory warps
    /// would replace data that was never read.
    #[error("Refusing to overwrite {store}: it could not be loaded")]
    UnloadedStore {
        /// The store's description.
        store: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WarpsError {
    /// Whether this error means a load or save could not complete.
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Io(_) | Self::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for WarpsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, WarpsError>;
