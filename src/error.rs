use thiserror::Error;

use crate::storage::StorageError;

/// Outcome of a rejected or partially applied task-store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Title was empty after trimming; nothing changed.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// Only the light and dark themes exist; nothing changed.
    #[error("unknown theme: {0:?}")]
    UnknownTheme(String),

    /// The referenced task no longer exists. Usually a stale view; nothing changed.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The mutation was applied in memory and broadcast, but the durable
    /// snapshot could not be written and is now behind the running session.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl StoreError {
    /// True when the in-memory state was changed despite the error.
    pub fn mutation_applied(&self) -> bool {
        matches!(self, StoreError::StorageFailure(_))
    }
}
