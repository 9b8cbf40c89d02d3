//! Error types for the confined store

use crate::types::{ObjectId, RecordId, StoreId};

/// Store operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store was closed; no new contexts or reads are served
    #[error("{0} is closed")]
    Closed(StoreId),

    /// Every strong handle to the store has been dropped
    #[error("{0} is no longer reachable")]
    Unreachable(StoreId),

    /// Record does not exist (never inserted, or removed)
    #[error("{record} not found in {store}")]
    RecordNotFound {
        /// Store that was searched
        store: StoreId,
        /// Missing record
        record: RecordId,
    },

    /// Object belongs to a different store than the resolving context
    #[error("{object} cannot be resolved in a context of {context_store}")]
    ForeignContext {
        /// Object that was asked for
        object: ObjectId,
        /// Store the resolving context descends from
        context_store: StoreId,
    },
}

impl StoreError {
    /// True when the store itself is gone, as opposed to a single record
    #[inline]
    #[must_use]
    pub fn is_store_gone(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Unreachable(_))
    }
}
