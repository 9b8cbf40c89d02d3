//! Shared record store
//!
//! [`Store`] owns the records. It is `Send + Sync` and cheap to clone; every
//! clone refers to the same records. Values are never handed out as live
//! references: reads go through [`Store::value`] (a copy) or through a
//! [`StoreContext`] created with [`Store::new_context`].

use crate::context::StoreContext;
use crate::error::StoreError;
use crate::types::{ContextId, ObjectId, RecordId, StoreId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct StoreShared {
    id: StoreId,
    records: RwLock<BTreeMap<RecordId, f64>>,
    next_record: AtomicU64,
    next_context: AtomicU64,
    open: AtomicBool,
}

/// In-memory record store
#[derive(Debug, Clone)]
pub struct Store {
    shared: Arc<StoreShared>,
}

impl Store {
    /// Create an empty, open store
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(StoreShared {
                id: StoreId::new(),
                records: RwLock::new(BTreeMap::new()),
                next_record: AtomicU64::new(1),
                next_context: AtomicU64::new(1),
                open: AtomicBool::new(true),
            }),
        }
    }

    /// Store identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.shared.id
    }

    /// Whether the store still serves reads and contexts
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Close the store
    ///
    /// Existing contexts keep the values they already materialized, but no
    /// further record can be resolved and no new context can be created.
    pub fn close(&self) {
        if self.shared.open.swap(false, Ordering::AcqRel) {
            tracing::debug!(store = %self.id(), "store closed");
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed(self.id()))
        }
    }

    /// Insert a record
    ///
    /// # Errors
    /// `StoreError::Closed` if the store was closed
    pub fn insert(&self, value: f64) -> Result<RecordId, StoreError> {
        self.ensure_open()?;
        let record = RecordId::new(self.shared.next_record.fetch_add(1, Ordering::Relaxed));
        self.shared.records.write().insert(record, value);
        Ok(record)
    }

    /// Remove a record, returning its last saved value
    ///
    /// # Errors
    /// `StoreError::Closed` or `StoreError::RecordNotFound`
    pub fn remove(&self, record: RecordId) -> Result<f64, StoreError> {
        self.ensure_open()?;
        self.shared
            .records
            .write()
            .remove(&record)
            .ok_or(StoreError::RecordNotFound {
                store: self.id(),
                record,
            })
    }

    /// Copy of a record's saved value
    ///
    /// # Errors
    /// `StoreError::Closed` or `StoreError::RecordNotFound`
    pub fn value(&self, record: RecordId) -> Result<f64, StoreError> {
        self.ensure_open()?;
        self.shared
            .records
            .read()
            .get(&record)
            .copied()
            .ok_or(StoreError::RecordNotFound {
                store: self.id(),
                record,
            })
    }

    /// Store-qualified identity for a record key
    #[inline]
    #[must_use]
    pub fn object_id(&self, record: RecordId) -> ObjectId {
        ObjectId {
            store: self.id(),
            record,
        }
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.records.read().len()
    }

    /// True when the store holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.records.read().is_empty()
    }

    /// Snapshot of all records in key order
    #[must_use]
    pub fn records(&self) -> Vec<(RecordId, f64)> {
        self.shared
            .records
            .read()
            .iter()
            .map(|(record, value)| (*record, *value))
            .collect()
    }

    /// Record with the smallest value (ties go to the lowest key)
    ///
    /// # Errors
    /// `StoreError::Closed` if the store was closed
    pub fn first_by_value(&self) -> Result<Option<(RecordId, f64)>, StoreError> {
        self.ensure_open()?;
        Ok(self
            .shared
            .records
            .read()
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(record, value)| (*record, *value)))
    }

    /// Create a new execution context descending from this store
    ///
    /// The context is confined to the thread that holds it.
    ///
    /// # Errors
    /// `StoreError::Closed` if the store was closed
    pub fn new_context(&self) -> Result<StoreContext, StoreError> {
        self.ensure_open()?;
        let id = ContextId::new(self.shared.next_context.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(store = %self.id(), context = %id, "context created");
        Ok(StoreContext::new(id, self.clone()))
    }

    /// Number of contexts created so far
    #[must_use]
    pub fn contexts_created(&self) -> u64 {
        self.shared.next_context.load(Ordering::Relaxed) - 1
    }

    /// Non-owning reference to this store
    #[must_use]
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            id: self.id(),
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning reference to a [`Store`]
///
/// Work items keep one of these so that holding a work item never keeps
/// the store alive.
#[derive(Debug, Clone)]
pub struct WeakStore {
    id: StoreId,
    shared: Weak<StoreShared>,
}

impl WeakStore {
    /// Identity of the referenced store
    #[inline]
    #[must_use]
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Recover the store if it is still alive
    ///
    /// # Errors
    /// `StoreError::Unreachable` once every [`Store`] clone was dropped
    pub fn upgrade(&self) -> Result<Store, StoreError> {
        self.shared
            .upgrade()
            .map(|shared| Store { shared })
            .ok_or(StoreError::Unreachable(self.id))
    }
}
