//! Work items
//!
//! The single input of a benchmark run. A work item fetched from a store
//! remembers where it came from without keeping the store alive, so the
//! confined strategies can re-derive it per unit and fail cleanly once the
//! store is gone.

use crate::error::BenchError;
use crate::handle::{ConfinedRef, ResourceHandle};
use confbench_store::{ObjectId, RecordId, Store};

/// Input of a benchmark run
#[derive(Debug, Clone)]
pub struct WorkItem {
    source_value: f64,
    origin: Option<ConfinedRef>,
}

impl WorkItem {
    /// Work item that belongs to no store
    ///
    /// Usable with the plain strategies only.
    #[inline]
    #[must_use]
    pub fn synthetic(source_value: f64) -> Self {
        Self {
            source_value,
            origin: None,
        }
    }

    /// Fetch a record from `store`
    ///
    /// # Errors
    /// `BenchError::StoreUnavailable` if the store is closed or the record
    /// does not exist
    pub fn fetch(store: &Store, record: RecordId) -> Result<Self, BenchError> {
        let source_value = store.value(record).map_err(|e| BenchError::unavailable(&e))?;
        Ok(Self {
            source_value,
            origin: Some(ConfinedRef::new(store.downgrade(), store.object_id(record))),
        })
    }

    /// Fetch the record with the lowest value
    ///
    /// # Errors
    /// `BenchError::StoreUnavailable` if the store is closed or empty
    pub fn first_in(store: &Store) -> Result<Self, BenchError> {
        let (record, _) = store
            .first_by_value()
            .map_err(|e| BenchError::unavailable(&e))?
            .ok_or_else(|| BenchError::StoreUnavailable(format!("{} has no records", store.id())))?;
        Self::fetch(store, record)
    }

    /// Value captured when the item was fetched or created
    #[inline]
    #[must_use]
    pub fn source_value(&self) -> f64 {
        self.source_value
    }

    /// Store-qualified identity, `None` for synthetic items
    #[inline]
    #[must_use]
    pub fn object(&self) -> Option<ObjectId> {
        self.origin.as_ref().map(ConfinedRef::object)
    }

    /// Whether the item belongs to no store
    #[inline]
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.origin.is_none()
    }

    /// Plain copy of the source value
    #[inline]
    #[must_use]
    pub fn plain_handle(&self) -> ResourceHandle {
        ResourceHandle::Plain(self.source_value)
    }

    /// Confined reference to the backing record
    ///
    /// # Errors
    /// `BenchError::ConfinementViolation` for synthetic items, which have no
    /// owning store to derive contexts from
    pub fn confined_handle(&self) -> Result<ResourceHandle, BenchError> {
        self.origin
            .clone()
            .map(ResourceHandle::Confined)
            .ok_or_else(|| BenchError::ConfinementViolation {
                object: None,
                reason: "work item has no owning store".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_item() {
        let item = WorkItem::synthetic(0.37);
        assert!(item.is_synthetic());
        assert_eq!(item.source_value(), 0.37);
        assert_eq!(item.object(), None);
        assert_eq!(item.plain_handle().current_value().unwrap(), 0.37);
        assert!(item.confined_handle().unwrap_err().is_confinement_violation());
    }

    #[test]
    fn fetched_item_keeps_origin() {
        let store = Store::new();
        let record = store.insert(0.5).unwrap();

        let item = WorkItem::fetch(&store, record).unwrap();
        assert!(!item.is_synthetic());
        assert_eq!(item.object(), Some(store.object_id(record)));
        assert_eq!(item.confined_handle().unwrap().current_value().unwrap(), 0.5);
    }

    #[test]
    fn fetch_missing_record_is_store_unavailable() {
        let store = Store::new();
        let err = WorkItem::fetch(&store, RecordId::new(9)).unwrap_err();
        assert!(matches!(err, BenchError::StoreUnavailable(_)));
    }

    #[test]
    fn first_in_picks_lowest_value() {
        let store = Store::new();
        store.insert(0.8).unwrap();
        let low = store.insert(0.2).unwrap();

        let item = WorkItem::first_in(&store).unwrap();
        assert_eq!(item.object(), Some(store.object_id(low)));
        assert_eq!(item.source_value(), 0.2);
    }

    #[test]
    fn first_in_empty_or_closed_store() {
        let store = Store::new();
        assert!(matches!(
            WorkItem::first_in(&store),
            Err(BenchError::StoreUnavailable(msg)) if msg.contains("no records")
        ));

        store.insert(1.0).unwrap();
        store.close();
        assert!(matches!(
            WorkItem::first_in(&store),
            Err(BenchError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn item_does_not_keep_store_alive() {
        let store = Store::new();
        let record = store.insert(0.5).unwrap();
        let item = WorkItem::fetch(&store, record).unwrap();
        drop(store);

        assert_eq!(item.source_value(), 0.5);
        let handle = item.confined_handle().unwrap();
        assert!(handle.current_value().unwrap_err().is_confinement_violation());
    }
}
