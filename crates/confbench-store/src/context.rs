//! Execution contexts and confined handles
//!
//! A [`StoreContext`] is a scratch space descending from a [`Store`]. Records
//! are materialized into it on first [`resolve`](StoreContext::resolve) and
//! every edit made through a [`ManagedValue`] stays in the context; nothing
//! is ever written back to the store. Dropping the context discards the
//! edits.
//!
//! Both types are `!Send` and `!Sync`: a context, and every handle it hands
//! out, lives and dies on the thread that created it. Handles borrow their
//! context, so none can outlive it either.
//!
//! ```compile_fail
//! use confbench_store::Store;
//!
//! let store = Store::new();
//! let context = store.new_context().unwrap();
//! std::thread::spawn(move || {
//!     let _ = context.id();
//! });
//! ```
//!
//! ```compile_fail
//! use confbench_store::Store;
//!
//! let store = Store::new();
//! let record = store.insert(1.0).unwrap();
//! let handle = {
//!     let context = store.new_context().unwrap();
//!     context.resolve(store.object_id(record)).unwrap()
//! };
//! handle.get();
//! ```

use crate::error::StoreError;
use crate::store::Store;
use crate::types::{ContextId, ObjectId, StoreId};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Thread-confined view of a [`Store`]
#[derive(Debug)]
pub struct StoreContext {
    id: ContextId,
    store: Store,
    staged: RefCell<BTreeMap<ObjectId, Rc<Cell<f64>>>>,
    writes: Cell<u64>,
}

impl StoreContext {
    pub(crate) fn new(id: ContextId, store: Store) -> Self {
        Self {
            id,
            store,
            staged: RefCell::new(BTreeMap::new()),
            writes: Cell::new(0),
        }
    }

    /// Context identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Store this context descends from
    #[inline]
    #[must_use]
    pub fn store_id(&self) -> StoreId {
        self.store.id()
    }

    /// Resolve an object inside this context
    ///
    /// The first resolution copies the saved value into the context;
    /// later resolutions of the same object share that copy.
    ///
    /// # Errors
    /// - `StoreError::ForeignContext` if `object` belongs to another store
    /// - `StoreError::Closed` if the store was closed before materialization
    /// - `StoreError::RecordNotFound` if the record no longer exists
    pub fn resolve(&self, object: ObjectId) -> Result<ManagedValue<'_>, StoreError> {
        if object.store != self.store_id() {
            return Err(StoreError::ForeignContext {
                object,
                context_store: self.store_id(),
            });
        }

        let existing = self.staged.borrow().get(&object).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let value = self.store.value(object.record)?;
                let slot = Rc::new(Cell::new(value));
                self.staged.borrow_mut().insert(object, Rc::clone(&slot));
                tracing::trace!(context = %self.id, %object, "object materialized");
                slot
            }
        };

        Ok(ManagedValue {
            context: self,
            object,
            slot,
        })
    }

    /// Run `work` inside this context and wait for it
    ///
    /// Execution is synchronous on the calling thread; the closure gets the
    /// context back so handles resolved inside it cannot escape.
    pub fn perform_and_wait<R>(&self, work: impl FnOnce(&Self) -> R) -> R {
        work(self)
    }

    /// Number of objects materialized in this context
    #[must_use]
    pub fn materialized(&self) -> usize {
        self.staged.borrow().len()
    }

    /// Total writes made through handles of this context
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    /// Whether any handle of this context was written to
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.writes.get() > 0
    }
}

/// Confined handle to one object's value inside a [`StoreContext`]
#[derive(Debug)]
pub struct ManagedValue<'ctx> {
    context: &'ctx StoreContext,
    object: ObjectId,
    slot: Rc<Cell<f64>>,
}

impl ManagedValue<'_> {
    /// Object this handle refers to
    #[inline]
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Context that owns this handle
    #[inline]
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context.id
    }

    /// Current value as seen by the owning context
    #[inline]
    #[must_use]
    pub fn get(&self) -> f64 {
        self.slot.get()
    }

    /// Overwrite the value inside the owning context
    #[inline]
    pub fn set(&self, value: f64) {
        self.slot.set(value);
        self.context.writes.set(self.context.writes.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(value: f64) -> (Store, ObjectId) {
        let store = Store::new();
        let record = store.insert(value).unwrap();
        let object = store.object_id(record);
        (store, object)
    }

    #[test]
    fn resolve_reads_saved_value() {
        let (store, object) = store_with(0.37);
        let context = store.new_context().unwrap();

        let handle = context.resolve(object).unwrap();
        assert_eq!(handle.get(), 0.37);
        assert_eq!(handle.object(), object);
        assert_eq!(handle.context_id(), context.id());
    }

    #[test]
    fn edits_stay_inside_the_context() {
        let (store, object) = store_with(0.37);
        let context = store.new_context().unwrap();

        let handle = context.resolve(object).unwrap();
        handle.set(9.0);

        assert_eq!(handle.get(), 9.0);
        assert!(context.has_changes());
        assert_eq!(context.write_count(), 1);
        assert_eq!(store.value(object.record).unwrap(), 0.37);

        let sibling = store.new_context().unwrap();
        assert_eq!(sibling.resolve(object).unwrap().get(), 0.37);
    }

    #[test]
    fn repeated_resolution_shares_the_copy() {
        let (store, object) = store_with(1.0);
        let context = store.new_context().unwrap();

        let first = context.resolve(object).unwrap();
        first.set(2.0);
        let second = context.resolve(object).unwrap();

        assert_eq!(second.get(), 2.0);
        assert_eq!(context.materialized(), 1);
    }

    #[test]
    fn foreign_objects_are_rejected() {
        let (_store, object) = store_with(1.0);
        let other = Store::new();
        let context = other.new_context().unwrap();

        assert_eq!(
            context.resolve(object).unwrap_err(),
            StoreError::ForeignContext {
                object,
                context_store: other.id(),
            }
        );
    }

    #[test]
    fn removed_record_cannot_be_resolved() {
        let (store, object) = store_with(1.0);
        let context = store.new_context().unwrap();
        store.remove(object.record).unwrap();

        assert!(matches!(
            context.resolve(object),
            Err(StoreError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn closing_blocks_new_materialization() {
        let (store, object) = store_with(1.0);
        let context = store.new_context().unwrap();
        let early = context.resolve(object).unwrap().get();
        store.close();

        assert_eq!(early, 1.0);
        // already materialized objects stay readable
        assert_eq!(context.resolve(object).unwrap().get(), 1.0);

        let other = store.object_id(crate::RecordId::new(99));
        assert_eq!(context.resolve(other).unwrap_err(), StoreError::Closed(store.id()));
    }

    #[test]
    fn perform_and_wait_returns_closure_result() {
        let (store, object) = store_with(0.5);
        let context = store.new_context().unwrap();

        let doubled = context.perform_and_wait(|ctx| {
            let handle = ctx.resolve(object).unwrap();
            handle.set(handle.get() * 2.0);
            handle.get()
        });

        assert_eq!(doubled, 1.0);
    }
}
