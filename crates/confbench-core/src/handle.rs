//! Resource handles
//!
//! A [`ResourceHandle`] is what a strategy shares between its units: either
//! a plain number or a [`ConfinedRef`], the store-qualified identity of a
//! record. Neither carries anything a unit could mutate. To do work a unit
//! derives a [`DerivedHandle`], which is private to that unit and, for the
//! confined case, bound to the unit's own [`StoreContext`].

use crate::error::BenchError;
use crate::kernel::Accumulator;
use confbench_store::{ManagedValue, ObjectId, Store, StoreContext, WeakStore};

/// Shareable reference to a record in a confined store
#[derive(Debug, Clone)]
pub struct ConfinedRef {
    store: WeakStore,
    object: ObjectId,
}

impl ConfinedRef {
    pub(crate) fn new(store: WeakStore, object: ObjectId) -> Self {
        Self { store, object }
    }

    /// Identity of the referenced record
    #[inline]
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Owning store, if still reachable
    ///
    /// # Errors
    /// `BenchError::ConfinementViolation` once the owning store was dropped
    pub fn owner(&self) -> Result<Store, BenchError> {
        self.store
            .upgrade()
            .map_err(|e| BenchError::confinement(Some(self.object), &e))
    }
}

/// Value a strategy works from
#[derive(Debug, Clone)]
pub enum ResourceHandle {
    /// Immutable plain number
    Plain(f64),
    /// Identity of a record that must be resolved inside a context
    Confined(ConfinedRef),
}

impl ResourceHandle {
    /// Whether this handle needs a context to be touched
    #[inline]
    #[must_use]
    pub fn is_confined(&self) -> bool {
        matches!(self, Self::Confined(_))
    }

    /// Read the current value
    ///
    /// A confined handle reads the saved value from its owning store.
    ///
    /// # Errors
    /// `BenchError::ConfinementViolation` if the owning store is gone or
    /// closed, or the record no longer exists
    pub fn current_value(&self) -> Result<f64, BenchError> {
        match self {
            Self::Plain(value) => Ok(*value),
            Self::Confined(reference) => reference
                .owner()?
                .value(reference.object.record)
                .map_err(|e| BenchError::confinement(Some(reference.object), &e)),
        }
    }

    /// Derive a unit-private handle valid inside `context`
    ///
    /// A plain handle ignores the context and returns a copy.
    ///
    /// # Errors
    /// `BenchError::ConfinementViolation` if the record cannot be located in
    /// `context` (foreign store, closed store, removed record)
    pub fn derive_for_context<'ctx>(
        &self,
        context: &'ctx StoreContext,
    ) -> Result<DerivedHandle<'ctx>, BenchError> {
        match self {
            Self::Plain(value) => Ok(DerivedHandle::Plain(*value)),
            Self::Confined(reference) => context
                .resolve(reference.object)
                .map(DerivedHandle::Confined)
                .map_err(|e| BenchError::confinement(Some(reference.object), &e)),
        }
    }

    /// Derive a unit-private handle without any context
    ///
    /// # Errors
    /// `BenchError::ConfinementViolation` for confined handles
    pub fn derive_detached(&self) -> Result<DerivedHandle<'static>, BenchError> {
        match self {
            Self::Plain(value) => Ok(DerivedHandle::Plain(*value)),
            Self::Confined(reference) => Err(BenchError::ConfinementViolation {
                object: Some(reference.object),
                reason: "confined handle touched outside of any context".to_string(),
            }),
        }
    }
}

/// Unit-private handle the kernel accumulates into
#[derive(Debug)]
pub enum DerivedHandle<'ctx> {
    /// Private copy
    Plain(f64),
    /// Handle confined to one context
    Confined(ManagedValue<'ctx>),
}

impl DerivedHandle<'_> {
    /// Current value
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Plain(value) => *value,
            Self::Confined(handle) => handle.get(),
        }
    }
}

impl Accumulator for DerivedHandle<'_> {
    #[inline]
    fn load(&self) -> f64 {
        match self {
            Self::Plain(value) => *value,
            Self::Confined(handle) => handle.get(),
        }
    }

    #[inline]
    fn store(&mut self, value: f64) {
        match self {
            Self::Plain(slot) => *slot = value,
            Self::Confined(handle) => handle.set(value),
        }
    }
}
