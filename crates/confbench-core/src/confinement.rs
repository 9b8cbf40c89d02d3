//! Confinement derivation
//!
//! Gives one unit of work its own context and its own handle. Called once
//! per unit; the context is created on the unit's thread, the work runs
//! synchronously inside it, and the context is dropped (edits discarded)
//! before the unit returns. Nothing derived here can leave the closure.

use crate::error::BenchError;
use crate::handle::{ConfinedRef, DerivedHandle, ResourceHandle};
use confbench_store::StoreContext;

/// Create a fresh context descending from the reference's owning store
///
/// # Errors
/// `BenchError::ConfinementViolation` if the owning store was dropped or
/// closed
pub fn open_context(reference: &ConfinedRef) -> Result<StoreContext, BenchError> {
    reference
        .owner()?
        .new_context()
        .map_err(|e| BenchError::confinement(Some(reference.object()), &e))
}

/// Derive `handle` inside `context`
///
/// # Errors
/// `BenchError::ConfinementViolation` if the record cannot be located there
#[inline]
pub fn derive_confined<'ctx>(
    handle: &ResourceHandle,
    context: &'ctx StoreContext,
) -> Result<DerivedHandle<'ctx>, BenchError> {
    handle.derive_for_context(context)
}

/// Run `work` against a unit-private derivation of `handle`
///
/// Plain handles get a private copy and no context. Confined handles get a
/// new context, a handle resolved inside it, and `work` runs inside the
/// context's `perform_and_wait`.
///
/// # Errors
/// `BenchError::ConfinementViolation` if derivation fails; `work` is not
/// called in that case
pub fn with_confined<R>(
    handle: &ResourceHandle,
    work: impl FnOnce(&mut DerivedHandle<'_>) -> R,
) -> Result<R, BenchError> {
    match handle {
        ResourceHandle::Plain(_) => {
            let mut derived = handle.derive_detached()?;
            Ok(work(&mut derived))
        }
        ResourceHandle::Confined(reference) => {
            let context = open_context(reference)?;
            let result = context.perform_and_wait(|ctx| -> Result<R, BenchError> {
                let mut derived = derive_confined(handle, ctx)?;
                Ok(work(&mut derived))
            });
            tracing::trace!(
                context = %context.id(),
                writes = context.write_count(),
                "context discarded"
            );
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{leibniz_pi, leibniz_pi_plain};
    use crate::work_item::WorkItem;
    use confbench_store::Store;

    #[test]
    fn each_call_gets_a_new_context() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let handle = WorkItem::fetch(&store, record)
            .unwrap()
            .confined_handle()
            .unwrap();

        for _ in 0..3 {
            let value = with_confined(&handle, |acc| leibniz_pi(acc, 100)).unwrap();
            assert_eq!(value, leibniz_pi_plain(100));
        }

        assert_eq!(store.contexts_created(), 3);
        assert_eq!(store.value(record).unwrap(), 0.37);
    }

    #[test]
    fn plain_handles_need_no_context() {
        let handle = WorkItem::synthetic(0.37).plain_handle();
        let value = with_confined(&handle, |acc| leibniz_pi(acc, 10)).unwrap();
        assert_eq!(value, leibniz_pi_plain(10));
    }

    #[test]
    fn unreachable_owner_fails_before_work_runs() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let handle = WorkItem::fetch(&store, record)
            .unwrap()
            .confined_handle()
            .unwrap();
        drop(store);

        let mut ran = false;
        let err = with_confined(&handle, |_| ran = true).unwrap_err();
        assert!(err.is_confinement_violation());
        assert!(!ran);
    }

    #[test]
    fn removed_record_fails_derivation() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let handle = WorkItem::fetch(&store, record)
            .unwrap()
            .confined_handle()
            .unwrap();
        store.remove(record).unwrap();

        let err = with_confined(&handle, |acc| leibniz_pi(acc, 10)).unwrap_err();
        assert!(err.is_confinement_violation());
        // the context was still created before resolution failed
        assert_eq!(store.contexts_created(), 1);
    }

    #[test]
    fn open_context_on_closed_store() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let item = WorkItem::fetch(&store, record).unwrap();
        store.close();

        let ResourceHandle::Confined(reference) = item.confined_handle().unwrap() else {
            panic!("expected confined handle");
        };
        assert!(open_context(&reference).unwrap_err().is_confinement_violation());
    }
}
