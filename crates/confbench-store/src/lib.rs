//! confbench Store
//!
//! A minimal in-memory stand-in for a managed-object persistence layer:
//! - [`Store`]: shared, thread-safe owner of the saved records
//! - [`StoreContext`]: thread-confined scratch space descending from a store
//! - [`ManagedValue`]: handle to one object, valid only inside its context
//! - [`ObjectId`]: the only piece of identity that may cross threads
//!
//! # Example
//!
//! ```rust
//! use confbench_store::Store;
//!
//! let store = Store::new();
//! let record = store.insert(0.37).unwrap();
//! let object = store.object_id(record);
//!
//! let context = store.new_context().unwrap();
//! let value = context.perform_and_wait(|ctx| {
//!     let handle = ctx.resolve(object).unwrap();
//!     handle.set(handle.get() * 2.0);
//!     handle.get()
//! });
//!
//! assert_eq!(value, 0.74);
//! assert_eq!(store.value(record).unwrap(), 0.37);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod context;
mod error;
mod store;
mod types;

pub use context::{ManagedValue, StoreContext};
pub use error::StoreError;
pub use store::{Store, WeakStore};
pub use types::{ContextId, ObjectId, RecordId, StoreId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
