//! Lazily filled, process-wide cache slots and accessor generators.
//!
//! The crate turns a single "how to compute the value" expression into a
//! parameterless cached accessor:
//!
//! - [`define_cache!`] / [`define_try_cache!`]: generate an accessor, its
//!   loader and its slot binding from a name and a loader body.
//! - [`CacheDefinition<T, L>`]: the same binding built at runtime from a
//!   path and a [`Loader`].
//! - [`SlotStore<T>`]: the cell behind every definition, holding
//!   [`SlotState::Empty`] or [`SlotState::Filled`].
//!
//! Slots are keyed by [`CacheIdentity`] in a process-wide table and created on
//! first access. They are never evicted.
//!
//! # Concurrency
//!
//! Accessing a slot is synchronous and does not serialize loaders: if several
//! threads hit an empty slot at once, each may run the loader and the last one
//! to store its result wins. After that every access returns the stored value.
//! Only exactly-once *convergence* is guaranteed, not exactly-once execution.
//! Loader failures (an `Err` from a fallible loader, or a panic) are never
//! cached.
//!
//! # Examples
//!
//! ## Generated accessor
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! static LOADS: AtomicUsize = AtomicUsize::new(0);
//!
//! lazy_slot::define_cache! {
//!    pub fn specialties() -> Vec<String> {
//!       LOADS.fetch_add(1, Ordering::SeqCst);
//!       vec!["Specialty Three".into(), "Specialty Four".into()]
//!    }
//! }
//!
//! fn main() {
//!    assert_eq!(specialties(), ["Specialty Three", "Specialty Four"]);
//!    assert_eq!(specialties(), ["Specialty Three", "Specialty Four"]);
//!    assert_eq!(LOADS.load(Ordering::SeqCst), 1);
//! }
//! ```
//!
//! ## Runtime definition
//!
//! ```rust
//! use lazy_slot::{CacheDefinition, SlotState};
//!
//! let answer: CacheDefinition<u64, _> = CacheDefinition::define("docs::answer", || 42).unwrap();
//!
//! assert_eq!(answer.cached(), SlotState::Empty);
//! assert_eq!(answer.access(), 42);
//! assert_eq!(answer.cached(), SlotState::Filled(42));
//! ```

/// Loader bound to a slot; the lazy accessor.
mod definition;

/// Runtime definition errors.
mod error;

/// Accessor generator macros.
mod generator;

/// Slot keys.
mod identity;

/// Loader trait.
mod loader;

/// Process-wide identity to slot table.
mod registry;

/// Single-value slot store.
mod slot;

/// Internal synchronization state management.
mod state;

pub use definition::CacheDefinition;
pub use error::DefinitionError;
pub use identity::CacheIdentity;
pub use loader::Loader;
pub use slot::{SlotState, SlotStore};

#[doc(hidden)]
pub mod __private {
   use core::future::Future;
   use core::pin::Pin;

   /// Loader future type used by generated async accessors.
   pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
}
