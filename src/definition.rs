//! A loader bound to its cache slot.
//!
//! [`CacheDefinition`] is what the generator macros emit for every cached
//! accessor, and what runtime code builds with [`CacheDefinition::define`].
//! It pairs a [`CacheIdentity`] with a [`Loader`] and implements the lazy
//! read-or-compute path on top of the identity's process-wide [`SlotStore`].
//!
//! # Concurrency
//!
//! The check for a cached value and the store of a freshly loaded one are two
//! separate steps with no lock between them. When several threads access an
//! empty slot at the same time each of them may run the loader; every one of
//! them stores its result and the last store to complete is what later
//! accesses observe. Once the slot is filled and no first access is still in
//! flight, the loader is never run again. Loaders are therefore expected to be
//! deterministic.

use core::fmt;
use std::sync::OnceLock;

use tracing::{debug, trace};

use crate::error::DefinitionError;
use crate::identity::CacheIdentity;
use crate::loader::Loader;
use crate::registry;
use crate::slot::{SlotState, SlotStore};

/// A cached accessor: one identity, one loader, one slot.
///
/// # Example
///
/// ```rust
/// use lazy_slot::CacheDefinition;
///
/// let specialties = CacheDefinition::define("docs::specialties", || {
///    vec!["Specialty One", "Specialty Two"]
/// })
/// .unwrap();
///
/// assert_eq!(specialties.access(), ["Specialty One", "Specialty Two"]);
/// ```
pub struct CacheDefinition<T: 'static, L> {
   identity: CacheIdentity,
   loader: L,
   /// The registry's store for `identity`, looked up once.
   store: OnceLock<&'static SlotStore<T>>,
}

impl<T: 'static, L> CacheDefinition<T, L> {
   /// Binds `loader` to `identity` without claiming it.
   ///
   /// Definitions built from the same identity share one slot. The generator
   /// macros give every unit an identity tied to a marker type of its own.
   #[inline]
   #[must_use]
   pub const fn new(identity: CacheIdentity, loader: L) -> Self {
      Self {
         identity,
         loader,
         store: OnceLock::new(),
      }
   }

   /// Returns the identity of this definition.
   #[inline]
   pub const fn identity(&self) -> CacheIdentity {
      self.identity
   }

   /// Runs the loader directly, bypassing the cache.
   #[inline]
   pub fn load(&self) -> L::Value
   where
      L: Loader,
   {
      self.loader.load()
   }
}

impl<T: Send + 'static, L> CacheDefinition<T, L> {
   /// Validates `path` and claims it as the identity of a new definition.
   ///
   /// Fails if `path` is malformed, was already defined, or already has a
   /// started slot in this process, including one started by a generated
   /// accessor. Generated accessors never share a slot with a runtime
   /// definition, whatever the order of first use.
   pub fn define(path: &'static str, loader: L) -> Result<Self, DefinitionError> {
      let identity = CacheIdentity::parse(path)?;
      if !registry::claim(identity) {
         return Err(DefinitionError::DuplicateIdentity(identity));
      }
      debug!(identity = %identity, "defined cache");
      Ok(Self::new(identity, loader))
   }

   /// Returns the slot of this definition, starting it if needed.
   #[inline]
   pub fn store(&self) -> &'static SlotStore<T> {
      *self.store.get_or_init(|| SlotStore::ensure_started(self.identity))
   }

   /// Returns the cached value without running the loader.
   #[inline]
   pub fn cached(&self) -> SlotState<T>
   where
      T: Clone,
   {
      self.store().get()
   }

   /// Returns the cached value, running the loader and storing its result on a miss.
   ///
   /// A panicking loader leaves the slot as it was.
   pub fn access(&self) -> T
   where
      T: Clone,
      L: Loader<Value = T>,
   {
      let store = self.store();
      if let SlotState::Filled(value) = store.get() {
         trace!(identity = %self.identity, "cache hit");
         return value;
      }
      self.fill(store)
   }

   /// Like [`CacheDefinition::access`] for loaders returning `Result`.
   ///
   /// Only `Ok` values are stored. An `Err` is handed to the caller and the
   /// next access runs the loader again.
   pub fn try_access<E>(&self) -> Result<T, E>
   where
      T: Clone,
      L: Loader<Value = Result<T, E>>,
   {
      let store = self.store();
      if let SlotState::Filled(value) = store.get() {
         trace!(identity = %self.identity, "cache hit");
         return Ok(value);
      }
      self.try_fill(store)
   }

   /// Cold path for `access`.
   #[cold]
   fn fill(&self, store: &'static SlotStore<T>) -> T
   where
      T: Clone,
      L: Loader<Value = T>,
   {
      debug!(identity = %self.identity, "cache miss, running loader");
      store.set(self.loader.load())
   }

   /// Cold path for `try_access`.
   #[cold]
   fn try_fill<E>(&self, store: &'static SlotStore<T>) -> Result<T, E>
   where
      T: Clone,
      L: Loader<Value = Result<T, E>>,
   {
      debug!(identity = %self.identity, "cache miss, running loader");
      match self.loader.load() {
         Ok(value) => Ok(store.set(value)),
         Err(err) => {
            debug!(identity = %self.identity, "loader failed, slot left empty");
            Err(err)
         }
      }
   }
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
impl<T: Send + 'static, L> CacheDefinition<T, L> {
   /// Async version of [`CacheDefinition::access`] for loaders returning a future.
   pub async fn access_async<Fut>(&self) -> T
   where
      T: Clone,
      L: Loader<Value = Fut>,
      Fut: core::future::Future<Output = T>,
   {
      let store = self.store();
      if let SlotState::Filled(value) = store.get_async().await {
         trace!(identity = %self.identity, "cache hit");
         return value;
      }
      debug!(identity = %self.identity, "cache miss, running loader");
      let value = self.loader.load().await;
      store.set_async(value).await
   }
}

impl<T: 'static, L> fmt::Debug for CacheDefinition<T, L> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("CacheDefinition")
         .field("identity", &self.identity)
         .finish_non_exhaustive()
   }
}
