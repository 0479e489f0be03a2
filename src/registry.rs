//! Process-wide table of cache slots.
//!
//! Maps each [`CacheIdentity`] to its [`SlotStore`], creating stores on first
//! use. Stores are leaked: they live as long as the process and are never
//! removed. Entries are keyed by identity *and* value type, so two callers
//! can never observe the same memory through different types.
//!
//! Lookups of existing stores only take the read side of the table lock.
//! Callers that keep the returned reference never come back here.

use core::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

use parking_lot::{const_rwlock, RwLock};
use tracing::debug;

use crate::identity::CacheIdentity;
use crate::slot::SlotStore;

type SlotKey = (CacheIdentity, TypeId);
type ErasedStore = &'static (dyn Any + Send + Sync);

#[derive(Default)]
struct Tables {
   slots: HashMap<SlotKey, ErasedStore>,
   /// Paths claimed by a runtime definition or started by any accessor.
   known: HashSet<&'static str>,
}

/// Created lazily, `HashMap::new` is not `const`.
static REGISTRY: RwLock<Option<Tables>> = const_rwlock(None);

/// Returns the store for `identity`, creating it if absent.
pub(crate) fn ensure_started<T: Send + 'static>(identity: CacheIdentity) -> &'static SlotStore<T> {
   let key = (identity, TypeId::of::<T>());
   let found = REGISTRY.read().as_ref().and_then(|tables| tables.slots.get(&key).copied());
   let entry = match found {
      Some(entry) => entry,
      None => start::<T>(key),
   };

   match entry.downcast_ref::<SlotStore<T>>() {
      Some(store) => store,
      None => unreachable!("slot keys carry the TypeId of the stored value"),
   }
}

/// Slow path of `ensure_started`. Another thread may have inserted the store
/// between dropping the read lock and taking the write lock.
#[cold]
fn start<T: Send + 'static>(key: SlotKey) -> ErasedStore {
   let mut tables = REGISTRY.write();
   let tables = tables.get_or_insert_with(Tables::default);
   tables.known.insert(key.0.as_str());
   *tables.slots.entry(key).or_insert_with(|| {
      debug!(identity = %key.0, "started slot store");
      let store: ErasedStore = Box::leak(Box::new(SlotStore::<T>::new()));
      store
   })
}

/// Checks whether a store of type `T` exists for `identity`.
pub(crate) fn is_started<T: 'static>(identity: CacheIdentity) -> bool {
   REGISTRY
      .read()
      .as_ref()
      .is_some_and(|tables| tables.slots.contains_key(&(identity, TypeId::of::<T>())))
}

/// Reserves the path of `identity` for a single runtime definition.
///
/// Returns `false` if the path was claimed before, or if an accessor already
/// started a store under it.
pub(crate) fn claim(identity: CacheIdentity) -> bool {
   REGISTRY
      .write()
      .get_or_insert_with(Tables::default)
      .known
      .insert(identity.as_str())
}
