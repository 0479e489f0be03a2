//! Single-value cache slot.
//!
//! This module provides [`SlotState<T>`], the explicit "never computed" versus
//! "computed" distinction, and [`SlotStore<T>`], the shared cell a cache
//! definition reads from and writes to.
//!
//! A `SlotStore` is deliberately *not* a once cell: [`SlotStore::set`] always
//! overwrites, and nothing serializes a read-then-write sequence performed by
//! a caller. Readers and writers only exclude each other for the duration of
//! a clone or a swap.

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;
use core::{fmt, mem};

use crate::identity::CacheIdentity;
use crate::registry;
use crate::state::SlotLock;

/// Contents of a cache slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState<T> {
   /// No value has been stored yet.
   Empty,
   /// A value produced by a loader.
   Filled(T),
}

impl<T> SlotState<T> {
   /// Returns `true` for [`SlotState::Empty`].
   #[inline]
   pub const fn is_empty(&self) -> bool {
      matches!(self, Self::Empty)
   }

   /// Returns `true` for [`SlotState::Filled`].
   #[inline]
   pub const fn is_filled(&self) -> bool {
      matches!(self, Self::Filled(_))
   }

   /// Borrows the contained value.
   #[inline]
   pub const fn as_ref(&self) -> SlotState<&T> {
      match self {
         Self::Empty => SlotState::Empty,
         Self::Filled(value) => SlotState::Filled(value),
      }
   }

   /// Converts into an `Option`, mapping `Empty` to `None`.
   #[inline]
   pub fn into_option(self) -> Option<T> {
      match self {
         Self::Empty => None,
         Self::Filled(value) => Some(value),
      }
   }
}

impl<T> Default for SlotState<T> {
   #[inline]
   fn default() -> Self {
      Self::Empty
   }
}

impl<T> From<Option<T>> for SlotState<T> {
   fn from(value: Option<T>) -> Self {
      match value {
         Some(value) => Self::Filled(value),
         None => Self::Empty,
      }
   }
}

impl<T> From<SlotState<T>> for Option<T> {
   #[inline]
   fn from(state: SlotState<T>) -> Self {
      state.into_option()
   }
}

/// A thread-safe slot holding at most one cached value.
///
/// Stores handed out by [`SlotStore::ensure_started`] are process-wide and
/// live until the process exits. A store can also be owned directly, for
/// instance as a `static`.
///
/// # Example
///
/// ```rust
/// use lazy_slot::{SlotState, SlotStore};
///
/// static SLOT: SlotStore<u32> = SlotStore::new();
///
/// assert_eq!(SLOT.get(), SlotState::Empty);
/// assert_eq!(SLOT.set(7), 7);
/// assert_eq!(SLOT.get(), SlotState::Filled(7));
/// ```
pub struct SlotStore<T> {
   value: UnsafeCell<SlotState<T>>,
   lock: SlotLock,
}

impl<T> SlotStore<T> {
   /// Creates a new, empty store.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: UnsafeCell::new(SlotState::Empty),
         lock: SlotLock::new(),
      }
   }

   /// Creates a store that is already filled with `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         value: UnsafeCell::new(SlotState::Filled(value)),
         lock: SlotLock::filled(),
      }
   }

   /// Checks whether a value has been stored. Never blocks.
   #[inline]
   pub fn is_filled(&self) -> bool {
      self.lock.is_filled(Ordering::Acquire)
   }

   /// Returns a clone of the current contents.
   ///
   /// An empty store is reported without taking the lock.
   #[inline]
   pub fn get(&self) -> SlotState<T>
   where
      T: Clone,
   {
      if !self.is_filled() {
         return SlotState::Empty;
      }
      let guard = self.lock.lock();
      if !guard.was_filled() {
         return SlotState::Empty;
      }
      // SAFETY: We hold the lock, so no writer can touch the value while we clone it.
      unsafe { (*self.value.get()).clone() }
   }

   /// Unconditionally stores `value`, returning it back to the caller.
   ///
   /// Concurrent writers are not ordered: the last `set` to complete wins.
   #[inline]
   pub fn set(&self, value: T) -> T
   where
      T: Clone,
   {
      let previous = self.replace(value.clone());
      drop(previous);
      value
   }

   /// Returns the current contents, leaving the store empty.
   ///
   /// Requires exclusive access (`&mut self`), so it never blocks.
   #[inline]
   pub fn take(&mut self) -> SlotState<T> {
      self.lock.set_filled_mut(false);
      mem::take(self.value.get_mut())
   }

   /// Swaps `value` in under the lock and hands back the previous contents,
   /// so they are dropped outside the critical section.
   #[inline]
   fn replace(&self, value: T) -> SlotState<T> {
      let mut guard = self.lock.lock();
      // SAFETY: We hold the lock, exclusive access to the value.
      let previous = unsafe { mem::replace(&mut *self.value.get(), SlotState::Filled(value)) };
      guard.mark_filled();
      previous
   }
}

#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
impl<T> SlotStore<T> {
   /// Async version of [`SlotStore::get`] that yields instead of parking on contention.
   pub async fn get_async(&self) -> SlotState<T>
   where
      T: Clone,
   {
      if !self.is_filled() {
         return SlotState::Empty;
      }
      let guard = self.lock.lock_async().await;
      if !guard.was_filled() {
         return SlotState::Empty;
      }
      // SAFETY: We hold the lock, so no writer can touch the value while we clone it.
      unsafe { (*self.value.get()).clone() }
   }

   /// Async version of [`SlotStore::set`].
   pub async fn set_async(&self, value: T) -> T
   where
      T: Clone,
   {
      let previous = {
         let mut guard = self.lock.lock_async().await;
         // SAFETY: We hold the lock, exclusive access to the value.
         let previous =
            unsafe { mem::replace(&mut *self.value.get(), SlotState::Filled(value.clone())) };
         guard.mark_filled();
         previous
      };
      drop(previous);
      value
   }
}

impl<T: Send + 'static> SlotStore<T> {
   /// Returns the process-wide store for `identity`, creating it on first use.
   ///
   /// Idempotent: every call with the same identity and value type yields the
   /// same `'static` store.
   #[inline]
   pub fn ensure_started(identity: CacheIdentity) -> &'static Self {
      registry::ensure_started(identity)
   }

   /// Checks whether the process-wide store for `identity` has been created.
   #[inline]
   pub fn is_started(identity: CacheIdentity) -> bool {
      registry::is_started::<T>(identity)
   }
}

// SAFETY:
// Every access to the value through `&SlotStore<T>` happens while holding the
// lock, so like a mutex only `T: Send` is needed for shared access across threads.
unsafe impl<T: Send> Sync for SlotStore<T> {}

impl<T> Default for SlotStore<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T> From<T> for SlotStore<T> {
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T: fmt::Debug> fmt::Debug for SlotStore<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("SlotStore");
      match self.lock.try_lock() {
         Some(_guard) => {
            // SAFETY: We hold the lock for the duration of the formatting.
            d.field(unsafe { &*self.value.get() });
         }
         None => {
            d.field(&format_args!("<locked>"));
         }
      }
      d.finish()
   }
}
