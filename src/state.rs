//! Internal synchronization primitive guarding a cache slot.
//!
//! `SlotLock` is a tiny futex-backed lock packed into a single `AtomicU8`,
//! with waiting implemented via `parking_lot_core`. Unlike a once-cell lock it
//! is only ever held for the duration of a read (clone) or an overwrite of the
//! slot contents, never across a loader invocation, so concurrent first
//! accesses race on the loader instead of serializing behind it.
//!
//! The state word has the following layout:
//! - Bit 0: FILLED - The slot holds a value
//! - Bit 1: LOCKED - The slot contents are being read or written
//! - Bit 2: WAITING - At least one thread is parked on the lock
//! - Bits 3-7: EPOCH - Generation counter, bumped on every unlock
//!
//! FILLED is only changed while LOCKED is held (or through `&mut`), which lets
//! readers observe an empty slot without touching the lock at all.

use core::sync::atomic::{self, AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic state word for a single slot.
#[repr(transparent)]
pub struct SlotLock(AtomicU8);

impl SlotLock {
   /// Bit flag: Slot holds a value.
   const FILLED: u8 = 1;
   /// Bit flag: Slot contents are locked.
   const LOCKED: u8 = 2;
   /// Bit flag: At least one thread is parked waiting for the lock.
   const WAITING: u8 = 4;
   /// Start of epoch bits.
   const EPOCH_1: u8 = 8;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::FILLED | Self::LOCKED | Self::WAITING);

   /// Number of non-blocking attempts `lock_async` makes before blocking.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   const ASYNC_SPINS: usize = 64;

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates the state of an empty, unlocked slot.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Creates the state of a filled, unlocked slot.
   #[inline]
   pub(crate) const fn filled() -> Self {
      Self(AtomicU8::new(Self::FILLED))
   }

   /// Wakes every thread parked on this lock.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: The address passed to unpark must match the address used for park.
      // Both sides use the address of the inner AtomicU8.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread until the state moves away from `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         // The validate closure runs under the bucket lock, so an unlock that
         // lands between our CAS and the park cannot be missed.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(atomic::Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Checks whether the FILLED flag is set.
   #[inline]
   pub(crate) fn is_filled(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::FILLED != 0
   }

   /// Overwrites the FILLED flag through exclusive access.
   #[inline]
   pub(crate) fn set_filled_mut(&mut self, filled: bool) {
      let state = self.0.get_mut();
      *state = (*state & !Self::FILLED) | if filled { Self::FILLED } else { 0 };
   }

   /// One attempt at taking the lock.
   ///
   /// Returns the guard on success, otherwise the state the caller should wait on.
   /// With `nowait` set the WAITING flag is never raised.
   #[inline]
   fn lock_step(&self, nowait: bool) -> Result<SlotGuard<'_>, u8> {
      loop {
         let current_state = self.0.load(Ordering::Relaxed);

         if current_state & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => {
                  return Ok(SlotGuard::new(self, current_state & Self::FILLED != 0));
               }
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && (current_state & Self::WAITING == 0) {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(current_state);
      }
   }

   /// Acquires the lock, parking the thread while another holder finishes.
   #[inline]
   pub(crate) fn lock(&self) -> SlotGuard<'_> {
      let mut observed = match self.lock_step(false) {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step(false) {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }

   /// Acquires the lock without blocking, or returns `None` if it is held.
   #[inline]
   pub(crate) fn try_lock(&self) -> Option<SlotGuard<'_>> {
      self.lock_step(true).ok()
   }

   /// Acquires the lock from async code.
   ///
   /// Yields to the runtime between attempts first. If the lock is still held
   /// afterwards it blocks, via `block_in_place` on a multi-threaded runtime.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> SlotGuard<'_> {
      for _ in 0..Self::ASYNC_SPINS {
         if let Some(guard) = self.try_lock() {
            return guard;
         }
         tokio::task::yield_now().await;
      }

      #[cfg(feature = "async-tokio-mt")]
      {
         use tokio::runtime::{Handle, RuntimeFlavor};
         let multi_thread = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
         if multi_thread {
            return tokio::task::block_in_place(|| self.lock());
         }
      }

      // Critical sections are a clone or a swap, so a short block is acceptable.
      self.lock()
   }

   /// Releases the lock, publishing `filled`, bumping the epoch and waking waiters.
   #[inline]
   fn unlock(&self, filled: bool) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = Self::next_epoch(current_state) | if filled { Self::FILLED } else { 0 };

      // Release pairs with the Acquire in `lock_step` and `is_filled`.
      let prev_state = self.0.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }
}

/// RAII guard for a held `SlotLock`.
///
/// Dropping the guard unlocks, publishing whatever FILLED state the holder left.
pub struct SlotGuard<'a> {
   lock: &'a SlotLock,
   filled: bool,
}

impl<'a> SlotGuard<'a> {
   #[inline(always)]
   const fn new(lock: &'a SlotLock, filled: bool) -> Self {
      Self { lock, filled }
   }

   /// Whether the slot held a value when the lock was taken.
   #[inline(always)]
   pub(crate) const fn was_filled(&self) -> bool {
      self.filled
   }

   /// Marks the slot as holding a value once the guard is released.
   #[inline(always)]
   pub(crate) fn mark_filled(&mut self) {
      self.filled = true;
   }
}

impl Drop for SlotGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.lock.unlock(self.filled);
   }
}
