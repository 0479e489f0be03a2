//! The computation a cache definition memoizes.

/// A zero-argument computation producing the value to cache.
///
/// Loaders may be arbitrarily expensive and are never invoked while any lock
/// is held. Failures are expressed by the loader's own value type (for
/// example `Result<T, E>`) or by panicking; the cache layer stores neither.
///
/// Every `Fn() -> V` closure or function is a loader.
pub trait Loader {
   /// The value produced by [`Loader::load`].
   type Value;

   /// Runs the computation.
   fn load(&self) -> Self::Value;
}

impl<F, V> Loader for F
where
   F: Fn() -> V,
{
   type Value = V;

   #[inline]
   fn load(&self) -> V {
      self()
   }
}
