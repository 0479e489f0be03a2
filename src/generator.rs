//! Macros generating cached accessors from a loader body.
//!
//! Each definition expands to two items with the same name: the accessor
//! function callers use, and a module of the same name holding the pieces the
//! accessor is built from:
//!
//! - `load()`: the loader body, callable directly.
//! - `access()`: the lazy accessor (the generated function forwards to it).
//! - `IDENTITY`: the [`CacheIdentity`](crate::CacheIdentity), the module's
//!   own `module_path!()` tied to a marker type private to the unit. Units of
//!   the same name declared in different function bodies share a path but
//!   not an identity.
//! - a private `DEFINITION` static binding the two to the identity's slot.
//!
//! The module glob-imports its parent, so the loader body and the value type
//! resolve the same way they would next to the accessor. Types declared inside
//! a function body are not visible to it.

/// Defines cached accessors.
///
/// Every `fn name() -> Type { body }` expands to a parameterless `name()`
/// returning the cached `Type`. `body` runs on the first access and again only
/// if concurrent first accesses race; see
/// [`CacheDefinition`](crate::CacheDefinition) for the exact guarantees.
/// `Type` must be `Clone + Send + 'static`.
///
/// `async fn` definitions produce an async accessor. They need one of the
/// `async-tokio` features and a `Send` loader future.
///
/// # Example
///
/// ```rust
/// lazy_slot::define_cache! {
///    /// Specialties offered by the clinic.
///    pub fn specialties() -> Vec<&'static str> {
///       vec!["Specialty One", "Specialty Two"]
///    }
/// }
///
/// fn main() {
///    assert_eq!(specialties(), ["Specialty One", "Specialty Two"]);
///    assert_eq!(specialties::load(), specialties());
///    assert!(specialties::IDENTITY.as_str().ends_with("::specialties"));
///    assert!(specialties::IDENTITY.is_marked());
/// }
/// ```
///
/// A definition without a loader body is rejected at compile time:
///
/// ```compile_fail
/// lazy_slot::define_cache! {
///    pub fn specialties() -> Vec<&'static str>;
/// }
/// ```
///
/// So is an accessor taking parameters:
///
/// ```compile_fail
/// lazy_slot::define_cache! {
///    pub fn specialty(index: usize) -> &'static str {
///       ["Specialty One", "Specialty Two"][index]
///    }
/// }
/// ```
#[macro_export]
macro_rules! define_cache {
   () => {};

   (
      $(#[$attr:meta])*
      $vis:vis $(async)? fn $name:ident ( $($param:tt)+ ) $($rest:tt)*
   ) => {
      ::core::compile_error!(::core::concat!(
         "cached accessor `",
         ::core::stringify!($name),
         "` must not take parameters"
      ));
   };

   (
      $(#[$attr:meta])*
      $vis:vis async fn $name:ident () -> $ty:ty $body:block
      $($rest:tt)*
   ) => {
      $(#[$attr])*
      $vis async fn $name() -> $ty {
         $name::access().await
      }

      #[doc = ::core::concat!("Cache unit behind `", ::core::stringify!($name), "()`.")]
      $vis mod $name {
         #[allow(unused_imports)]
         use super::*;

         #[allow(dead_code)]
         struct __CacheMarker;

         /// Identity of the slot this unit caches into.
         pub const IDENTITY: $crate::CacheIdentity =
            $crate::CacheIdentity::with_marker::<__CacheMarker>(::core::module_path!());

         /// Runs the loader body, bypassing the cache.
         pub async fn load() -> $ty $body

         /// Returns the cached value, running `load` on a miss.
         pub async fn access() -> $ty {
            DEFINITION.access_async().await
         }

         fn boxed_load() -> $crate::__private::BoxFuture<$ty> {
            ::std::boxed::Box::pin(load())
         }

         static DEFINITION: $crate::CacheDefinition<$ty, fn() -> $crate::__private::BoxFuture<$ty>> =
            $crate::CacheDefinition::new(IDENTITY, boxed_load as fn() -> $crate::__private::BoxFuture<$ty>);
      }

      $crate::define_cache! { $($rest)* }
   };

   (
      $(#[$attr:meta])*
      $vis:vis fn $name:ident () -> $ty:ty $body:block
      $($rest:tt)*
   ) => {
      $(#[$attr])*
      $vis fn $name() -> $ty {
         $name::access()
      }

      #[doc = ::core::concat!("Cache unit behind `", ::core::stringify!($name), "()`.")]
      $vis mod $name {
         #[allow(unused_imports)]
         use super::*;

         #[allow(dead_code)]
         struct __CacheMarker;

         /// Identity of the slot this unit caches into.
         pub const IDENTITY: $crate::CacheIdentity =
            $crate::CacheIdentity::with_marker::<__CacheMarker>(::core::module_path!());

         /// Runs the loader body, bypassing the cache.
         pub fn load() -> $ty $body

         /// Returns the cached value, running `load` on a miss.
         pub fn access() -> $ty {
            DEFINITION.access()
         }

         static DEFINITION: $crate::CacheDefinition<$ty, fn() -> $ty> =
            $crate::CacheDefinition::new(IDENTITY, load as fn() -> $ty);
      }

      $crate::define_cache! { $($rest)* }
   };

   (
      $(#[$attr:meta])*
      $vis:vis $(async)? fn $name:ident () -> $ty:ty ; $($rest:tt)*
   ) => {
      ::core::compile_error!(::core::concat!(
         "cached accessor `",
         ::core::stringify!($name),
         "` is missing a loader body"
      ));
   };

   (
      $(#[$attr:meta])*
      $vis:vis $(async)? fn $name:ident () $($rest:tt)*
   ) => {
      ::core::compile_error!(::core::concat!(
         "cached accessor `",
         ::core::stringify!($name),
         "` must declare the type of the cached value"
      ));
   };

   ($($tokens:tt)+) => {
      ::core::compile_error!("expected `fn name() -> Type { loader body }`");
   };
}

/// Defines cached accessors whose loader can fail.
///
/// Every `fn name() -> Result<T, E> { body }` expands to a parameterless
/// `name()` returning `Result<T, E>`. Only `Ok` values are cached: an `Err` is
/// returned to the caller and the next call runs the loader again. The module
/// generated next to the accessor mirrors the one [`define_cache!`] emits.
///
/// # Example
///
/// ```rust
/// use std::num::ParseIntError;
///
/// lazy_slot::define_try_cache! {
///    fn port() -> Result<u16, ParseIntError> {
///       "8080".parse()
///    }
/// }
///
/// fn main() {
///    assert_eq!(port(), Ok(8080));
/// }
/// ```
///
/// The return type must be spelled `Result<T, E>`:
///
/// ```compile_fail
/// lazy_slot::define_try_cache! {
///    fn port() -> u16 {
///       8080
///    }
/// }
/// ```
#[macro_export]
macro_rules! define_try_cache {
   () => {};

   (
      $(#[$attr:meta])*
      $vis:vis fn $name:ident () -> Result<$ty:ty, $err:ty> $body:block
      $($rest:tt)*
   ) => {
      $(#[$attr])*
      $vis fn $name() -> ::core::result::Result<$ty, $err> {
         $name::access()
      }

      #[doc = ::core::concat!("Cache unit behind `", ::core::stringify!($name), "()`.")]
      $vis mod $name {
         #[allow(unused_imports)]
         use super::*;

         #[allow(dead_code)]
         struct __CacheMarker;

         /// Identity of the slot this unit caches into.
         pub const IDENTITY: $crate::CacheIdentity =
            $crate::CacheIdentity::with_marker::<__CacheMarker>(::core::module_path!());

         /// Runs the loader body, bypassing the cache.
         pub fn load() -> ::core::result::Result<$ty, $err> $body

         /// Returns the cached value, running `load` on a miss.
         pub fn access() -> ::core::result::Result<$ty, $err> {
            DEFINITION.try_access()
         }

         static DEFINITION: $crate::CacheDefinition<$ty, fn() -> ::core::result::Result<$ty, $err>> =
            $crate::CacheDefinition::new(IDENTITY, load as fn() -> ::core::result::Result<$ty, $err>);
      }

      $crate::define_try_cache! { $($rest)* }
   };

   (
      $(#[$attr:meta])*
      $vis:vis fn $name:ident () -> Result<$ty:ty, $err:ty> ; $($rest:tt)*
   ) => {
      ::core::compile_error!(::core::concat!(
         "cached accessor `",
         ::core::stringify!($name),
         "` is missing a loader body"
      ));
   };

   ($($tokens:tt)+) => {
      ::core::compile_error!("expected `fn name() -> Result<T, E> { loader body }`");
   };
}
