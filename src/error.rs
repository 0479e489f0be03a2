//! Errors raised while defining a cache at runtime.
//!
//! Accessing a cache has no error category of its own: loader failures reach
//! the caller untouched.

use crate::identity::CacheIdentity;

/// Misuse detected by [`CacheDefinition::define`](crate::CacheDefinition::define).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
   /// The path was the empty string.
   #[error("cache identity must not be empty")]
   EmptyIdentity,

   /// A `::`-separated segment of the path is not identifier-like.
   #[error("cache identity `{identity}` has an invalid segment `{segment}`")]
   InvalidSegment {
      /// The rejected path.
      identity: &'static str,
      /// The first offending segment.
      segment: &'static str,
   },

   /// The path was claimed by another definition, or an accessor already
   /// started a slot under it.
   #[error("cache identity `{0}` is already defined")]
   DuplicateIdentity(CacheIdentity),
}
