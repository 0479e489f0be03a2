//! Keys naming cache slots.

use core::any::TypeId;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::error::DefinitionError;

/// Key of one cache slot.
///
/// An identity is a `::`-separated path, optionally tied to a marker type.
/// Identities built from a bare path with [`CacheIdentity::new`] or
/// [`CacheIdentity::parse`] are equal whenever their paths are.
///
/// `module_path!()` does not see function scopes, so generated units also
/// carry a marker type declared inside the unit with
/// [`CacheIdentity::with_marker`]. Two generated units never share an
/// identity, even when they have the same path, and none of them equals a
/// bare-path identity.
#[derive(Clone, Copy)]
pub struct CacheIdentity {
   path: &'static str,
   marker: Option<fn() -> TypeId>,
}

impl CacheIdentity {
   /// Path separator between namespace segments.
   pub const SEPARATOR: &'static str = "::";

   /// Creates an identity from `path` without validating it.
   #[inline]
   #[must_use]
   pub const fn new(path: &'static str) -> Self {
      Self { path, marker: None }
   }

   /// Creates an identity from `path` that only equals identities with the
   /// same path and the same marker type `M`.
   #[inline]
   #[must_use]
   pub const fn with_marker<M: ?Sized + 'static>(path: &'static str) -> Self {
      Self {
         path,
         marker: Some(TypeId::of::<M>),
      }
   }

   /// Creates an identity from `path`, rejecting empty paths and segments
   /// that are not identifier-like (`[A-Za-z_][A-Za-z0-9_]*`).
   pub fn parse(path: &'static str) -> Result<Self, DefinitionError> {
      if path.is_empty() {
         return Err(DefinitionError::EmptyIdentity);
      }
      if let Some(segment) = path.split(Self::SEPARATOR).find(|s| !is_identifier(s)) {
         return Err(DefinitionError::InvalidSegment {
            identity: path,
            segment,
         });
      }
      Ok(Self::new(path))
   }

   /// Returns the full path.
   #[inline]
   pub const fn as_str(&self) -> &'static str {
      self.path
   }

   /// Checks whether this identity is tied to a marker type.
   #[inline]
   pub const fn is_marked(&self) -> bool {
      self.marker.is_some()
   }

   /// Returns the last path segment.
   pub fn name(&self) -> &'static str {
      match self.path.rsplit_once(Self::SEPARATOR) {
         Some((_, name)) => name,
         None => self.path,
      }
   }

   /// Returns everything before the last path segment, if there is anything.
   pub fn namespace(&self) -> Option<&'static str> {
      self.path.rsplit_once(Self::SEPARATOR).map(|(namespace, _)| namespace)
   }

   /// Function pointers are not unique per function, the `TypeId` they return is.
   #[inline]
   fn marker_id(&self) -> Option<TypeId> {
      self.marker.map(|type_id| type_id())
   }
}

fn is_identifier(segment: &str) -> bool {
   let mut chars = segment.chars();
   match chars.next() {
      Some(first) if first == '_' || first.is_ascii_alphabetic() => {
         chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
      }
      _ => false,
   }
}

impl PartialEq for CacheIdentity {
   fn eq(&self, other: &Self) -> bool {
      self.path == other.path && self.marker_id() == other.marker_id()
   }
}

impl Eq for CacheIdentity {}

impl Hash for CacheIdentity {
   fn hash<H: Hasher>(&self, state: &mut H) {
      self.path.hash(state);
      self.marker_id().hash(state);
   }
}

impl PartialOrd for CacheIdentity {
   fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
      Some(self.cmp(other))
   }
}

impl Ord for CacheIdentity {
   fn cmp(&self, other: &Self) -> Ordering {
      self.path
         .cmp(other.path)
         .then_with(|| self.marker_id().cmp(&other.marker_id()))
   }
}

impl fmt::Debug for CacheIdentity {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("CacheIdentity").field(&self.path).finish()
   }
}

impl fmt::Display for CacheIdentity {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.path)
   }
}

impl AsRef<str> for CacheIdentity {
   #[inline]
   fn as_ref(&self) -> &str {
      self.path
   }
}
