/*!
Caller callbacks with identity.

A registration is keyed by `(root, target, callback)`, so callbacks need a
stable identity. `Callback` compares and hashes by the address of its shared
allocation: clones are the same callback, two separately created callbacks
never are, even if they wrap identical closures.
*/

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::VisibilityEntry;

/// Listener invoked by a pooled observer for each delivered entry.
pub(crate) type Listener<H> = Arc<dyn Fn(&VisibilityEntry<H>) + Send + Sync>;

/// A visibility callback. Clone is cheap and preserves identity.
pub struct Callback<H>(Listener<H>);

impl<H: 'static> Callback<H> {
  /// Wrap a closure as a new callback with its own identity.
  pub fn new(f: impl Fn(&VisibilityEntry<H>) + Send + Sync + 'static) -> Self {
    Self(Arc::new(f))
  }

  /// Invoke the callback.
  pub fn call(&self, entry: &VisibilityEntry<H>) {
    (self.0)(entry);
  }

  /// The callback as a pooled-observer listener (no wrapping).
  pub(crate) fn listener(&self) -> Listener<H> {
    Arc::clone(&self.0)
  }
}

impl<H> Callback<H> {
  fn addr(&self) -> usize {
    Arc::as_ptr(&self.0).cast::<()>() as usize
  }
}

impl<H> Clone for Callback<H> {
  fn clone(&self) -> Self {
    Self(Arc::clone(&self.0))
  }
}

impl<H> PartialEq for Callback<H> {
  fn eq(&self, other: &Self) -> bool {
    self.addr() == other.addr()
  }
}

impl<H> Eq for Callback<H> {}

impl<H> Hash for Callback<H> {
  fn hash<S: Hasher>(&self, state: &mut S) {
    self.addr().hash(state);
  }
}

impl<H> fmt::Debug for Callback<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Callback({:#x})", self.addr())
  }
}
