/*!
Platform abstraction traits.

These traits define the contract between core code and platform implementations.
Core code only uses these traits - never backend-specific types directly.
*/

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::options::Threshold;
use crate::types::{VisibilityEntry, VisibilityResult};

/// Construction options for one platform primitive.
///
/// `root` is `None` for the platform's default viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverInit<H> {
  /// Explicit root element.
  pub root: Option<H>,
  /// Canonical four-value margin.
  pub root_margin: String,
  /// Threshold(s) the primitive reports at.
  pub threshold: Threshold,
}

/// Element identity. Clone must be cheap and keep identity (`Eq` + `Hash`).
///
/// Blanket-implemented; any suitable handle type qualifies.
pub trait PlatformHandle: Clone + Debug + Send + Sync + Hash + Eq + 'static {}

impl<T> PlatformHandle for T where T: Clone + Debug + Send + Sync + Hash + Eq + 'static {}

/// Receives batches of visibility changes from a platform primitive.
pub trait EntryHandler: Send + Sync + 'static {
  /// The handle type for this platform.
  type Handle: PlatformHandle;

  /// Called once per delivered batch, entries in platform order.
  fn on_entries(&self, entries: &[VisibilityEntry<Self::Handle>]);
}

/// Platform-global operations.
pub trait Platform: Send + Sync + 'static {
  /// Element handle type for this platform.
  type Handle: PlatformHandle;
  /// Observation primitive for this platform.
  type Observer: PlatformObserver<Handle = Self::Handle>;

  /// Construct one observation primitive bound to `init`.
  ///
  /// The primitive reports every change for its watched targets to `handler`.
  /// Construction must not deliver synchronously.
  fn create_observer<C: EntryHandler<Handle = Self::Handle>>(
    &self,
    init: &ObserverInit<Self::Handle>,
    handler: Arc<C>,
  ) -> VisibilityResult<Self::Observer>;
}

/// A single observation primitive. Watches any number of targets.
pub trait PlatformObserver: Send + Sync + 'static {
  /// Element handle type for this platform.
  type Handle: PlatformHandle;

  /// Start reporting changes for `target`. Watching twice is a no-op.
  fn observe(&self, target: &Self::Handle) -> VisibilityResult<()>;

  /// Stop reporting changes for `target`. Unknown targets are ignored.
  fn unobserve(&self, target: &Self::Handle);

  /// Stop reporting changes for every target.
  fn disconnect(&self);
}
