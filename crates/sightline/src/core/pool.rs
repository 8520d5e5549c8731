/*!
Observer pool: `root -> signature -> pooled observer`.

Registrations whose normalized options share a signature (within one root)
share one platform primitive, so N callers produce one primitive and one
platform dispatch per visibility change. Pooled observers live as long as the
owning `Visibility`; there is no eviction.
*/

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use super::dispatch::Dispatcher;
use super::get_or_insert_with;
use crate::callback::Listener;
use crate::options::Signature;
use crate::platform::{Platform, PlatformObserver};
use crate::types::{ListenerId, ObserverId, Root, VisibilityResult};

pub(crate) struct ObserverPool<H, O> {
  roots: HashMap<Root<H>, HashMap<Signature, Arc<O>>>,
}

impl<H: Clone + Eq + Hash, O> ObserverPool<H, O> {
  pub(crate) fn new() -> Self {
    Self {
      roots: HashMap::new(),
    }
  }

  pub(crate) fn get(&self, root: &Root<H>, signature: &Signature) -> Option<Arc<O>> {
    self.roots.get(root)?.get(signature).cloned()
  }

  /// Store `observer` unless the key is taken. Returns the pooled instance.
  pub(crate) fn insert(&mut self, root: &Root<H>, signature: Signature, observer: Arc<O>) -> Arc<O> {
    let signatures = get_or_insert_with(&mut self.roots, root.clone(), HashMap::new);
    Arc::clone(get_or_insert_with(signatures, signature, || observer))
  }

  /// Number of pooled observers across all roots.
  pub(crate) fn len(&self) -> usize {
    self.roots.values().map(HashMap::len).sum()
  }
}

/// One platform primitive shared by every registration with the same
/// `(root, signature)`. Disconnects the primitive on drop.
pub(crate) struct PooledObserver<P: Platform> {
  id: ObserverId,
  signature: Signature,
  dispatcher: Arc<Dispatcher<P::Handle>>,
  primitive: P::Observer,
}

impl<P: Platform> PooledObserver<P> {
  /// Wrap a freshly constructed primitive and the dispatcher it reports to.
  pub(crate) const fn new(
    id: ObserverId,
    signature: Signature,
    dispatcher: Arc<Dispatcher<P::Handle>>,
    primitive: P::Observer,
  ) -> Self {
    Self {
      id,
      signature,
      dispatcher,
      primitive,
    }
  }

  pub(crate) const fn id(&self) -> ObserverId {
    self.id
  }

  /// Add a listener for `target`, starting to watch it if it is new.
  ///
  /// If the primitive refuses the target the listener is rolled back.
  pub(crate) fn watch(
    self: &Arc<Self>,
    target: &P::Handle,
    listener: Listener<P::Handle>,
  ) -> VisibilityResult<WatchHandle<P>> {
    let (listener_id, first) = self.dispatcher.add(target.clone(), listener);

    if first {
      if let Err(e) = self.primitive.observe(target) {
        log::warn!("Observer {} failed to watch {target:?}: {e}", self.id);
        self.dispatcher.remove(target, listener_id);
        return Err(e);
      }
    }

    Ok(WatchHandle {
      observer: Arc::clone(self),
      target: target.clone(),
      listener: listener_id,
    })
  }

  /// Remove one listener, releasing the target from the primitive if it was
  /// the last one. Unknown listeners are ignored.
  fn unwatch(&self, target: &P::Handle, listener: ListenerId) {
    if self.dispatcher.remove(target, listener) == Some(true) {
      self.primitive.unobserve(target);
      log::debug!("Observer {} released {target:?}", self.id);
    }
  }

  /// Number of listeners for `target` on this observer.
  #[cfg(test)]
  pub(crate) fn listener_count(&self, target: &P::Handle) -> usize {
    self.dispatcher.listener_count(target)
  }
}

impl<P: Platform> Drop for PooledObserver<P> {
  fn drop(&mut self) {
    log::debug!(
      "Disconnecting observer {} ({} target(s), signature {})",
      self.id,
      self.dispatcher.target_count(),
      self.signature
    );
    self.primitive.disconnect();
  }
}

/// Capability to remove exactly one listener from a pooled observer.
///
/// `release` is idempotent.
pub(crate) struct WatchHandle<P: Platform> {
  observer: Arc<PooledObserver<P>>,
  target: P::Handle,
  listener: ListenerId,
}

impl<P: Platform> WatchHandle<P> {
  pub(crate) fn release(&self) {
    self.observer.unwatch(&self.target, self.listener);
  }

  pub(crate) const fn observer(&self) -> &Arc<PooledObserver<P>> {
    &self.observer
  }
}
