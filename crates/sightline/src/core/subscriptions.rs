/*!
Observe/unobserve registration methods for `Visibility`.

Every operation follows the same shape: quick state read/write, platform
calls with no lock held, quick state write.
*/

use std::fmt;
use std::sync::{Arc, Weak};

use super::dispatch::Dispatcher;
use super::pool::PooledObserver;
use super::{once, Inner, RegistrationEntry, Visibility};
use crate::callback::Callback;
use crate::options::{NormalizedOptions, ObserveOptions};
use crate::platform::Platform;
use crate::types::{ObserverId, Root, VisibilityResult};

impl<P: Platform> Visibility<P> {
  /// Register `callback` to be called whenever the visibility of `target`
  /// changes according to `options`.
  ///
  /// Any number of callbacks may observe a target, each with its own options.
  /// Observing again with the same target, callback and root:
  ///
  /// - with equivalent options: no effect,
  /// - with different options: the old registration is fully removed first,
  ///   then the new one is created.
  ///
  /// Fails before touching any state if the root margin is malformed, and
  /// propagates platform failures without leaving a partial registration.
  ///
  /// Returns a handle equivalent to calling [`Visibility::unobserve`] with
  /// the same target, callback and root. Dropping it does nothing.
  pub fn observe(
    &self,
    target: &P::Handle,
    callback: &Callback<P::Handle>,
    options: ObserveOptions<P::Handle>,
  ) -> VisibilityResult<Subscription<P>> {
    // Step 1: Normalize (no state touched on failure)
    let options = options.normalize_with(&self.inner.defaults)?;
    let root = options.root.clone();

    // Step 2: Compare with the existing registration (quick read)
    let existing = self.read(|s| {
      s.registrations
        .lookup(&root, target, callback)
        .map(|entry| entry.options.same_behavior(&options))
    });
    if existing == Some(true) {
      return Ok(self.subscription(root, target, callback));
    }

    // Step 3: Pooled observer (may construct a primitive, NO LOCK)
    let observer = self.pooled_observer(&options)?;

    // Step 4: Reconfiguration - remove the old registration entirely
    if existing == Some(false) {
      log::debug!("Reconfiguring {target:?} on {root:?} ({})", options.signature());
      self.unobserve(target, callback, &root);
    }

    // Step 5: Watch (platform call, NO LOCK)
    let listener = if options.once {
      once::wrap(Arc::downgrade(&self.inner), root.clone(), callback.clone())
    } else {
      callback.listener()
    };
    let watch = observer.watch(target, listener)?;

    log::debug!(
      "Observing {target:?} on {root:?} via observer {} (once={})",
      observer.id(),
      options.once
    );

    // Step 6: Record (quick write). A registration that raced in is released
    // outside the lock.
    let replaced = self.write(|s| {
      s.registrations
        .insert(&root, target, callback.clone(), RegistrationEntry { options, watch })
    });
    if let Some(stale) = replaced {
      stale.watch.release();
    }

    Ok(self.subscription(root, target, callback))
  }

  /// Stop reporting visibility changes of `target` to `callback` within `root`.
  ///
  /// Other callbacks of the target are unaffected. Unknown roots, targets and
  /// callbacks are ignored.
  pub fn unobserve(&self, target: &P::Handle, callback: &Callback<P::Handle>, root: &Root<P::Handle>) {
    // Step 1: Take the entry out, pruning empty maps (quick write)
    let Some(entry) = self.write(|s| s.registrations.remove(root, target, callback)) else {
      return;
    };

    // Step 2: Release the listener (platform call, NO LOCK)
    entry.watch.release();
    log::debug!(
      "Unobserved {target:?} on {root:?} from observer {}",
      entry.watch.observer().id()
    );
  }

  /// Stop reporting visibility changes of `target` within `root` to every callback.
  pub fn unobserve_all(&self, target: &P::Handle, root: &Root<P::Handle>) {
    let Some(entries) = self.write(|s| s.registrations.delete(root, target)) else {
      return;
    };

    let count = entries.len();
    for entry in entries.into_values() {
      entry.watch.release();
    }
    log::debug!("Unobserved {target:?} on {root:?} from {count} callback(s)");
  }

  /// Check if `callback` currently observes `target` within `root`.
  pub fn is_observed(
    &self,
    target: &P::Handle,
    callback: &Callback<P::Handle>,
    root: &Root<P::Handle>,
  ) -> bool {
    self.read(|s| s.registrations.lookup(root, target, callback).is_some())
  }

  /// Normalized options of an active registration.
  pub fn options_of(
    &self,
    target: &P::Handle,
    callback: &Callback<P::Handle>,
    root: &Root<P::Handle>,
  ) -> Option<NormalizedOptions<P::Handle>> {
    self.read(|s| {
      s.registrations
        .lookup(root, target, callback)
        .map(|entry| entry.options.clone())
    })
  }

  /// Number of active registrations.
  pub fn registration_count(&self) -> usize {
    self.read(|s| s.registrations.len())
  }

  /// Number of pooled platform observers.
  pub fn observer_count(&self) -> usize {
    self.read(|s| s.pool.len())
  }

  /// Pooled observer for the options' `(root, signature)`, created on miss.
  fn pooled_observer(
    &self,
    options: &NormalizedOptions<P::Handle>,
  ) -> VisibilityResult<Arc<PooledObserver<P>>> {
    let signature = options.signature();

    // Step 1: Hit? (quick read)
    if let Some(observer) = self.read(|s| s.pool.get(&options.root, &signature)) {
      return Ok(observer);
    }

    // Step 2: Construct the primitive (platform call, NO LOCK)
    let id = ObserverId::new();
    let dispatcher = Arc::new(Dispatcher::new(id));
    let primitive = self
      .inner
      .platform
      .create_observer(&options.observer_init(), Arc::clone(&dispatcher))?;
    let created = Arc::new(PooledObserver::new(id, signature.clone(), dispatcher, primitive));

    log::debug!(
      "Created observer {id} for {:?} with signature {signature}",
      options.root
    );

    // Step 3: Pool it (quick write). If one raced in, `created` is dropped
    // (and disconnected) here, outside the lock.
    let pooled = self.write(|s| s.pool.insert(&options.root, signature, Arc::clone(&created)));
    Ok(pooled)
  }

  fn subscription(
    &self,
    root: Root<P::Handle>,
    target: &P::Handle,
    callback: &Callback<P::Handle>,
  ) -> Subscription<P> {
    Subscription {
      context: Arc::downgrade(&self.inner),
      root,
      target: target.clone(),
      callback: callback.clone(),
    }
  }
}

/// Handle returned by [`Visibility::observe`].
///
/// `unsubscribe` is equivalent to `unobserve(target, callback, root)` and may
/// be called any number of times. Dropping the handle keeps the registration.
pub struct Subscription<P: Platform> {
  context: Weak<Inner<P>>,
  root: Root<P::Handle>,
  target: P::Handle,
  callback: Callback<P::Handle>,
}

impl<P: Platform> Subscription<P> {
  /// Stop this registration. No-op if it is already gone.
  pub fn unsubscribe(&self) {
    if let Some(inner) = self.context.upgrade() {
      Visibility { inner }.unobserve(&self.target, &self.callback, &self.root);
    }
  }

  /// Check if the registration this handle refers to is still active.
  pub fn is_active(&self) -> bool {
    self
      .context
      .upgrade()
      .is_some_and(|inner| Visibility { inner }.is_observed(&self.target, &self.callback, &self.root))
  }

  /// The observed element.
  pub const fn target(&self) -> &P::Handle {
    &self.target
  }

  /// The root the registration is scoped to.
  pub const fn root(&self) -> &Root<P::Handle> {
    &self.root
  }
}

impl<P: Platform> Clone for Subscription<P> {
  fn clone(&self) -> Self {
    Self {
      context: Weak::clone(&self.context),
      root: self.root.clone(),
      target: self.target.clone(),
      callback: self.callback.clone(),
    }
  }
}

impl<P: Platform> fmt::Debug for Subscription<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("root", &self.root)
      .field("target", &self.target)
      .field("callback", &self.callback)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::VisibilityBuilder;
  use crate::options::Threshold;
  use crate::testing::{FakeElement, FakePlatform, Recorder};
  use crate::types::{VisibilityEntry, VisibilityError};

  const A: FakeElement = FakeElement(1);
  const B: FakeElement = FakeElement(2);
  const SCROLLER: FakeElement = FakeElement(100);
  const VIEWPORT: Root<FakeElement> = Root::Viewport;

  fn setup() -> (Visibility<FakePlatform>, FakePlatform) {
    let platform = FakePlatform::new();
    (Visibility::new(platform.clone()), platform)
  }

  fn options() -> ObserveOptions<FakeElement> {
    ObserveOptions::new()
  }

  mod delivery {
    use super::*;

    #[test]
    fn observe_delivers_changes() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      let probe = platform.last_observer().unwrap();
      assert_eq!(probe.targets(), vec![A]);

      probe.fire(A, true);
      probe.fire(A, false);
      assert_eq!(rec.history(), vec![(A, true), (A, false)]);
    }

    #[test]
    fn entry_geometry_passed_through() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();
      visibility.observe(&A, rec.callback(), options()).unwrap();

      let entry = VisibilityEntry::new(A, true).with_ratio(0.25);
      platform.last_observer().unwrap().deliver(std::slice::from_ref(&entry));
      assert_eq!(rec.calls(), vec![entry]);
    }

    #[test]
    fn unobserve_during_delivery_skips_later_listener() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      let canceller = {
        let visibility = visibility.clone();
        let victim = rec.callback().clone();
        Callback::new(move |entry: &VisibilityEntry<FakeElement>| {
          visibility.unobserve(&entry.target, &victim, &Root::Viewport);
        })
      };
      visibility.observe(&A, &canceller, options()).unwrap();
      visibility.observe(&A, rec.callback(), options()).unwrap();

      platform.last_observer().unwrap().fire(A, true);
      assert_eq!(rec.count(), 0);
      assert!(!visibility.is_observed(&A, rec.callback(), &VIEWPORT));
    }

    #[test]
    fn observe_during_delivery() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      let chain = {
        let visibility = visibility.clone();
        let next = rec.callback().clone();
        Callback::new(move |_: &VisibilityEntry<FakeElement>| {
          visibility.observe(&B, &next, ObserveOptions::new()).unwrap();
        })
      };
      visibility.observe(&A, &chain, options()).unwrap();

      let probe = platform.last_observer().unwrap();
      probe.fire(A, true);
      assert!(probe.is_watching(B));

      probe.fire(B, true);
      assert_eq!(rec.history(), vec![(B, true)]);
    }
  }

  mod pooling {
    use super::*;

    #[test]
    fn same_signature_shares_observer() {
      let (visibility, platform) = setup();
      let (first, second) = (Recorder::new(), Recorder::new());

      for rec in [&first, &second] {
        visibility.observe(&A, rec.callback(), options()).unwrap();
        visibility.observe(&B, rec.callback(), options()).unwrap();
      }

      let probe = platform.last_observer().unwrap();
      assert_eq!(platform.created(), 1);
      assert_eq!(visibility.observer_count(), 1);
      assert_eq!(probe.targets(), vec![A, B]);
      assert_eq!(probe.observe_calls(), 2);

      probe.fire(A, true);
      assert_eq!(first.history(), vec![(A, true)]);
      assert_eq!(second.history(), vec![(A, true)]);

      visibility.unobserve(&A, first.callback(), &VIEWPORT);
      assert!(probe.is_watching(A));

      visibility.unobserve(&A, second.callback(), &VIEWPORT);
      assert!(!probe.is_watching(A));
      assert!(probe.is_watching(B));

      probe.fire_all(false);
      assert_eq!(first.history(), vec![(A, true), (B, false)]);
      assert_eq!(second.history(), vec![(A, true), (B, false)]);
    }

    #[test]
    fn different_signatures_get_different_observers() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.observe(&B, rec.callback(), options().threshold(0.5)).unwrap();

      assert_eq!(platform.created(), 2);
      assert_eq!(visibility.observer_count(), 2);
      assert_eq!(platform.observer(1).unwrap().init().threshold, Threshold::Single(0.5));
    }

    #[test]
    fn roots_get_separate_observers() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.observe(&A, rec.callback(), options().root(SCROLLER)).unwrap();

      assert_eq!(platform.created(), 2);
      assert_eq!(platform.observer(0).unwrap().init().root, None);
      assert_eq!(platform.observer(1).unwrap().init().root, Some(SCROLLER));
      assert_eq!(visibility.registration_count(), 2);

      visibility.unobserve(&A, rec.callback(), &VIEWPORT);
      assert!(visibility.is_observed(&A, rec.callback(), &Root::Element(SCROLLER)));
      assert!(platform.observer(1).unwrap().is_watching(A));
    }
  }

  mod reconfigure {
    use super::*;

    #[test]
    fn observe_twice_with_equivalent_options_is_noop() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility
        .observe(&A, rec.callback(), options().root_margin("0px").threshold(0.0).once(false))
        .unwrap();

      let probe = platform.last_observer().unwrap();
      assert_eq!(platform.created(), 1);
      assert_eq!(probe.observe_calls(), 1);
      assert_eq!(visibility.registration_count(), 1);

      probe.fire(A, true);
      assert_eq!(rec.count(), 1);
    }

    #[test]
    fn reconfigure_moves_registration() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility
        .observe(&A, rec.callback(), options().root_margin("10px"))
        .unwrap();

      assert_eq!(platform.created(), 2);
      let old = platform.observer(0).unwrap();
      let new = platform.observer(1).unwrap();
      assert!(!old.is_watching(A));
      assert!(new.is_watching(A));
      assert_eq!(new.init().root_margin, "10px 10px 10px 10px");

      // Only the new configuration delivers
      old.deliver(&[VisibilityEntry::new(A, true)]);
      new.fire(A, true);
      assert_eq!(rec.count(), 1);

      let current = visibility.options_of(&A, rec.callback(), &VIEWPORT).unwrap();
      assert_eq!(current.root_margin, "10px 10px 10px 10px");
      assert_eq!(visibility.registration_count(), 1);
    }

    #[test]
    fn reconfigure_once_reuses_observer() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.observe(&A, rec.callback(), options().once(true)).unwrap();

      let probe = platform.last_observer().unwrap();
      assert_eq!(platform.created(), 1);
      assert_eq!(probe.observe_calls(), 2);
      assert!(probe.is_watching(A));

      probe.fire(A, true);
      probe.fire(A, true);
      assert_eq!(rec.count(), 1);
      assert!(!visibility.is_observed(&A, rec.callback(), &VIEWPORT));
    }

    #[test]
    fn context_defaults_apply() {
      let platform = FakePlatform::new();
      let visibility = VisibilityBuilder::new()
        .threshold([0.0, 1.0])
        .build(platform.clone())
        .unwrap();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      let init = platform.last_observer().unwrap().init().clone();
      assert_eq!(init.threshold, Threshold::Multiple(vec![0.0, 1.0]));
      assert_eq!(init.root_margin, "0px 0px 0px 0px");
    }

    #[test]
    fn json_options() {
      let (visibility, _platform) = setup();
      let rec = Recorder::new();

      let json = ObserveOptions::from_json(r#"{"rootMargin": "10px 0px", "once": true}"#).unwrap();
      visibility.observe(&A, rec.callback(), json).unwrap();

      let current = visibility.options_of(&A, rec.callback(), &VIEWPORT).unwrap();
      assert_eq!(current.root_margin, "10px 0px 10px 0px");
      assert!(current.once);
    }
  }

  mod fire_once {
    use super::*;

    #[test]
    fn once_waits_for_intersection() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options().once(true)).unwrap();
      let probe = platform.last_observer().unwrap();

      probe.fire(A, false);
      assert_eq!(rec.count(), 0);
      assert!(visibility.is_observed(&A, rec.callback(), &VIEWPORT));

      probe.fire(A, true);
      assert_eq!(rec.history(), vec![(A, true)]);
      assert!(!visibility.is_observed(&A, rec.callback(), &VIEWPORT));
      assert!(!probe.is_watching(A));

      probe.fire(A, true);
      assert_eq!(rec.count(), 1);
    }

    #[test]
    fn once_ignores_rest_of_batch() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options().once(true)).unwrap();
      platform
        .last_observer()
        .unwrap()
        .deliver(&[VisibilityEntry::new(A, true), VisibilityEntry::new(A, true)]);

      assert_eq!(rec.count(), 1);
    }
  }

  mod removal {
    use super::*;

    #[test]
    fn unobserve_unknown_is_noop() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.unobserve(&A, rec.callback(), &VIEWPORT);

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.unobserve(&B, rec.callback(), &VIEWPORT);
      visibility.unobserve(&A, Recorder::new().callback(), &VIEWPORT);
      visibility.unobserve(&A, rec.callback(), &Root::Element(SCROLLER));
      assert!(visibility.is_observed(&A, rec.callback(), &VIEWPORT));

      visibility.unobserve(&A, rec.callback(), &VIEWPORT);
      visibility.unobserve(&A, rec.callback(), &VIEWPORT);
      assert_eq!(visibility.registration_count(), 0);
      assert!(platform.last_observer().unwrap().targets().is_empty());
    }

    #[test]
    fn unobserve_prunes_table() {
      let (visibility, _platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.observe(&B, rec.callback(), options().root(SCROLLER)).unwrap();
      assert_eq!(visibility.read(|s| s.registrations.root_count()), 2);

      visibility.unobserve(&A, rec.callback(), &VIEWPORT);
      visibility.unobserve(&B, rec.callback(), &Root::Element(SCROLLER));
      assert_eq!(visibility.read(|s| s.registrations.root_count()), 0);
    }

    #[test]
    fn unobserve_all() {
      let (visibility, platform) = setup();
      let (first, second) = (Recorder::new(), Recorder::new());

      visibility.observe(&A, first.callback(), options()).unwrap();
      visibility.observe(&A, second.callback(), options().threshold(1.0)).unwrap();
      visibility.observe(&B, first.callback(), options()).unwrap();

      visibility.unobserve_all(&A, &VIEWPORT);
      assert_eq!(visibility.registration_count(), 1);
      assert!(platform.live_observers().iter().all(|probe| !probe.is_watching(A)));
      assert!(platform.observer(0).unwrap().is_watching(B));

      // Unknown targets are ignored
      visibility.unobserve_all(&A, &VIEWPORT);
    }

    #[test]
    fn dropping_context_disconnects() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      visibility.observe(&B, rec.callback(), options().root_margin(5)).unwrap();
      assert_eq!(platform.live_observers().len(), 2);

      drop(visibility);
      assert!(platform.live_observers().is_empty());
    }
  }

  mod failures {
    use super::*;

    #[test]
    fn invalid_margin_leaves_no_state() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      let err = visibility
        .observe(&A, rec.callback(), options().root_margin("1px 2px 3px 4px 5px"))
        .unwrap_err();
      assert!(matches!(err, VisibilityError::InvalidRootMargin(_)));
      assert_eq!(platform.created(), 0);
      assert_eq!(visibility.registration_count(), 0);

      // A failed reconfiguration keeps the existing registration
      visibility.observe(&A, rec.callback(), options()).unwrap();
      assert!(visibility
        .observe(&A, rec.callback(), options().root_margin(""))
        .is_err());
      assert!(visibility.is_observed(&A, rec.callback(), &VIEWPORT));
    }

    #[test]
    fn construction_failure_propagates() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      platform.fail_next_create("no observer support");
      let err = visibility.observe(&A, rec.callback(), options()).unwrap_err();
      assert!(matches!(err, VisibilityError::ObserverError(ref m) if m == "no observer support"));
      assert_eq!(visibility.registration_count(), 0);
      assert_eq!(visibility.observer_count(), 0);

      // Failing to build the new observer leaves the old registration working
      visibility.observe(&A, rec.callback(), options()).unwrap();
      platform.fail_next_create("again");
      assert!(visibility
        .observe(&A, rec.callback(), options().root_margin("10px"))
        .is_err());
      assert!(visibility.is_observed(&A, rec.callback(), &VIEWPORT));

      platform.last_observer().unwrap().fire(A, true);
      assert_eq!(rec.count(), 1);
    }

    #[test]
    fn watch_failure_leaves_no_registration() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      visibility.observe(&A, rec.callback(), options()).unwrap();
      let probe = platform.last_observer().unwrap();
      probe.fail_next_observe("detached");

      assert!(visibility.observe(&B, rec.callback(), options()).is_err());
      assert!(!visibility.is_observed(&B, rec.callback(), &VIEWPORT));
      assert!(!probe.is_watching(B));
      assert_eq!(visibility.registration_count(), 1);
    }
  }

  mod subscription {
    use super::*;

    #[test]
    fn unsubscribe_is_idempotent() {
      let (visibility, platform) = setup();
      let rec = Recorder::new();

      let subscription = visibility
        .observe(&A, rec.callback(), options().root(SCROLLER))
        .unwrap();
      assert_eq!(subscription.target(), &A);
      assert_eq!(subscription.root(), &Root::Element(SCROLLER));
      assert!(subscription.is_active());

      subscription.unsubscribe();
      assert!(!subscription.is_active());
      assert!(!platform.last_observer().unwrap().is_watching(A));

      subscription.unsubscribe();
      assert_eq!(visibility.registration_count(), 0);
    }

    #[test]
    fn drop_keeps_registration() {
      let (visibility, _platform) = setup();
      let rec = Recorder::new();

      drop(visibility.observe(&A, rec.callback(), options()).unwrap());
      assert!(visibility.is_observed(&A, rec.callback(), &VIEWPORT));
    }

    #[test]
    fn outlives_context() {
      let (visibility, _platform) = setup();
      let rec = Recorder::new();

      let subscription = visibility.observe(&A, rec.callback(), options()).unwrap();
      drop(visibility);
      assert!(!subscription.is_active());
      subscription.unsubscribe();
    }
  }
}
