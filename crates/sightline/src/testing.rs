/*!
In-memory platform for tests.

`FakePlatform` records every primitive it constructs. Each one is reachable
through an [`ObserverProbe`], which shows what the engine asked the primitive
to do and lets tests deliver visibility changes the way a browser would.

Deliveries never hold a lock while calling into the engine, so callbacks can
observe and unobserve freely from inside them.
*/

use derive_more::{Display, From};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::callback::Callback;
use crate::platform::{EntryHandler, ObserverInit, Platform, PlatformObserver};
use crate::types::{VisibilityEntry, VisibilityError, VisibilityResult};

/// Stand-in for a DOM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From)]
#[display("element#{_0}")]
pub struct FakeElement(
  /// Arbitrary element number.
  pub u32,
);

#[derive(Default)]
struct Created {
  observers: Vec<ObserverProbe>,
  fail_next_create: Option<String>,
}

/// Fake platform. Clone shares the record of created primitives.
#[derive(Clone, Default)]
pub struct FakePlatform {
  created: Arc<Mutex<Created>>,
}

impl FakePlatform {
  /// Platform with no primitives yet.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of primitives constructed so far (including disconnected ones).
  pub fn created(&self) -> usize {
    self.created.lock().observers.len()
  }

  /// Probe for the `index`-th constructed primitive.
  pub fn observer(&self, index: usize) -> Option<ObserverProbe> {
    self.created.lock().observers.get(index).cloned()
  }

  /// Probe for the most recently constructed primitive.
  pub fn last_observer(&self) -> Option<ObserverProbe> {
    self.created.lock().observers.last().cloned()
  }

  /// Probes for every primitive not yet disconnected.
  pub fn live_observers(&self) -> Vec<ObserverProbe> {
    self
      .created
      .lock()
      .observers
      .iter()
      .filter(|probe| !probe.is_disconnected())
      .cloned()
      .collect()
  }

  /// Make the next `create_observer` call fail with `message`.
  pub fn fail_next_create(&self, message: &str) {
    self.created.lock().fail_next_create = Some(message.to_owned());
  }
}

impl std::fmt::Debug for FakePlatform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FakePlatform")
      .field("created", &self.created())
      .finish()
  }
}

impl Platform for FakePlatform {
  type Handle = FakeElement;
  type Observer = FakeObserver;

  fn create_observer<C: EntryHandler<Handle = FakeElement>>(
    &self,
    init: &ObserverInit<FakeElement>,
    handler: Arc<C>,
  ) -> VisibilityResult<FakeObserver> {
    let mut created = self.created.lock();
    if let Some(message) = created.fail_next_create.take() {
      return Err(VisibilityError::ObserverError(message));
    }

    let probe = ObserverProbe {
      shared: Arc::new(Shared {
        init: init.clone(),
        handler,
        state: Mutex::new(ProbeState::default()),
      }),
    };
    created.observers.push(probe.clone());
    Ok(FakeObserver { probe })
  }
}

#[derive(Default)]
struct ProbeState {
  targets: Vec<FakeElement>,
  observe_calls: usize,
  fail_next_observe: Option<String>,
  disconnected: bool,
}

struct Shared {
  init: ObserverInit<FakeElement>,
  handler: Arc<dyn EntryHandler<Handle = FakeElement>>,
  state: Mutex<ProbeState>,
}

/// The primitive handed to the engine.
#[derive(Debug)]
pub struct FakeObserver {
  probe: ObserverProbe,
}

impl PlatformObserver for FakeObserver {
  type Handle = FakeElement;

  fn observe(&self, target: &FakeElement) -> VisibilityResult<()> {
    let mut state = self.probe.shared.state.lock();
    state.observe_calls += 1;
    if let Some(message) = state.fail_next_observe.take() {
      return Err(VisibilityError::ObserverError(message));
    }
    if !state.targets.contains(target) {
      state.targets.push(*target);
    }
    Ok(())
  }

  fn unobserve(&self, target: &FakeElement) {
    self.probe.shared.state.lock().targets.retain(|t| t != target);
  }

  fn disconnect(&self) {
    let mut state = self.probe.shared.state.lock();
    state.targets.clear();
    state.disconnected = true;
  }
}

/// Test-side view of one constructed primitive.
#[derive(Clone)]
pub struct ObserverProbe {
  shared: Arc<Shared>,
}

impl ObserverProbe {
  /// Options the primitive was constructed with.
  pub fn init(&self) -> &ObserverInit<FakeElement> {
    &self.shared.init
  }

  /// Currently watched targets, in the order they were first watched.
  pub fn targets(&self) -> Vec<FakeElement> {
    self.shared.state.lock().targets.clone()
  }

  /// Check if `target` is currently watched.
  pub fn is_watching(&self, target: FakeElement) -> bool {
    self.shared.state.lock().targets.contains(&target)
  }

  /// Total `observe` calls, failed ones included.
  pub fn observe_calls(&self) -> usize {
    self.shared.state.lock().observe_calls
  }

  /// Make the next `observe` call fail with `message`.
  pub fn fail_next_observe(&self, message: &str) {
    self.shared.state.lock().fail_next_observe = Some(message.to_owned());
  }

  /// Check if the engine disconnected this primitive.
  pub fn is_disconnected(&self) -> bool {
    self.shared.state.lock().disconnected
  }

  /// Deliver a batch as-is. Dropped if the primitive was disconnected.
  pub fn deliver(&self, entries: &[VisibilityEntry<FakeElement>]) {
    if self.is_disconnected() {
      return;
    }
    self.shared.handler.on_entries(entries);
  }

  /// Deliver one change for `target`, if it is watched.
  pub fn fire(&self, target: FakeElement, is_intersecting: bool) {
    if self.is_watching(target) {
      self.deliver(&[VisibilityEntry::new(target, is_intersecting)]);
    }
  }

  /// Deliver one batch with a change for every watched target.
  pub fn fire_all(&self, is_intersecting: bool) {
    let entries: Vec<_> = self
      .targets()
      .into_iter()
      .map(|target| VisibilityEntry::new(target, is_intersecting))
      .collect();
    if !entries.is_empty() {
      self.deliver(&entries);
    }
  }
}

impl std::fmt::Debug for ObserverProbe {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ObserverProbe")
      .field("init", &self.shared.init)
      .field("targets", &self.targets())
      .field("disconnected", &self.is_disconnected())
      .finish_non_exhaustive()
  }
}

/// Callback that records every entry it receives.
#[derive(Clone)]
pub struct Recorder {
  calls: Arc<Mutex<Vec<VisibilityEntry<FakeElement>>>>,
  callback: Callback<FakeElement>,
}

impl Recorder {
  /// Recorder with a fresh callback identity.
  pub fn new() -> Self {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let callback = Callback::new(move |entry: &VisibilityEntry<FakeElement>| {
      sink.lock().push(entry.clone());
    });
    Self { calls, callback }
  }

  /// The recording callback. Every call returns the same identity.
  pub fn callback(&self) -> &Callback<FakeElement> {
    &self.callback
  }

  /// Number of entries received.
  pub fn count(&self) -> usize {
    self.calls.lock().len()
  }

  /// Entries received so far, in order.
  pub fn calls(&self) -> Vec<VisibilityEntry<FakeElement>> {
    self.calls.lock().clone()
  }

  /// `(target, is_intersecting)` of every received entry.
  pub fn history(&self) -> Vec<(FakeElement, bool)> {
    self
      .calls
      .lock()
      .iter()
      .map(|entry| (entry.target, entry.is_intersecting))
      .collect()
  }
}

impl Default for Recorder {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for Recorder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Recorder")
      .field("callback", &self.callback)
      .field("count", &self.count())
      .finish_non_exhaustive()
  }
}
