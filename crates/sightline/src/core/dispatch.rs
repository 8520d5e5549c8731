/*!
Per-observer listener fan-out.

A platform primitive reports a change once per target. The dispatcher turns
that into one call per registered listener, in registration order.

Listeners are snapshotted before dispatch and re-checked right before each
call, so a listener removed during a delivery (e.g. by an earlier listener, or
by a once-adapter) is never invoked afterwards. No lock is held while a
listener runs.
*/

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::callback::Listener;
use crate::platform::{EntryHandler, PlatformHandle};
use crate::types::{ListenerId, ObserverId, VisibilityEntry};

/// Listeners of one target, in registration order.
type Slots<H> = Vec<(ListenerId, Listener<H>)>;

pub(crate) struct Dispatcher<H> {
  observer_id: ObserverId,
  listeners: Mutex<HashMap<H, Slots<H>>>,
}

impl<H: PlatformHandle> Dispatcher<H> {
  pub(crate) fn new(observer_id: ObserverId) -> Self {
    Self {
      observer_id,
      listeners: Mutex::new(HashMap::new()),
    }
  }

  /// Add a listener for `target`. Returns its id and whether it is the first
  /// listener for the target (the primitive must start watching it).
  pub(crate) fn add(&self, target: H, listener: Listener<H>) -> (ListenerId, bool) {
    let id = ListenerId::new();
    let mut listeners = self.listeners.lock();
    let slots = listeners.entry(target).or_default();
    let first = slots.is_empty();
    slots.push((id, listener));
    (id, first)
  }

  /// Remove a listener. Returns `None` if it was not registered, otherwise
  /// whether the target has no listeners left (the primitive must stop
  /// watching it).
  pub(crate) fn remove(&self, target: &H, id: ListenerId) -> Option<bool> {
    let mut listeners = self.listeners.lock();
    let slots = listeners.get_mut(target)?;
    let index = slots.iter().position(|(slot_id, _)| *slot_id == id)?;
    slots.remove(index);

    if slots.is_empty() {
      listeners.remove(target);
      return Some(true);
    }
    Some(false)
  }

  /// Check if a listener is still registered for `target`.
  pub(crate) fn is_live(&self, target: &H, id: ListenerId) -> bool {
    self
      .listeners
      .lock()
      .get(target)
      .is_some_and(|slots| slots.iter().any(|(slot_id, _)| *slot_id == id))
  }

  /// Number of listeners registered for `target`.
  #[cfg(test)]
  pub(crate) fn listener_count(&self, target: &H) -> usize {
    self.listeners.lock().get(target).map_or(0, Vec::len)
  }

  /// Number of targets with at least one listener.
  pub(crate) fn target_count(&self) -> usize {
    self.listeners.lock().len()
  }

  fn dispatch(&self, entry: &VisibilityEntry<H>) {
    let snapshot: Slots<H> = self
      .listeners
      .lock()
      .get(&entry.target)
      .cloned()
      .unwrap_or_default();

    log::trace!(
      "Observer {} delivering {:?} (intersecting={}) to {} listener(s)",
      self.observer_id,
      entry.target,
      entry.is_intersecting,
      snapshot.len()
    );

    for (id, listener) in snapshot {
      if self.is_live(&entry.target, id) {
        listener(entry);
      }
    }
  }
}

impl<H: PlatformHandle> EntryHandler for Dispatcher<H> {
  type Handle = H;

  fn on_entries(&self, entries: &[VisibilityEntry<H>]) {
    for entry in entries {
      self.dispatch(entry);
    }
  }
}
