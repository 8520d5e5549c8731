/*! Branded ID types for pooled observers and their listeners. */

use derive_more::{Display, From, Into};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Pooled observer identifier. One per platform primitive instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub(crate) struct ObserverId(pub(crate) u32);

/// Listener identifier, unique across all pooled observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
pub(crate) struct ListenerId(pub(crate) u64);

/// Starts at 1 (0 could be confused with "null").
static OBSERVER_COUNTER: AtomicU32 = AtomicU32::new(1);
static LISTENER_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ObserverId {
  /// Generate a new unique `ObserverId`.
  pub(crate) fn new() -> Self {
    Self(OBSERVER_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

impl Default for ObserverId {
  fn default() -> Self {
    Self::new()
  }
}

impl ListenerId {
  /// Generate a new unique `ListenerId`.
  pub(crate) fn new() -> Self {
    Self(LISTENER_COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

impl Default for ListenerId {
  fn default() -> Self {
    Self::new()
  }
}
