/*!
Core `Visibility` context - owns the registration table and the observer pool.

# Module Structure

- `mod.rs` - `Visibility` struct, builder, state access
- `registry.rs` - registration table `(root, target, callback) -> entry`
- `pool.rs` - observer pool `(root, signature) -> pooled observer`, watch handles
- `dispatch.rs` - per-observer listener fan-out
- `once.rs` - fire-once listener adapter
- `subscriptions.rs` - `observe()` / `unobserve()` and the `Subscription` handle

# Locking

State is only touched inside short `read`/`write` closures. Platform calls and
caller callbacks always run outside them, so callbacks may freely call
`observe`/`unobserve` from inside a delivery.
*/

mod dispatch;
mod once;
mod pool;
mod registry;
mod subscriptions;

pub use subscriptions::Subscription;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::options::{NormalizedOptions, ObserveDefaults, RootMargin, Threshold};
use crate::platform::Platform;
use crate::types::VisibilityResult;
use pool::{ObserverPool, PooledObserver, WatchHandle};
use registry::RegistrationTable;

/// Get the value for `key`, inserting `factory()` first if it is missing.
pub(crate) fn get_or_insert_with<K: Eq + Hash, V>(
  map: &mut HashMap<K, V>,
  key: K,
  factory: impl FnOnce() -> V,
) -> &mut V {
  map.entry(key).or_insert_with(factory)
}

/// An active registration: its normalized options and the handle that
/// removes its listener from the pooled observer.
pub(crate) struct RegistrationEntry<P: Platform> {
  pub(crate) options: NormalizedOptions<P::Handle>,
  pub(crate) watch: WatchHandle<P>,
}

pub(crate) struct State<P: Platform> {
  pub(crate) registrations: RegistrationTable<P::Handle, RegistrationEntry<P>>,
  pub(crate) pool: ObserverPool<P::Handle, PooledObserver<P>>,
}

pub(crate) struct Inner<P: Platform> {
  platform: P,
  defaults: ObserveDefaults,
  state: Mutex<State<P>>,
}

/// Visibility observation context.
///
/// Multiplexes any number of `(target, callback, options)` registrations over
/// a small pool of platform observers. Construct one per application (or per
/// test) and share it; clone is cheap (Arc bump).
///
/// Dropping the last clone disconnects every pooled observer.
pub struct Visibility<P: Platform> {
  pub(crate) inner: Arc<Inner<P>>,
}

impl<P: Platform> Clone for Visibility<P> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<P: Platform> fmt::Debug for Visibility<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Visibility")
      .field("defaults", &self.inner.defaults)
      .finish_non_exhaustive()
  }
}

/// Builder for configuring a `Visibility` context.
///
/// # Example
///
/// ```ignore
/// let visibility = VisibilityBuilder::new()
///     .root_margin("0px 0px 200px 0px")
///     .threshold([0.0, 1.0])
///     .build(platform)?;
/// ```
#[derive(Debug, Clone, Default)]
#[must_use = "Builder does nothing until .build() is called"]
pub struct VisibilityBuilder {
  root_margin: RootMargin,
  threshold: Threshold,
  once: bool,
}

impl VisibilityBuilder {
  /// Builder with the built-in defaults.
  pub fn new() -> Self {
    Self::default()
  }

  /// Root margin for registrations that don't set one. Default: `0px`.
  pub fn root_margin(mut self, margin: impl Into<RootMargin>) -> Self {
    self.root_margin = margin.into();
    self
  }

  /// Threshold for registrations that don't set one. Default: `0`.
  pub fn threshold(mut self, threshold: impl Into<Threshold>) -> Self {
    self.threshold = threshold.into();
    self
  }

  /// Fire-once behaviour for registrations that don't set it. Default: false.
  pub fn once(mut self, once: bool) -> Self {
    self.once = once;
    self
  }

  /// Build the context on top of `platform`.
  ///
  /// Fails if the default root margin is malformed.
  pub fn build<P: Platform>(self, platform: P) -> VisibilityResult<Visibility<P>> {
    let defaults = ObserveDefaults::new(self.root_margin, self.threshold, self.once)?;
    Ok(Visibility::with_defaults(platform, defaults))
  }
}

impl<P: Platform> Visibility<P> {
  /// Create a context with the built-in defaults.
  pub fn new(platform: P) -> Self {
    Self::with_defaults(platform, ObserveDefaults::default())
  }

  fn with_defaults(platform: P, defaults: ObserveDefaults) -> Self {
    Self {
      inner: Arc::new(Inner {
        platform,
        defaults,
        state: Mutex::new(State {
          registrations: RegistrationTable::new(),
          pool: ObserverPool::new(),
        }),
      }),
    }
  }

  /// Context-wide option defaults.
  pub fn defaults(&self) -> &ObserveDefaults {
    &self.inner.defaults
  }

  /// The platform this context observes through.
  pub fn platform(&self) -> &P {
    &self.inner.platform
  }

  /// Read state. Never call platform functions or callbacks inside the closure.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&State<P>) -> R) -> R {
    f(&self.inner.state.lock())
  }

  /// Write state. Never call platform functions or callbacks inside the closure.
  #[inline]
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut State<P>) -> R) -> R {
    f(&mut self.inner.state.lock())
  }
}
