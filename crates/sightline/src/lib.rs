/*!
Sightline - pooled visibility observation

Many callers want to know when elements enter or leave view. Creating one
native observer per caller is wasteful; sightline keeps a small pool of
platform observers keyed by `(root, rootMargin, threshold)` and multiplexes
every registration over it.

```ignore
use sightline::{Callback, ObserveOptions, Root, Visibility};

// One context per application (cheap to clone)
let visibility = Visibility::new(WebPlatform);

let on_change = Callback::new(|entry| {
    log::info!("{:?} visible={}", entry.target, entry.is_intersecting);
});

// Observe with options (missing fields take the context defaults)
let subscription = visibility.observe(
    &element,
    &on_change,
    ObserveOptions::new().root_margin("0px 0px 200px 0px").threshold([0.0, 1.0]),
)?;

// Fire once, on the first time the element becomes visible
visibility.observe(&element, &on_change, ObserveOptions::new().once(true))?;

// Stop observing (either way)
subscription.unsubscribe();
visibility.unobserve(&element, &on_change, &Root::Viewport);
```
*/

mod callback;
mod core;
mod options;

pub mod platform;

mod types;
pub use types::*;

pub use crate::callback::Callback;
pub use crate::core::{Subscription, Visibility, VisibilityBuilder};
pub use crate::options::{
  NormalizedOptions, ObserveDefaults, ObserveOptions, RootMargin, Signature, Threshold,
};
pub use crate::platform::{EntryHandler, ObserverInit, Platform, PlatformHandle, PlatformObserver};

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
