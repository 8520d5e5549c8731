/*!
Platform abstraction layer.

`traits` is the contract between the pooling engine and a native
visibility-observation primitive. Backends implement it:

- `web` - the browser's `IntersectionObserver` (feature `web`, wasm32 only)
- `crate::testing` - an in-memory fake for tests
*/

mod traits;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

pub use traits::{EntryHandler, ObserverInit, Platform, PlatformHandle, PlatformObserver};
