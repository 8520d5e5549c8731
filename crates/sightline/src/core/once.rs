/*!
Fire-once listener adapter.

The platform reports every change. A once-registration should only see the
first change into "intersecting": non-intersecting entries are ignored and
the registration stays active; the first intersecting entry unregisters the
callback and then invokes it.

Unregistering before invoking means the callback can never be asked to
unregister itself again from inside its own delivery, and the dispatcher's
liveness check drops any later entry in the same batch.
*/

use std::sync::{Arc, Weak};

use super::{Inner, Visibility};
use crate::callback::{Callback, Listener};
use crate::platform::Platform;
use crate::types::{Root, VisibilityEntry};

/// Wrap `callback` so it fires at most once, on the first intersecting entry.
///
/// Holds the context weakly: listeners live inside the pool the context owns.
pub(super) fn wrap<P: Platform>(
  context: Weak<Inner<P>>,
  root: Root<P::Handle>,
  callback: Callback<P::Handle>,
) -> Listener<P::Handle> {
  Arc::new(move |entry: &VisibilityEntry<P::Handle>| {
    if !entry.is_intersecting {
      return;
    }
    if let Some(inner) = context.upgrade() {
      Visibility { inner }.unobserve(&entry.target, &callback, &root);
    }
    callback.call(entry);
  })
}
