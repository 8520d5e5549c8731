/*!
Registration table: `root -> target -> callback -> entry`.

## Invariants

1. **One entry per triple**: a `(root, target, callback)` maps to at most one entry.
2. **No empty containers**: removing the last callback of a target removes the
   target; removing the last target of a root removes the root. Memory stays
   proportional to live registrations, not to historical ones.

Only `get` auto-vivifies, and only `insert` calls it, so lookups and removals
of unknown keys never leave empty maps behind.
*/

use std::collections::HashMap;
use std::hash::Hash;

use super::get_or_insert_with;
use crate::callback::Callback;
use crate::types::Root;

pub(crate) type CallbackMap<H, E> = HashMap<Callback<H>, E>;

pub(crate) struct RegistrationTable<H, E> {
  roots: HashMap<Root<H>, HashMap<H, CallbackMap<H, E>>>,
}

impl<H: Clone + Eq + Hash, E> RegistrationTable<H, E> {
  pub(crate) fn new() -> Self {
    Self {
      roots: HashMap::new(),
    }
  }

  /// Callback map for `(root, target)`, created empty on first access.
  pub(crate) fn get(&mut self, root: &Root<H>, target: &H) -> &mut CallbackMap<H, E> {
    let targets = get_or_insert_with(&mut self.roots, root.clone(), HashMap::new);
    get_or_insert_with(targets, target.clone(), HashMap::new)
  }

  /// Entry for a triple, without creating anything.
  pub(crate) fn lookup(&self, root: &Root<H>, target: &H, callback: &Callback<H>) -> Option<&E> {
    self.roots.get(root)?.get(target)?.get(callback)
  }

  /// Store an entry, returning the one it replaced.
  pub(crate) fn insert(
    &mut self,
    root: &Root<H>,
    target: &H,
    callback: Callback<H>,
    entry: E,
  ) -> Option<E> {
    self.get(root, target).insert(callback, entry)
  }

  /// Remove one entry, pruning emptied target and root maps.
  pub(crate) fn remove(&mut self, root: &Root<H>, target: &H, callback: &Callback<H>) -> Option<E> {
    let entry = self
      .roots
      .get_mut(root)?
      .get_mut(target)?
      .remove(callback)?;
    self.delete_if_empty(root, target);
    Some(entry)
  }

  /// Remove every entry for `(root, target)`, pruning the root if emptied.
  pub(crate) fn delete(&mut self, root: &Root<H>, target: &H) -> Option<CallbackMap<H, E>> {
    let targets = self.roots.get_mut(root)?;
    let callbacks = targets.remove(target);
    if targets.is_empty() {
      self.roots.remove(root);
    }
    callbacks
  }

  /// Prune `(root, target)` if it has no callbacks, then `root` if it has no targets.
  pub(crate) fn delete_if_empty(&mut self, root: &Root<H>, target: &H) {
    let Some(targets) = self.roots.get_mut(root) else {
      return;
    };
    if targets.get(target).is_some_and(HashMap::is_empty) {
      targets.remove(target);
    }
    if targets.is_empty() {
      self.roots.remove(root);
    }
  }

  /// Number of roots with at least one target.
  #[cfg(test)]
  pub(crate) fn root_count(&self) -> usize {
    self.roots.len()
  }

  /// Number of targets under `root`.
  #[cfg(test)]
  pub(crate) fn target_count(&self, root: &Root<H>) -> usize {
    self.roots.get(root).map_or(0, HashMap::len)
  }

  /// Total number of registrations.
  pub(crate) fn len(&self) -> usize {
    self
      .roots
      .values()
      .flat_map(HashMap::values)
      .map(HashMap::len)
      .sum()
  }
}
