/*!
Browser backend over `IntersectionObserver`.

Elements get a stable numeric id the first time they are seen, stored in a JS
`WeakMap` keyed by the element, so ids never keep elements alive and the same
DOM node always maps to the same `WebElement` identity.

wasm32 is single-threaded; the `Send`/`Sync` impls below only exist so the
handles satisfy the platform-neutral trait bounds.
*/

#![allow(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use js_sys::{Array, Object, WeakMap};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomRectReadOnly, Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use super::{EntryHandler, ObserverInit, Platform, PlatformObserver};
use crate::options::Threshold;
use crate::types::{Bounds, VisibilityEntry, VisibilityError, VisibilityResult};

thread_local! {
  static ELEMENT_IDS: WeakMap = WeakMap::new();
  static NEXT_ELEMENT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Take the next id from `counter`. Ids are never reused.
fn allocate_id(counter: &Cell<u64>) -> u64 {
  let id = counter.get();
  counter.set(id + 1);
  id
}

/// Ids stay below 2^53, so the `f64` stored in the `WeakMap` is exact.
#[allow(
  clippy::cast_possible_truncation,
  clippy::cast_precision_loss,
  clippy::cast_sign_loss
)]
fn element_id(element: &Element) -> u64 {
  let key = element.unchecked_ref::<Object>();
  ELEMENT_IDS.with(|ids| {
    if let Some(id) = ids.get(key).as_f64() {
      return id as u64;
    }
    let id = NEXT_ELEMENT_ID.with(allocate_id);
    ids.set(key, &JsValue::from_f64(id as f64));
    id
  })
}

/// A DOM element with a stable identity.
#[derive(Clone)]
pub struct WebElement {
  id: u64,
  element: Element,
}

// SAFETY: wasm32 without threads; values never cross a thread boundary.
unsafe impl Send for WebElement {}
unsafe impl Sync for WebElement {}

impl WebElement {
  /// Wrap `element`, looking up or assigning its id.
  pub fn new(element: Element) -> Self {
    Self {
      id: element_id(&element),
      element,
    }
  }

  /// Stable id of the element.
  pub const fn id(&self) -> u64 {
    self.id
  }

  /// The DOM element.
  pub const fn element(&self) -> &Element {
    &self.element
  }
}

impl From<Element> for WebElement {
  fn from(element: Element) -> Self {
    Self::new(element)
  }
}

impl PartialEq for WebElement {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for WebElement {}

impl Hash for WebElement {
  fn hash<S: Hasher>(&self, state: &mut S) {
    self.id.hash(state);
  }
}

impl fmt::Debug for WebElement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "WebElement({}, <{}>)", self.id, self.element.tag_name().to_lowercase())
  }
}

/// The browser's `IntersectionObserver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPlatform;

impl Platform for WebPlatform {
  type Handle = WebElement;
  type Observer = WebObserver;

  fn create_observer<C: EntryHandler<Handle = WebElement>>(
    &self,
    init: &ObserverInit<WebElement>,
    handler: Arc<C>,
  ) -> VisibilityResult<WebObserver> {
    let callback = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
      move |entries: Array, _observer: IntersectionObserver| {
        let entries: Vec<_> = entries
          .iter()
          .filter_map(|value| value.dyn_into::<IntersectionObserverEntry>().ok())
          .map(|entry| to_visibility_entry(&entry))
          .collect();
        handler.on_entries(&entries);
      },
    );

    let options = IntersectionObserverInit::new();
    options.set_root(init.root.as_ref().map(|root| root.element().unchecked_ref::<Object>()));
    options.set_root_margin(&init.root_margin);
    options.set_threshold(&threshold_value(&init.threshold));

    let observer = IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
      .map_err(|e| VisibilityError::ObserverError(format!("IntersectionObserver: {e:?}")))?;

    Ok(WebObserver {
      observer,
      _callback: callback,
    })
  }
}

/// One `IntersectionObserver` plus the closure it calls back into.
pub struct WebObserver {
  observer: IntersectionObserver,
  _callback: Closure<dyn FnMut(Array, IntersectionObserver)>,
}

// SAFETY: wasm32 without threads; values never cross a thread boundary.
unsafe impl Send for WebObserver {}
unsafe impl Sync for WebObserver {}

impl fmt::Debug for WebObserver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WebObserver").finish_non_exhaustive()
  }
}

impl PlatformObserver for WebObserver {
  type Handle = WebElement;

  fn observe(&self, target: &WebElement) -> VisibilityResult<()> {
    self.observer.observe(target.element());
    Ok(())
  }

  fn unobserve(&self, target: &WebElement) {
    self.observer.unobserve(target.element());
  }

  fn disconnect(&self) {
    self.observer.disconnect();
  }
}

fn threshold_value(threshold: &Threshold) -> JsValue {
  match threshold {
    Threshold::Single(value) => JsValue::from_f64(*value),
    Threshold::Multiple(values) => values
      .iter()
      .map(|value| JsValue::from_f64(*value))
      .collect::<Array>()
      .into(),
  }
}

fn to_bounds(rect: &DomRectReadOnly) -> Bounds {
  Bounds::new(rect.x(), rect.y(), rect.width(), rect.height())
}

fn to_visibility_entry(entry: &IntersectionObserverEntry) -> VisibilityEntry<WebElement> {
  VisibilityEntry {
    target: WebElement::new(entry.target()),
    is_intersecting: entry.is_intersecting(),
    intersection_ratio: entry.intersection_ratio(),
    bounding_client_rect: Some(to_bounds(&entry.bounding_client_rect())),
    intersection_rect: Some(to_bounds(&entry.intersection_rect())),
    root_bounds: entry.root_bounds().as_ref().map(to_bounds),
    time: entry.time(),
  }
}
