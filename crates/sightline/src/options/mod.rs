/*!
Option normalization.

Callers pass loosely-typed [`ObserveOptions`]. Before anything touches the
registration table or the observer pool they are normalized into
[`NormalizedOptions`]: defaults filled in, the root margin expanded to its
four-value form. Normalized options are what registrations compare against
and what pooled observers are keyed by.
*/

mod margin;
mod threshold;

pub use margin::RootMargin;
pub use threshold::Threshold;

use derive_more::Display;
use serde::Deserialize;

use crate::platform::ObserverInit;
use crate::types::{Root, VisibilityResult};

/// Caller-supplied options for [`Visibility::observe`](crate::Visibility::observe).
///
/// Every field is optional. Missing fields take the context defaults
/// (see [`VisibilityBuilder`](crate::VisibilityBuilder)).
///
/// # Example
///
/// ```
/// use sightline::ObserveOptions;
///
/// let options = ObserveOptions::<u32>::new()
///   .root_margin("10px 5%")
///   .threshold([0.0, 0.5, 1.0])
///   .once(true);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct ObserveOptions<H> {
  /// Margin around the root, grown (or shrunk) before computing intersections.
  #[serde(default)]
  pub root_margin: Option<RootMargin>,
  /// Visible ratio(s) at which a change is reported.
  #[serde(default)]
  pub threshold: Option<Threshold>,
  /// Fire at most once, on the first intersecting change, then unregister.
  #[serde(default)]
  pub once: Option<bool>,
  /// Scrolling container. `None` observes against the viewport.
  #[serde(skip)]
  pub root: Option<H>,
}

impl<H> Default for ObserveOptions<H> {
  fn default() -> Self {
    Self {
      root_margin: None,
      threshold: None,
      once: None,
      root: None,
    }
  }
}

impl<H> ObserveOptions<H> {
  /// Empty options (all defaults).
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse options from JSON, e.g. `{"rootMargin": "10px", "threshold": [0, 1], "once": true}`.
  ///
  /// The root cannot be expressed in JSON; set it with [`ObserveOptions::root`].
  pub fn from_json(json: &str) -> VisibilityResult<Self> {
    Ok(serde_json::from_str(json)?)
  }

  /// Set the root margin.
  #[must_use]
  pub fn root_margin(mut self, margin: impl Into<RootMargin>) -> Self {
    self.root_margin = Some(margin.into());
    self
  }

  /// Set the threshold(s).
  #[must_use]
  pub fn threshold(mut self, threshold: impl Into<Threshold>) -> Self {
    self.threshold = Some(threshold.into());
    self
  }

  /// Set fire-once behaviour.
  #[must_use]
  pub fn once(mut self, once: bool) -> Self {
    self.once = Some(once);
    self
  }

  /// Observe against `root` instead of the viewport.
  #[must_use]
  pub fn root(mut self, root: H) -> Self {
    self.root = Some(root);
    self
  }

  /// Normalize against the built-in defaults.
  pub fn normalize(self) -> VisibilityResult<NormalizedOptions<H>> {
    self.normalize_with(&ObserveDefaults::default())
  }

  /// Normalize against the given defaults.
  ///
  /// Fails only when the root margin has no values or more than four.
  pub fn normalize_with(self, defaults: &ObserveDefaults) -> VisibilityResult<NormalizedOptions<H>> {
    let root_margin = match &self.root_margin {
      Some(margin) => margin.expand()?,
      None => defaults.root_margin.clone(),
    };

    Ok(NormalizedOptions {
      root: Root::from(self.root),
      root_margin,
      threshold: self.threshold.unwrap_or_else(|| defaults.threshold.clone()),
      once: self.once.unwrap_or(defaults.once),
    })
  }
}

/// Context-wide defaults for options the caller leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveDefaults {
  /// Already expanded to four values.
  pub(crate) root_margin: String,
  pub(crate) threshold: Threshold,
  pub(crate) once: bool,
}

impl ObserveDefaults {
  /// Build defaults, validating the root margin.
  pub fn new(
    root_margin: impl Into<RootMargin>,
    threshold: impl Into<Threshold>,
    once: bool,
  ) -> VisibilityResult<Self> {
    Ok(Self {
      root_margin: root_margin.into().expand()?,
      threshold: threshold.into(),
      once,
    })
  }

  /// Canonical default root margin.
  pub fn root_margin(&self) -> &str {
    &self.root_margin
  }

  /// Default threshold.
  pub const fn threshold(&self) -> &Threshold {
    &self.threshold
  }

  /// Default fire-once behaviour.
  pub const fn once(&self) -> bool {
    self.once
  }
}

impl Default for ObserveDefaults {
  fn default() -> Self {
    Self {
      root_margin: margin::DEFAULT_ROOT_MARGIN.to_owned(),
      threshold: Threshold::default(),
      once: false,
    }
  }
}

/// Options in canonical, comparable form.
#[derive(Debug, Clone)]
pub struct NormalizedOptions<H> {
  /// Scroll container, or the viewport.
  pub root: Root<H>,
  /// Exactly four space-separated values.
  pub root_margin: String,
  /// Threshold(s), as given or defaulted.
  pub threshold: Threshold,
  /// Unregister after the first intersecting change.
  pub once: bool,
}

impl<H> NormalizedOptions<H> {
  /// Key selecting a pooled observer within a root.
  ///
  /// Root is excluded (the pool is already scoped by root) and so is `once`
  /// (once-wrapping happens per listener).
  pub fn signature(&self) -> Signature {
    Signature(format!("{};{}", self.root_margin, self.threshold))
  }

  /// Check if both describe the same delivery behaviour for one root.
  pub fn same_behavior(&self, other: &Self) -> bool {
    self.root_margin == other.root_margin
      && self.threshold == other.threshold
      && self.once == other.once
  }
}

impl<H: Clone> NormalizedOptions<H> {
  /// Construction options for the platform primitive.
  pub fn observer_init(&self) -> ObserverInit<H> {
    ObserverInit {
      root: self.root.element().cloned(),
      root_margin: self.root_margin.clone(),
      threshold: self.threshold.clone(),
    }
  }
}

impl<H: PartialEq> PartialEq for NormalizedOptions<H> {
  fn eq(&self, other: &Self) -> bool {
    self.root == other.root && self.same_behavior(other)
  }
}

/// Pooled observer key derived from normalized options, `"{rootMargin};{threshold}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct Signature(String);

impl Signature {
  /// The signature text.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}
