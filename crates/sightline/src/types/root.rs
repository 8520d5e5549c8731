/*! Observation roots. */

use std::fmt;

/// The container whose bounds define "visible".
///
/// `Viewport` is the reserved sentinel for the platform's default viewport.
/// It is translated to "no root" when the platform primitive is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Root<H> {
  /// The platform's default viewport.
  #[default]
  Viewport,
  /// An explicit scrolling container.
  Element(H),
}

impl<H> Root<H> {
  /// The explicit root element, or `None` for the viewport.
  pub const fn element(&self) -> Option<&H> {
    match self {
      Self::Viewport => None,
      Self::Element(root) => Some(root),
    }
  }

  /// Check if this is the default viewport.
  pub const fn is_viewport(&self) -> bool {
    matches!(self, Self::Viewport)
  }
}

impl<H> From<Option<H>> for Root<H> {
  fn from(root: Option<H>) -> Self {
    root.map_or(Self::Viewport, Self::Element)
  }
}

impl<H: fmt::Display> fmt::Display for Root<H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Viewport => f.write_str("viewport"),
      Self::Element(root) => write!(f, "{root}"),
    }
  }
}
