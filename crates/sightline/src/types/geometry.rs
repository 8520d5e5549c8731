/*! Geometry reported alongside visibility changes. */

use serde::Serialize;

/// Rectangle in the platform's coordinate space.
///
/// Bounds are carried from the platform primitive to callbacks as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Bounds {
  /// Left edge.
  pub x: f64,
  /// Top edge.
  pub y: f64,
  /// Width.
  pub w: f64,
  /// Height.
  pub h: f64,
}

impl Bounds {
  /// Create new bounds.
  pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
    Self { x, y, w, h }
  }
}
