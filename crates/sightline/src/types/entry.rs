/*! Visibility change records delivered to callbacks. */

use super::Bounds;
use serde::Serialize;

/// A single visibility change for one target.
///
/// Built by the platform primitive. Only `target` and `is_intersecting` drive
/// the pooling engine; the remaining fields are passed through to callbacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityEntry<H> {
  /// The element whose visibility changed.
  pub target: H,
  /// Whether the target now intersects the (margin-adjusted) root.
  pub is_intersecting: bool,
  /// Fraction of the target that is visible (0.0-1.0).
  pub intersection_ratio: f64,
  /// Target bounds.
  pub bounding_client_rect: Option<Bounds>,
  /// Visible part of the target.
  pub intersection_rect: Option<Bounds>,
  /// None when the root bounds are unavailable (e.g. cross-origin viewport).
  pub root_bounds: Option<Bounds>,
  /// Platform timestamp of the change, in milliseconds.
  pub time: f64,
}

impl<H> VisibilityEntry<H> {
  /// Entry without geometry. Ratio is 1.0 when intersecting, 0.0 otherwise.
  pub const fn new(target: H, is_intersecting: bool) -> Self {
    Self {
      target,
      is_intersecting,
      intersection_ratio: if is_intersecting { 1.0 } else { 0.0 },
      bounding_client_rect: None,
      intersection_rect: None,
      root_bounds: None,
      time: 0.0,
    }
  }

  /// Set the intersection ratio.
  #[must_use]
  pub fn with_ratio(mut self, ratio: f64) -> Self {
    self.intersection_ratio = ratio;
    self
  }
}
