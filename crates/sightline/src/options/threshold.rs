/*! Intersection ratio thresholds. */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intersection ratio breakpoint(s) at which the platform reports a change.
///
/// Passed to the platform unchanged; range checks are the platform's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
  /// One breakpoint.
  Single(f64),
  /// Several breakpoints.
  Multiple(Vec<f64>),
}

impl Threshold {
  /// All breakpoints as a slice.
  pub fn values(&self) -> &[f64] {
    match self {
      Self::Single(value) => std::slice::from_ref(value),
      Self::Multiple(values) => values,
    }
  }
}

impl Default for Threshold {
  fn default() -> Self {
    Self::Single(0.0)
  }
}

/// Comma-separated, e.g. `0` or `0,0.5,1`.
impl fmt::Display for Threshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Single(value) => write!(f, "{value}"),
      Self::Multiple(values) => {
        for (i, value) in values.iter().enumerate() {
          if i > 0 {
            f.write_str(",")?;
          }
          write!(f, "{value}")?;
        }
        Ok(())
      }
    }
  }
}

impl From<f64> for Threshold {
  fn from(value: f64) -> Self {
    Self::Single(value)
  }
}

impl From<Vec<f64>> for Threshold {
  fn from(values: Vec<f64>) -> Self {
    Self::Multiple(values)
  }
}

impl From<&[f64]> for Threshold {
  fn from(values: &[f64]) -> Self {
    Self::Multiple(values.to_vec())
  }
}

impl<const N: usize> From<[f64; N]> for Threshold {
  fn from(values: [f64; N]) -> Self {
    Self::Multiple(values.to_vec())
  }
}
