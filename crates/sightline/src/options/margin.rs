/*!
Root margin shorthand expansion.

Follows the CSS margin shorthand rules: 1 value applies to all sides,
2 values are `vertical horizontal`, 3 values are `top horizontal bottom`,
4 values are `top right bottom left`.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{VisibilityError, VisibilityResult};

/// Canonical margin when none is given.
pub(crate) const DEFAULT_ROOT_MARGIN: &str = "0px 0px 0px 0px";

/// Caller-supplied root margin: a pixel number or a CSS margin string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RootMargin {
  /// Pixels on every side.
  Pixels(f64),
  /// CSS margin shorthand, e.g. `"10px 5%"`.
  Css(String),
}

impl RootMargin {
  /// Expand to exactly four space-separated values.
  ///
  /// # Example
  ///
  /// ```
  /// use sightline::RootMargin;
  ///
  /// assert_eq!(RootMargin::from("10px 5px").expand().unwrap(), "10px 5px 10px 5px");
  /// assert_eq!(RootMargin::from(42).expand().unwrap(), "42px 42px 42px 42px");
  /// assert!(RootMargin::from("1px 2px 3px 4px 5px").expand().is_err());
  /// ```
  pub fn expand(&self) -> VisibilityResult<String> {
    let raw = match self {
      Self::Pixels(px) => format!("{px}px"),
      Self::Css(css) => css.clone(),
    };

    let parts: Vec<&str> = raw.split_whitespace().collect();
    let sides = match *parts.as_slice() {
      [all] => [all, all, all, all],
      [vertical, horizontal] => [vertical, horizontal, vertical, horizontal],
      [top, horizontal, bottom] => [top, horizontal, bottom, horizontal],
      [top, right, bottom, left] => [top, right, bottom, left],
      _ => return Err(VisibilityError::InvalidRootMargin(raw.clone())),
    };

    Ok(sides.join(" "))
  }
}

impl Default for RootMargin {
  fn default() -> Self {
    Self::Css(DEFAULT_ROOT_MARGIN.to_owned())
  }
}

impl fmt::Display for RootMargin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pixels(px) => write!(f, "{px}"),
      Self::Css(css) => f.write_str(css),
    }
  }
}

impl From<f64> for RootMargin {
  fn from(px: f64) -> Self {
    Self::Pixels(px)
  }
}

impl From<i32> for RootMargin {
  fn from(px: i32) -> Self {
    Self::Pixels(f64::from(px))
  }
}

impl From<&str> for RootMargin {
  fn from(css: &str) -> Self {
    Self::Css(css.to_owned())
  }
}

impl From<String> for RootMargin {
  fn from(css: String) -> Self {
    Self::Css(css)
  }
}
