/*! Error types for sightline operations. */

/// Errors that can occur while observing visibility.
#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
  /// The root margin did not contain 1 to 4 whitespace-separated values.
  #[error(
    "Invalid root margin, expected a single number or a string containing 1 to 4 numbers \
     suffixed by \"px\" or \"%\" and separated by whitespace: {0}"
  )]
  InvalidRootMargin(String),

  /// Options could not be parsed from JSON.
  #[error("Invalid options: {0}")]
  InvalidOptions(#[from] serde_json::Error),

  /// The platform's observation primitive failed.
  #[error("Observer error: {0}")]
  ObserverError(String),
}

/// Result type for sightline operations.
pub type VisibilityResult<T> = Result<T, VisibilityError>;
