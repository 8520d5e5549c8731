/*! Core types for sightline. */

mod entry;
mod error;
mod geometry;
mod ids;
mod root;

pub use entry::VisibilityEntry;
pub use error::{VisibilityError, VisibilityResult};
pub use geometry::Bounds;
pub(crate) use ids::{ListenerId, ObserverId};
pub use root::Root;
