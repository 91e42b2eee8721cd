pub mod transform;

pub use transform::{Transform2, Velocity2};

use crate::math::Point2;

/// The canonical portal segment in portal-local space.
///
/// Every portal shares this shape; only the transform differs. The local +X
/// axis is the portal's front-facing normal.
#[must_use]
pub fn portal_local_vertices() -> [Point2; 2] {
    [Point2::new(0.0, 0.5), Point2::new(0.0, -0.5)]
}
