mod crossing;
mod fov;
mod portal_matrix;
mod traversal;

pub use crossing::{Crossing, DetectCrossing, ResolveCrossings};
pub use fov::{FovPolygon, PortalFov, FOV_ANGLE_EPSILON};
pub use portal_matrix::{portal_matrix, portal_matrix_between};
pub use traversal::{flip_factors, EnterPortal};
