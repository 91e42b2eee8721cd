pub mod angle;
pub mod intersect_2d;
pub mod line_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 4x4 transformation matrix.
///
/// 2D transforms are embedded in homogeneous 3D so view matrices can carry a
/// depth offset along Z.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Transforms a 2D point by a 4x4 matrix (z = 0, w = 1).
#[must_use]
pub fn transform_point(matrix: &Matrix4, point: &Point2) -> Point2 {
    let v = matrix * nalgebra::Vector4::new(point.x, point.y, 0.0, 1.0);
    Point2::new(v.x, v.y)
}

/// Transforms a 2D direction by a 4x4 matrix, ignoring translation.
#[must_use]
pub fn transform_direction(matrix: &Matrix4, dir: &Vector2) -> Vector2 {
    let v = matrix * nalgebra::Vector4::new(dir.x, dir.y, 0.0, 0.0);
    Vector2::new(v.x, v.y)
}

/// Transforms every point of a slice.
#[must_use]
pub fn transform_points(matrix: &Matrix4, points: &[Point2]) -> Vec<Point2> {
    points.iter().map(|p| transform_point(matrix, p)).collect()
}

/// Inverts a transform matrix.
///
/// Transforms built from [`crate::geometry::Transform2`] always have non-zero
/// scale, so a failed inversion means a corrupted transform.
#[must_use]
pub fn invert(matrix: &Matrix4) -> Matrix4 {
    match matrix.try_inverse() {
        Some(inverse) => inverse,
        None => panic!("transform matrix is singular: scale must never be zero"),
    }
}
