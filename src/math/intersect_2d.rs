use super::{Point2, Vector2, TOLERANCE};

/// Result of a parametric line-line intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineIntersection {
    /// Intersection point.
    pub position: Point2,
    /// Parameter along the first line, `0` at its start and `1` at its end.
    pub t_first: f64,
    /// Parameter along the second line.
    pub t_last: f64,
}

/// Parametric 2D line-line intersection.
///
/// Given lines `a0 + t * (a1 - a0)` and `b0 + u * (b1 - b0)`, returns the
/// intersection and both parameters, or `None` if the lines are parallel.
/// With `segment_only`, intersections outside `[0, 1]` on either line are
/// rejected.
#[must_use]
pub fn line_intersection(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
    segment_only: bool,
) -> Option<LineIntersection> {
    let da = a1 - a0;
    let db = b1 - b0;

    let cross = cross_2d(&da, &db);
    if cross.abs() < TOLERANCE {
        return None;
    }

    let d = b0 - a0;
    let t = cross_2d(&d, &db) / cross;
    let u = cross_2d(&d, &da) / cross;

    if segment_only && !((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)) {
        return None;
    }

    Some(LineIntersection {
        position: a0 + da * t,
        t_first: t,
        t_last: u,
    })
}

/// Z component of the 3D cross product of two XY vectors.
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Returns true if `point` lies inside the axis-aligned rectangle spanned by
/// two opposite corners (boundary included).
#[must_use]
pub fn point_in_rectangle(corner0: &Point2, corner1: &Point2, point: &Point2) -> bool {
    let (min_x, max_x) = min_max(corner0.x, corner1.x);
    let (min_y, max_y) = min_max(corner0.y, corner1.y);
    (min_x..=max_x).contains(&point.x) && (min_y..=max_y).contains(&point.y)
}

/// Returns true if the segment is contained in or crosses the rectangle.
#[must_use]
pub fn segment_in_rectangle(
    corner0: &Point2,
    corner1: &Point2,
    begin: &Point2,
    end: &Point2,
) -> bool {
    if point_in_rectangle(corner0, corner1, begin) || point_in_rectangle(corner0, corner1, end) {
        return true;
    }
    let corners = [
        *corner0,
        Point2::new(corner1.x, corner0.y),
        *corner1,
        Point2::new(corner0.x, corner1.y),
    ];
    (0..corners.len()).any(|i| {
        line_intersection(&corners[i], &corners[(i + 1) % 4], begin, end, true).is_some()
    })
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
