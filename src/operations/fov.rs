use nalgebra::Rotation2;
use tracing::trace;

use crate::error::{RenderError, Result};
use crate::math::angle::{angle_diff, angle_of};
use crate::math::line_2d::Line2;
use crate::math::{Point2, TOLERANCE};
use crate::scene::{PortalId, Scene};

/// Below this wedge angle (radians) the viewpoint is treated as collinear
/// with the portal and nothing is visible through it.
pub const FOV_ANGLE_EPSILON: f64 = 1e-4;

/// Extra reach past the farther portal edge, so the wedge never folds back
/// over the portal segment.
const FAR_MARGIN: f64 = 0.01;

/// The region visible through a portal from a viewpoint.
///
/// Vertices run: the two portal edge points, the far end of the second
/// edge's ray, the arc between the rays, and the far end of the first edge's
/// ray. An empty polygon means nothing is visible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FovPolygon {
    vertices: Vec<Point2>,
}

impl FovPolygon {
    /// The polygon with no area.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    /// The two boundary rays, each from a portal edge point to its far
    /// point. `None` for an empty polygon.
    #[must_use]
    pub fn edge_lines(&self) -> Option<[Line2; 2]> {
        let [v0, v1, far1, ..] = self.vertices.as_slice() else {
            return None;
        };
        let far0 = self.vertices.last()?;
        Some([Line2::new(*v1, *far1), Line2::new(*v0, *far0)])
    }
}

/// Computes the visibility wedge through a portal.
#[derive(Debug, Clone, Copy)]
pub struct PortalFov {
    distance: f64,
    detail: usize,
}

impl PortalFov {
    /// Creates a new `PortalFov` query reaching at least `distance` from the
    /// viewpoint, with `detail` points on the far arc.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidParameters` if `detail < 2` or `distance`
    /// is not positive and finite.
    pub fn new(distance: f64, detail: usize) -> Result<Self> {
        if detail < 2 {
            return Err(RenderError::InvalidParameters(format!(
                "FOV detail must be at least 2, got {detail}"
            ))
            .into());
        }
        if !(distance.is_finite() && distance > 0.0) {
            return Err(RenderError::InvalidParameters(format!(
                "FOV distance must be positive, got {distance}"
            ))
            .into());
        }
        Ok(Self { distance, detail })
    }

    /// Wedge through `portal` as seen from `viewpoint`, in world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn execute(
        &self,
        scene: &Scene,
        portal: PortalId,
        viewpoint: &Point2,
    ) -> Result<FovPolygon> {
        let [v0, v1] = scene.portal_world_vertices(portal)?;
        Ok(self.from_segment(v0, v1, viewpoint))
    }

    /// Wedge through the segment `v0`-`v1` as seen from `viewpoint`.
    ///
    /// Returns an empty polygon when the viewpoint sits on an edge point or
    /// is collinear with the segment.
    #[must_use]
    pub fn from_segment(&self, v0: Point2, v1: Point2, viewpoint: &Point2) -> FovPolygon {
        let d0 = v0 - viewpoint;
        let d1 = v1 - viewpoint;
        if d0.norm() < TOLERANCE || d1.norm() < TOLERANCE {
            trace!("viewpoint on portal edge; empty FOV");
            return FovPolygon::empty();
        }

        let diff = angle_diff(angle_of(&d1), angle_of(&d0));
        if diff.abs() < FOV_ANGLE_EPSILON {
            trace!(diff, "viewpoint collinear with portal; empty FOV");
            return FovPolygon::empty();
        }

        let distance = self.distance.max(d0.norm().max(d1.norm()) + FAR_MARGIN);
        let far0 = viewpoint + d0.normalize() * distance;
        let far1 = viewpoint + d1.normalize() * distance;

        let mut vertices = Vec::with_capacity(self.detail + 2);
        vertices.extend([v0, v1, far1]);
        #[allow(clippy::cast_precision_loss)]
        let step = Rotation2::new(diff / (self.detail - 1) as f64);
        let mut offset = far1 - viewpoint;
        for _ in 1..self.detail - 1 {
            offset = step * offset;
            vertices.push(viewpoint + offset);
        }
        vertices.push(far0);
        FovPolygon { vertices }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scene::{PortalAnchor, PortalData};
    use approx::assert_relative_eq;

    fn unit_portal() -> (Point2, Point2) {
        (Point2::new(0.0, 0.5), Point2::new(0.0, -0.5))
    }

    #[test]
    fn vertex_count_is_detail_plus_two() {
        let (v0, v1) = unit_portal();
        for detail in [2, 3, 10, 33] {
            let fov = PortalFov::new(50.0, detail)
                .unwrap()
                .from_segment(v0, v1, &Point2::new(-2.0, 0.3));
            assert_eq!(fov.len(), detail + 2);
            assert!(fov.vertices().iter().all(|v| v.x.is_finite() && v.y.is_finite()));
        }
    }

    #[test]
    fn wedge_shape() {
        let (v0, v1) = unit_portal();
        let viewpoint = Point2::new(-1.0, 0.0);
        let fov = PortalFov::new(10.0, 5).unwrap().from_segment(v0, v1, &viewpoint);
        let vs = fov.vertices();
        assert_eq!(vs[0], v0);
        assert_eq!(vs[1], v1);
        // Every far point sits on the arc, beyond the portal.
        for far in &vs[2..] {
            assert_relative_eq!((far - viewpoint).norm(), 10.0, epsilon = 1e-9);
            assert!(far.x > 0.0);
        }
        let expected_far0 = viewpoint + (v0 - viewpoint).normalize() * 10.0;
        assert_relative_eq!(*vs.last().unwrap(), expected_far0, epsilon = 1e-9);
        // Symmetric viewpoint gives a symmetric fan.
        assert_relative_eq!(vs[4].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn distance_grows_past_far_edge() {
        let (v0, v1) = unit_portal();
        let viewpoint = Point2::new(-3.0, 0.0);
        let fov = PortalFov::new(0.5, 2).unwrap().from_segment(v0, v1, &viewpoint);
        let reach = (v0 - viewpoint).norm() + FAR_MARGIN;
        for far in &fov.vertices()[2..] {
            assert_relative_eq!((far - viewpoint).norm(), reach, epsilon = 1e-9);
        }
    }

    #[test]
    fn collinear_viewpoint_is_empty() {
        let (v0, v1) = unit_portal();
        let fov = PortalFov::new(50.0, 10).unwrap();
        assert!(fov.from_segment(v0, v1, &Point2::new(0.0, 2.0)).is_empty());
        assert!(fov.from_segment(v0, v1, &Point2::new(0.0, -7.0)).is_empty());
    }

    #[test]
    fn viewpoint_on_edge_is_empty() {
        let (v0, v1) = unit_portal();
        let fov = PortalFov::new(50.0, 10).unwrap();
        assert!(fov.from_segment(v0, v1, &v0).is_empty());
        assert!(fov.from_segment(v0, v1, &v1).is_empty());
        assert!(FovPolygon::empty().edge_lines().is_none());
    }

    #[test]
    fn edge_lines_follow_rays() {
        let (v0, v1) = unit_portal();
        let fov = PortalFov::new(10.0, 4).unwrap().from_segment(v0, v1, &Point2::new(-1.0, 0.0));
        let [first, second] = fov.edge_lines().unwrap();
        assert_eq!(first.start, v1);
        assert_eq!(first.end, fov.vertices()[2]);
        assert_eq!(second.start, v0);
        assert_eq!(second.end, *fov.vertices().last().unwrap());
    }

    #[test]
    fn scene_portal_fov() {
        let mut scene = Scene::new();
        let portal = scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::new(3.0, 1.0), 0.0)))
            .unwrap();
        let fov = PortalFov::new(20.0, 6)
            .unwrap()
            .execute(&scene, portal, &Point2::new(1.0, 1.0))
            .unwrap();
        assert_eq!(fov.len(), 8);
        assert_relative_eq!(fov.vertices()[0], Point2::new(3.0, 1.5), epsilon = 1e-12);
    }

    #[test]
    fn invalid_parameters() {
        assert!(PortalFov::new(10.0, 1).is_err());
        assert!(PortalFov::new(0.0, 4).is_err());
        assert!(PortalFov::new(f64::NAN, 4).is_err());
    }
}
