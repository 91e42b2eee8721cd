use crate::error::{Result, SceneError};
use crate::geometry::{Transform2, Velocity2};
use crate::math::{Point2, Vector2};

slotmap::new_key_type! {
    /// Unique identifier for a wall in the scene.
    pub struct WallId;
}

/// A position along one edge of a wall polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCoord {
    /// Index of the edge starting at `vertices[edge]`.
    pub edge: usize,
    /// Parameter along the edge in `[0, 1]`.
    pub t: f64,
}

impl EdgeCoord {
    #[must_use]
    pub fn new(edge: usize, t: f64) -> Self {
        Self {
            edge,
            t: t.clamp(0.0, 1.0),
        }
    }
}

/// A closed polygon that portals can be placed on.
#[derive(Debug, Clone)]
pub struct WallData {
    /// Polygon vertices in wall-local space. Edge `i` runs from vertex `i`
    /// to vertex `i + 1` (wrapping).
    pub vertices: Vec<Point2>,
    /// Placement of the wall in the world.
    pub transform: Transform2,
    /// Velocity of the wall's origin.
    pub velocity: Velocity2,
}

impl WallData {
    /// Creates a static wall.
    #[must_use]
    pub fn new(vertices: Vec<Point2>, transform: Transform2) -> Self {
        Self {
            vertices,
            transform,
            velocity: Velocity2::default(),
        }
    }

    /// Number of edges of the closed polygon.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        if self.vertices.len() < 2 {
            0
        } else {
            self.vertices.len()
        }
    }

    /// Local position and rotation of a point on an edge.
    ///
    /// The rotation lays the portal segment along the edge direction with the
    /// portal's +X normal on the edge's right-hand side, which is outward for
    /// counter-clockwise polygons.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::EdgeOutOfRange` if the edge does not exist, or a
    /// degenerate-geometry error for a zero-length edge.
    pub fn edge_placement(&self, coord: &EdgeCoord) -> Result<(Point2, f64)> {
        let edge_count = self.edge_count();
        if coord.edge >= edge_count {
            return Err(SceneError::EdgeOutOfRange {
                edge: coord.edge,
                edge_count,
            }
            .into());
        }
        let v0 = self.vertices[coord.edge];
        let v1 = self.vertices[(coord.edge + 1) % edge_count];
        let d: Vector2 = v1 - v0;
        if d.norm() < crate::math::TOLERANCE {
            return Err(crate::error::GeometryError::Degenerate(format!(
                "wall edge {} has zero length",
                coord.edge
            ))
            .into());
        }
        let position = v0 + d * coord.t;
        Ok((position, (-d.x).atan2(d.y)))
    }
}
