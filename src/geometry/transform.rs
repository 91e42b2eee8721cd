use nalgebra::Vector3;

use crate::error::{GeometryError, Result};
use crate::math::angle::angles_close;
use crate::math::{transform_point, Matrix4, Point2, Vector2};

/// A 2D affine transform: translation, rotation, signed non-uniform scale and
/// a horizontal mirror flag.
///
/// The matrix is `T * R * S` where `S` uses [`Transform2::world_scale`], i.e.
/// the X scale is negated while `mirror_x` is set. Rotation is kept unwrapped;
/// compare through [`Transform2::almost_equal`] which works modulo 2π.
///
/// Scale components are never zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2 {
    pub position: Point2,
    /// Radians, counter-clockwise.
    pub rotation: f64,
    pub(crate) scale: Vector2,
    pub mirror_x: bool,
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2 {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point2::origin(),
            rotation: 0.0,
            scale: Vector2::new(1.0, 1.0),
            mirror_x: false,
        }
    }

    /// Creates a transform with unit scale.
    #[must_use]
    pub fn from_position_rotation(position: Point2, rotation: f64) -> Self {
        Self {
            position,
            rotation,
            ..Self::identity()
        }
    }

    /// Creates a transform from all components.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroScale` if either scale component is zero.
    pub fn new(position: Point2, rotation: f64, scale: Vector2, mirror_x: bool) -> Result<Self> {
        check_scale(&scale)?;
        Ok(Self {
            position,
            rotation,
            scale,
            mirror_x,
        })
    }

    /// Creates a transform with uniform scale `size`.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroScale` if `size` is zero.
    pub fn with_size(position: Point2, rotation: f64, size: f64) -> Result<Self> {
        Self::new(position, rotation, Vector2::new(size, size), false)
    }

    /// Stored scale, without the mirror applied.
    #[must_use]
    pub fn scale(&self) -> Vector2 {
        self.scale
    }

    /// Replaces the scale.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroScale` if either component is zero.
    pub fn set_scale(&mut self, scale: Vector2) -> Result<()> {
        check_scale(&scale)?;
        self.scale = scale;
        Ok(())
    }

    /// Signed scale as it enters the matrix (X negated while mirrored).
    #[must_use]
    pub fn world_scale(&self) -> Vector2 {
        if self.mirror_x {
            Vector2::new(-self.scale.x, self.scale.y)
        } else {
            self.scale
        }
    }

    /// Returns true if this transform flips handedness.
    #[must_use]
    pub fn is_orientation_flipped(&self) -> bool {
        let s = self.world_scale();
        s.x * s.y < 0.0
    }

    /// Copy with the mirror flag toggled.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            mirror_x: !self.mirror_x,
            ..*self
        }
    }

    /// Builds the homogeneous matrix `T * R * S`.
    #[must_use]
    pub fn matrix(&self) -> Matrix4 {
        let s = self.world_scale();
        Matrix4::new_translation(&Vector3::new(self.position.x, self.position.y, 0.0))
            * Matrix4::from_axis_angle(&Vector3::z_axis(), self.rotation)
            * Matrix4::new_nonuniform_scaling(&Vector3::new(s.x, s.y, 1.0))
    }

    /// Expresses this transform, local to `parent`, in the parent's space.
    ///
    /// Exact for uniformly scaled parents; non-uniform parents are
    /// approximated per axis.
    #[must_use]
    pub fn compose(&self, parent: &Transform2) -> Transform2 {
        let rotation = if parent.is_orientation_flipped() {
            parent.rotation - self.rotation
        } else {
            parent.rotation + self.rotation
        };
        Transform2 {
            position: transform_point(&parent.matrix(), &self.position),
            rotation,
            scale: self.scale.component_mul(&parent.scale),
            mirror_x: self.mirror_x ^ parent.mirror_x,
        }
    }

    /// Checks every component is within `delta` of `other`.
    ///
    /// Rotation is compared modulo 2π and scale after applying the mirror.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is not positive.
    #[must_use]
    pub fn almost_equal(&self, other: &Transform2, delta: f64) -> bool {
        assert!(delta > 0.0, "comparison delta must be positive");
        let a = self.world_scale();
        let b = other.world_scale();
        (self.position - other.position).norm() <= delta
            && angles_close(self.rotation, other.rotation, delta)
            && (a.x - b.x).abs() <= delta
            && (a.y - b.y).abs() <= delta
    }

    /// Like [`Transform2::almost_equal`], but a component also passes when its
    /// relative difference is within `ratio_delta`.
    ///
    /// # Panics
    ///
    /// Panics if `delta` or `ratio_delta` is not positive.
    #[must_use]
    pub fn almost_equal_ratio(&self, other: &Transform2, delta: f64, ratio_delta: f64) -> bool {
        assert!(delta > 0.0, "comparison delta must be positive");
        assert!(ratio_delta > 0.0, "comparison ratio delta must be positive");
        let close = |a: f64, b: f64| {
            let diff = (a - b).abs();
            diff <= delta || diff <= ratio_delta * a.abs().max(b.abs())
        };
        let a = self.world_scale();
        let b = other.world_scale();
        close(self.position.x, other.position.x)
            && close(self.position.y, other.position.y)
            && angles_close(self.rotation, other.rotation, delta)
            && close(a.x, b.x)
            && close(a.y, b.y)
    }
}

fn check_scale(scale: &Vector2) -> Result<()> {
    if scale.x == 0.0 {
        return Err(GeometryError::ZeroScale { axis: "x" }.into());
    }
    if scale.y == 0.0 {
        return Err(GeometryError::ZeroScale { axis: "y" }.into());
    }
    Ok(())
}

/// Linear and angular velocity of a body or portal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity2 {
    pub linear: Vector2,
    /// Radians per second, counter-clockwise.
    pub angular: f64,
}

impl Velocity2 {
    #[must_use]
    pub fn new(linear: Vector2, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Velocity of the point at offset `r` from the rotation centre.
    #[must_use]
    pub fn at_offset(&self, r: &Vector2) -> Velocity2 {
        Velocity2 {
            linear: self.linear + Vector2::new(-r.y, r.x) * self.angular,
            angular: self.angular,
        }
    }
}
