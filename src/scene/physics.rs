use crate::error::{Result, SceneError};
use crate::geometry::{Transform2, Velocity2};
use crate::math::{Point2, Vector2};

use super::entity::{HasTransform, Portalable};

/// Opaque handle of a rigid body owned by the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// The narrow slice of a rigid-body engine the portal code needs.
///
/// Timestep integration stays inside the engine; [`PhysicsBackend::step`]
/// only asks it to advance.
pub trait PhysicsBackend {
    fn contains_body(&self, body: BodyHandle) -> bool;
    fn body_position(&self, body: BodyHandle) -> Point2;
    fn body_rotation(&self, body: BodyHandle) -> f64;
    fn set_body_position_rotation(&mut self, body: BodyHandle, position: Point2, rotation: f64);
    fn body_velocity(&self, body: BodyHandle) -> Velocity2;
    fn set_body_velocity(&mut self, body: BodyHandle, velocity: Velocity2);
    fn step(&mut self, dt: f64);
}

/// An entity whose motion lives in the physics engine.
///
/// The engine only knows position and rotation; scale and mirroring are
/// kept here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBody {
    pub handle: BodyHandle,
    pub(crate) scale: Vector2,
    pub mirror_x: bool,
}

impl PhysicsBody {
    /// A body with unit scale.
    #[must_use]
    pub fn new(handle: BodyHandle) -> Self {
        Self {
            handle,
            scale: Vector2::new(1.0, 1.0),
            mirror_x: false,
        }
    }

    #[must_use]
    pub fn scale(&self) -> Vector2 {
        self.scale
    }

    /// Pairs the body with its engine so it can be read and written as a
    /// [`Portalable`].
    ///
    /// # Errors
    ///
    /// Returns `SceneError::BodyNotFound` if the engine does not know the
    /// body.
    pub fn bind<'a, P: PhysicsBackend + ?Sized>(
        &'a mut self,
        physics: &'a mut P,
    ) -> Result<BoundBody<'a, P>> {
        if !physics.contains_body(self.handle) {
            return Err(SceneError::BodyNotFound(self.handle.0).into());
        }
        Ok(BoundBody {
            body: self,
            physics,
        })
    }
}

/// A [`PhysicsBody`] together with the engine that simulates it.
pub struct BoundBody<'a, P: PhysicsBackend + ?Sized> {
    body: &'a mut PhysicsBody,
    physics: &'a mut P,
}

impl<P: PhysicsBackend + ?Sized> HasTransform for BoundBody<'_, P> {
    fn transform(&self) -> Transform2 {
        Transform2 {
            position: self.physics.body_position(self.body.handle),
            rotation: self.physics.body_rotation(self.body.handle),
            scale: self.body.scale,
            mirror_x: self.body.mirror_x,
        }
    }

    fn set_transform(&mut self, transform: Transform2) {
        self.body.scale = transform.scale;
        self.body.mirror_x = transform.mirror_x;
        self.physics
            .set_body_position_rotation(self.body.handle, transform.position, transform.rotation);
    }
}

impl<P: PhysicsBackend + ?Sized> Portalable for BoundBody<'_, P> {
    fn velocity(&self) -> Velocity2 {
        self.physics.body_velocity(self.body.handle)
    }

    fn set_velocity(&mut self, velocity: Velocity2) {
        self.physics.set_body_velocity(self.body.handle, velocity);
    }
}
