use nalgebra::Vector3;

use crate::geometry::{Transform2, Velocity2};
use crate::math::{invert, Matrix4, Point2};

use super::physics::PhysicsBody;
use super::portal::PortalId;

slotmap::new_key_type! {
    /// Unique identifier for an entity in the scene.
    pub struct EntityId;
}

/// Anything with a readable and writable transform.
pub trait HasTransform {
    fn transform(&self) -> Transform2;
    fn set_transform(&mut self, transform: Transform2);
}

/// Anything that can be carried through a portal.
pub trait Portalable: HasTransform {
    fn velocity(&self) -> Velocity2;
    fn set_velocity(&mut self, velocity: Velocity2);

    /// When true, a moving portal's own velocity is not transferred on
    /// traversal.
    fn ignores_portal_velocity(&self) -> bool {
        false
    }
}

/// A body moved directly by its own velocity, outside the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematic {
    pub transform: Transform2,
    pub velocity: Velocity2,
}

impl Kinematic {
    #[must_use]
    pub fn new(transform: Transform2, velocity: Velocity2) -> Self {
        Self {
            transform,
            velocity,
        }
    }

    /// Integrates position and rotation over `dt`.
    pub fn advance(&mut self, dt: f64) {
        self.transform.position += self.velocity.linear * dt;
        self.transform.rotation += self.velocity.angular * dt;
    }
}

impl HasTransform for Kinematic {
    fn transform(&self) -> Transform2 {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform2) {
        self.transform = transform;
    }
}

impl Portalable for Kinematic {
    fn velocity(&self) -> Velocity2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Velocity2) {
        self.velocity = velocity;
    }
}

/// An orthographic 2D camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub transform: Transform2,
    pub velocity: Velocity2,
    /// World units visible vertically at unit scale.
    pub view_height: f64,
    /// Width divided by height of the viewport.
    pub aspect: f64,
}

impl Camera {
    #[must_use]
    pub fn new(transform: Transform2, view_height: f64, aspect: f64) -> Self {
        Self {
            transform,
            velocity: Velocity2::default(),
            view_height,
            aspect,
        }
    }

    /// World-to-clip matrix: the visible area maps onto `[-1, 1]²`.
    #[must_use]
    pub fn view_matrix(&self) -> Matrix4 {
        let half_h = self.view_height * 0.5;
        let half_w = half_h * self.aspect;
        Matrix4::new_nonuniform_scaling(&Vector3::new(1.0 / half_w, 1.0 / half_h, 1.0))
            * invert(&self.transform.matrix())
    }

    /// Point the scene is seen from.
    #[must_use]
    pub fn viewpoint(&self) -> Point2 {
        self.transform.position
    }

    pub fn advance(&mut self, dt: f64) {
        self.transform.position += self.velocity.linear * dt;
        self.transform.rotation += self.velocity.angular * dt;
    }
}

impl HasTransform for Camera {
    fn transform(&self) -> Transform2 {
        self.transform
    }

    fn set_transform(&mut self, transform: Transform2) {
        self.transform = transform;
    }
}

impl Portalable for Camera {
    fn velocity(&self) -> Velocity2 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Velocity2) {
        self.velocity = velocity;
    }

    fn ignores_portal_velocity(&self) -> bool {
        true
    }
}

/// The capabilities an entity was built with.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Kinematic(Kinematic),
    /// Position, rotation and velocity live in the physics engine.
    Body(PhysicsBody),
    Camera(Camera),
}

/// State left on an entity for one step after it crossed a portal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalRecord {
    /// Portal the entity came out of.
    pub exit: PortalId,
    /// Transform right after traversal.
    pub transform: Transform2,
    /// Velocity right after traversal.
    pub velocity: Velocity2,
    /// Step index the crossing happened in.
    pub step: u64,
}

/// Data associated with an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    pub kind: EntityKind,
    /// Entities that are not portalable are never checked for crossings.
    pub portalable: bool,
    pub(crate) last_position: Option<Point2>,
    pub(crate) traversal: Option<TraversalRecord>,
}

impl EntityData {
    /// Creates a portalable entity.
    #[must_use]
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            portalable: true,
            last_position: None,
            traversal: None,
        }
    }

    #[must_use]
    pub fn with_portalable(mut self, portalable: bool) -> Self {
        self.portalable = portalable;
        self
    }

    /// The record of a crossing made during the previous or current step.
    #[must_use]
    pub fn traversal(&self) -> Option<&TraversalRecord> {
        self.traversal.as_ref()
    }

    /// Position at the start of the current step, if the entity has been
    /// through a step yet.
    #[must_use]
    pub fn last_position(&self) -> Option<Point2> {
        self.last_position
    }
}
