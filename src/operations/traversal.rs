use tracing::debug;

use crate::error::Result;
use crate::geometry::{Transform2, Velocity2};
use crate::math::angle::angle_wrap;
use crate::math::{transform_direction, transform_point, Vector2};
use crate::scene::{
    EntityId, EntityKind, HasTransform, PhysicsBackend, PortalId, Portalable, Scene,
    TraversalRecord,
};

use super::portal_matrix::portal_matrix;

/// Per-axis sign factors applied when passing from a portal with world scale
/// `enter` to one with world scale `exit`.
///
/// `flip_x` is `-1` when the X signs are equal and `flip_y` is `-1` when the
/// Y signs differ. The asymmetry is the mirrored-exit convention of
/// [`portal_matrix`]: these are exactly the signs of the portal matrix's
/// linear part once rotations are factored out.
#[must_use]
pub fn flip_factors(enter: &Vector2, exit: &Vector2) -> (f64, f64) {
    let flip_x = if enter.x.signum() == exit.x.signum() {
        -1.0
    } else {
        1.0
    };
    let flip_y = if enter.y.signum() == exit.y.signum() {
        1.0
    } else {
        -1.0
    };
    (flip_x, flip_y)
}

/// Re-expresses transforms and velocities on the far side of a portal.
///
/// Apply exactly once per physical crossing; applying it twice transforms
/// the entity twice.
#[derive(Debug, Clone, Copy)]
pub struct EnterPortal {
    portal: PortalId,
    ignore_portal_velocity: bool,
}

impl EnterPortal {
    /// Creates a new `EnterPortal` operation for entering `portal`.
    #[must_use]
    pub fn new(portal: PortalId) -> Self {
        Self {
            portal,
            ignore_portal_velocity: false,
        }
    }

    /// Don't carry over the motion of moving portals.
    #[must_use]
    pub fn ignoring_portal_velocity(mut self, ignore: bool) -> Self {
        self.ignore_portal_velocity = ignore;
        self
    }

    /// The portal entities come out of.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is missing.
    ///
    /// # Panics
    ///
    /// Panics if the portal is not linked.
    pub fn exit(&self, scene: &Scene) -> Result<PortalId> {
        match scene.portal(self.portal)?.linked() {
            Some(exit) => Ok(exit),
            None => panic!("portal must be linked to another portal"),
        }
    }

    /// Maps a transform into the linked portal's frame.
    ///
    /// The X axis flip is carried by the mirror flag, so the stored scale
    /// only picks up the Y flip and the size ratio of the two portals.
    ///
    /// # Errors
    ///
    /// Returns an error if either portal or an anchoring wall is missing.
    ///
    /// # Panics
    ///
    /// Panics if the portal is not linked.
    pub fn transform(&self, scene: &Scene, transform: &Transform2) -> Result<Transform2> {
        let exit = self.exit(scene)?;
        let m = portal_matrix(scene, self.portal)?;
        let v0 = transform_point(&m, &transform.position);
        let v1 = transform_point(&m, &(transform.position + Vector2::new(1.0, 0.0)));
        let v2 = transform_point(&m, &(transform.position + Vector2::new(0.0, 1.0)));

        let enter_t = scene.portal_world_transform(self.portal)?;
        let exit_t = scene.portal_world_transform(exit)?;
        let (flip_x, flip_y) = flip_factors(&enter_t.world_scale(), &exit_t.world_scale());

        let rotation = if flip_x * flip_y > 0.0 {
            transform.rotation + exit_t.rotation - enter_t.rotation
        } else {
            -transform.rotation + angle_wrap(enter_t.rotation) + angle_wrap(exit_t.rotation)
        };

        Ok(Transform2 {
            position: v0,
            rotation,
            scale: Vector2::new(
                transform.scale.x * flip_y * (v1 - v0).norm(),
                transform.scale.y * flip_y * (v2 - v0).norm(),
            ),
            mirror_x: transform.mirror_x ^ (flip_x * flip_y < 0.0),
        })
    }

    /// Maps a velocity into the linked portal's frame.
    ///
    /// Unless portal velocity is ignored, the velocity is taken relative to
    /// the entry portal and the exit portal's velocity is added back.
    ///
    /// # Errors
    ///
    /// Returns an error if either portal or an anchoring wall is missing.
    ///
    /// # Panics
    ///
    /// Panics if the portal is not linked.
    pub fn velocity(&self, scene: &Scene, velocity: &Velocity2) -> Result<Velocity2> {
        let exit = self.exit(scene)?;
        let m = portal_matrix(scene, self.portal)?;
        let mut v = *velocity;

        if !self.ignore_portal_velocity {
            let enter_v = scene.portal_world_velocity(self.portal)?;
            v.linear -= enter_v.linear;
            v.angular -= enter_v.angular;
        }

        v.linear = transform_direction(&m, &v.linear);
        let (flip_x, flip_y) = flip_factors(
            &scene.portal_world_transform(self.portal)?.world_scale(),
            &scene.portal_world_transform(exit)?.world_scale(),
        );
        if flip_x * flip_y < 0.0 {
            v.angular = -v.angular;
        }

        if !self.ignore_portal_velocity {
            let exit_v = scene.portal_world_velocity(exit)?;
            v.linear += exit_v.linear;
            v.angular += exit_v.angular;
        }
        Ok(v)
    }

    /// Moves a portalable object through the portal, transform and velocity.
    ///
    /// Objects that ignore portal velocity (cameras) always do so.
    ///
    /// # Errors
    ///
    /// Returns an error if either portal or an anchoring wall is missing.
    ///
    /// # Panics
    ///
    /// Panics if the portal is not linked.
    pub fn execute<E: Portalable + ?Sized>(&self, scene: &Scene, object: &mut E) -> Result<()> {
        let op = self.ignoring_portal_velocity(
            self.ignore_portal_velocity || object.ignores_portal_velocity(),
        );
        let transform = op.transform(scene, &object.transform())?;
        let velocity = op.velocity(scene, &object.velocity())?;
        object.set_transform(transform);
        object.set_velocity(velocity);
        Ok(())
    }

    /// Moves a scene entity through the portal and returns the record left on
    /// it. Physics-backed entities are updated through `physics`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity, a portal, or a physics body is
    /// missing.
    ///
    /// # Panics
    ///
    /// Panics if the portal is not linked.
    pub fn execute_on_entity<P: PhysicsBackend + ?Sized>(
        &self,
        scene: &mut Scene,
        entity: EntityId,
        physics: &mut P,
    ) -> Result<TraversalRecord> {
        let exit = self.exit(scene)?;
        let mut kind = scene.entity(entity)?.kind.clone();
        let (transform, velocity) = match &mut kind {
            EntityKind::Kinematic(k) => {
                self.execute(scene, k)?;
                (k.transform, k.velocity)
            }
            EntityKind::Camera(c) => {
                self.execute(scene, c)?;
                (c.transform, c.velocity)
            }
            EntityKind::Body(b) => {
                let mut bound = b.bind(physics)?;
                self.execute(scene, &mut bound)?;
                (bound.transform(), bound.velocity())
            }
        };

        let record = TraversalRecord {
            exit,
            transform,
            velocity,
            step: scene.step_index(),
        };
        let data = scene.entity_mut(entity)?;
        data.kind = kind;
        data.traversal = Some(record);
        debug!(?entity, enter = ?self.portal, ?exit, "entity traversed portal");
        Ok(record)
    }
}
