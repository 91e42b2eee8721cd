use crate::error::{Result, SceneError};
use crate::operations::{Crossing, ResolveCrossings};
use crate::render::{GraphicsBackend, PortalRenderer, ReclaimQueue, RenderStats};
use crate::scene::{EntityId, EntityKind, PhysicsBackend, Scene};

/// Fixed-step timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepConfig {
    dt: f64,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self { dt: 1.0 / 60.0 }
    }
}

impl StepConfig {
    /// # Errors
    ///
    /// Returns `SceneError::InvalidTimestep` if `dt` is not positive and
    /// finite.
    pub fn new(dt: f64) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SceneError::InvalidTimestep(dt).into());
        }
        Ok(Self { dt })
    }

    /// Seconds per step.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }
}

/// Drives a scene one fixed step at a time.
///
/// A step runs to completion, crossings included, before anything is drawn.
#[derive(Debug, Default)]
pub struct Simulation {
    scene: Scene,
    config: StepConfig,
    reclaim: ReclaimQueue,
}

impl Simulation {
    #[must_use]
    pub fn new(scene: Scene, config: StepConfig) -> Self {
        Self {
            scene,
            config,
            reclaim: ReclaimQueue::new(),
        }
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[must_use]
    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Buffers queued here are freed at the end of the next step.
    #[must_use]
    pub fn reclaim(&self) -> &ReclaimQueue {
        &self.reclaim
    }

    /// Advances one step and returns the crossings that happened in it.
    ///
    /// Kinematic entities and cameras move by their own velocity, physics
    /// bodies by the engine. Crossings are then resolved against the motion
    /// of the whole step, and queued buffers are freed.
    ///
    /// # Errors
    ///
    /// Returns an error if a physics-backed entity's body is missing from
    /// `physics`, or a portal's wall is missing.
    pub fn step<P, B>(&mut self, physics: &mut P, backend: &mut B) -> Result<Vec<Crossing>>
    where
        P: PhysicsBackend + ?Sized,
        B: GraphicsBackend + ?Sized,
    {
        let dt = self.config.dt;
        let resolve = ResolveCrossings::new();
        resolve.prime(&mut self.scene, physics)?;

        for (_, entity) in self.scene.entities_mut() {
            match &mut entity.kind {
                EntityKind::Kinematic(k) => k.advance(dt),
                EntityKind::Camera(c) => c.advance(dt),
                EntityKind::Body(_) => {}
            }
        }
        physics.step(dt);

        let crossings = resolve.execute(&mut self.scene, physics)?;
        self.reclaim.drain(backend);
        Ok(crossings)
    }

    /// Draws the scene and its portal views from a camera entity.
    ///
    /// # Errors
    ///
    /// Returns an error if `camera` is missing or not a camera.
    pub fn render<B: GraphicsBackend + ?Sized>(
        &self,
        renderer: &PortalRenderer,
        camera: EntityId,
        backend: &mut B,
    ) -> Result<RenderStats> {
        let EntityKind::Camera(camera) = &self.scene.entity(camera)?.kind else {
            return Err(SceneError::NotACamera.into());
        };
        let mut pass = renderer.begin(&self.scene, backend)?;
        pass.draw_camera(camera)?;
        Ok(pass.finish())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Transform2, Velocity2};
    use crate::math::{Point2, Vector2};
    use crate::render::{BufferHandle, DrawCommand, RecordingBackend};
    use crate::scene::physics::testing::PointMassWorld;
    use crate::scene::{Camera, EntityData, Kinematic, PhysicsBody, PortalAnchor, PortalData};
    use crate::test_support::init_tracing;
    use approx::assert_relative_eq;

    fn portal_pair() -> Scene {
        let mut scene = Scene::new();
        let a = scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::origin(), 0.0)))
            .unwrap();
        let b = scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::new(10.0, 0.0), 0.0)))
            .unwrap();
        scene.link(a, b).unwrap();
        scene
    }

    #[test]
    fn timestep_must_be_positive() {
        assert!(StepConfig::new(0.0).is_err());
        assert!(StepConfig::new(-0.1).is_err());
        assert!(StepConfig::new(f64::NAN).is_err());
        assert_relative_eq!(StepConfig::default().dt(), 1.0 / 60.0);
    }

    #[test]
    fn kinematic_entity_walks_through() {
        init_tracing();
        let mut scene = portal_pair();
        let id = scene.add_entity(EntityData::new(EntityKind::Kinematic(Kinematic::new(
            Transform2::from_position_rotation(Point2::new(-0.05, 0.0), 0.0),
            Velocity2::new(Vector2::new(6.0, 0.0), 0.0),
        ))));
        let mut sim = Simulation::new(scene, StepConfig::default());
        let mut physics = PointMassWorld::default();
        let mut backend = RecordingBackend::new();

        let crossings = sim.step(&mut physics, &mut backend).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_relative_eq!(crossings[0].intersection.t_last, 0.5, epsilon = 1e-9);
        let EntityKind::Kinematic(k) = &sim.scene().entity(id).unwrap().kind else {
            panic!("kind changed");
        };
        assert_relative_eq!(k.transform.position, Point2::new(9.95, 0.0), epsilon = 1e-9);
        assert_relative_eq!(k.velocity.linear, Vector2::new(-6.0, 0.0), epsilon = 1e-9);

        let crossings = sim.step(&mut physics, &mut backend).unwrap();
        assert!(crossings.is_empty());
        assert!(sim.scene().entity(id).unwrap().traversal().is_none());
        assert_eq!(sim.scene().step_index(), 2);
    }

    #[test]
    fn physics_body_walks_through() {
        let mut scene = portal_pair();
        let mut physics = PointMassWorld::default();
        let handle = physics.add(
            1,
            Point2::new(-0.05, 0.2),
            Velocity2::new(Vector2::new(6.0, 0.0), 0.0),
        );
        scene.add_entity(EntityData::new(EntityKind::Body(PhysicsBody::new(handle))));
        let mut sim = Simulation::new(scene, StepConfig::default());
        let mut backend = RecordingBackend::new();

        let crossings = sim.step(&mut physics, &mut backend).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(physics.steps, 1);
        assert_relative_eq!(physics.body_position(handle), Point2::new(9.95, 0.2), epsilon = 1e-9);
    }

    #[test]
    fn missing_body_is_an_error() {
        let mut scene = portal_pair();
        let mut physics = PointMassWorld::default();
        scene.add_entity(EntityData::new(EntityKind::Body(PhysicsBody::new(
            crate::scene::BodyHandle(42),
        ))));
        let mut sim = Simulation::new(scene, StepConfig::default());
        assert!(sim.step(&mut physics, &mut RecordingBackend::new()).is_err());
    }

    #[test]
    fn queued_buffers_are_freed_each_step() {
        let mut sim = Simulation::new(portal_pair(), StepConfig::default());
        sim.reclaim().defer(BufferHandle(7));
        sim.reclaim().defer(BufferHandle(8));
        let mut backend = RecordingBackend::new();
        sim.step(&mut PointMassWorld::default(), &mut backend).unwrap();
        assert!(sim.reclaim().is_empty());
        assert_eq!(
            backend.commands(),
            &[
                DrawCommand::DeleteBuffer(BufferHandle(7)),
                DrawCommand::DeleteBuffer(BufferHandle(8)),
            ]
        );
    }

    #[test]
    fn render_from_camera_entity() {
        let mut scene = portal_pair();
        let camera = scene.add_entity(EntityData::new(EntityKind::Camera(Camera::new(
            Transform2::from_position_rotation(Point2::new(3.0, 0.0), 0.0),
            40.0,
            1.0,
        ))));
        let rock = scene.add_entity(EntityData::new(EntityKind::Kinematic(Kinematic::default())));
        let sim = Simulation::new(scene, StepConfig::default());
        let renderer = PortalRenderer::default();
        let mut backend = RecordingBackend::new();

        let stats = sim.render(&renderer, camera, &mut backend).unwrap();
        assert!(stats.portals_drawn >= 1);
        assert!(sim.render(&renderer, rock, &mut backend).is_err());
    }
}
