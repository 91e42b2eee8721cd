use tracing::debug;

use crate::error::Result;
use crate::math::intersect_2d::{line_intersection, LineIntersection};
use crate::math::{Point2, TOLERANCE};
use crate::scene::{EntityId, PhysicsBackend, PortalId, Scene};

use super::traversal::EnterPortal;

/// A portal crossing found during a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub entity: EntityId,
    /// Portal the entity entered.
    pub portal: PortalId,
    /// Portal the entity came out of.
    pub exit: PortalId,
    /// Where the path met the portal; `t_first` is along the portal segment,
    /// `t_last` along the path.
    pub intersection: LineIntersection,
}

/// Tests a swept path against every live portal's segment.
pub struct DetectCrossing {
    from: Point2,
    to: Point2,
    leaving: Option<PortalId>,
}

impl DetectCrossing {
    /// Creates a new `DetectCrossing` query for the path `from` to `to`.
    #[must_use]
    pub fn new(from: Point2, to: Point2) -> Self {
        Self {
            from,
            to,
            leaving: None,
        }
    }

    /// Marks the path as starting on `portal`. A hit on that portal at the
    /// very start of the path is not a crossing; any later hit still is.
    #[must_use]
    pub fn leaving(mut self, portal: Option<PortalId>) -> Self {
        self.leaving = portal;
        self
    }

    /// Returns the first portal whose segment the path crosses, in scene
    /// iteration order. Both segments are closed, so touching an endpoint
    /// counts.
    ///
    /// # Errors
    ///
    /// Returns an error if a portal's wall is missing.
    pub fn execute(&self, scene: &Scene) -> Result<Option<(PortalId, LineIntersection)>> {
        for portal in scene.live_portals() {
            let [v0, v1] = scene.portal_world_vertices(portal)?;
            let Some(hit) = line_intersection(&v0, &v1, &self.from, &self.to, true) else {
                continue;
            };
            if Some(portal) == self.leaving && hit.t_last <= TOLERANCE {
                continue;
            }
            return Ok(Some((portal, hit)));
        }
        Ok(None)
    }
}

/// Finds and applies the portal crossings of one simulation step.
///
/// Each portalable entity is tested along the path from its position at the
/// start of the step to its current one. At most one crossing per entity is
/// honored per step. An entity that crossed in the previous step may have
/// come out exactly on its exit portal; touching that portal at the start of
/// the next path does not send it back.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveCrossings;

impl ResolveCrossings {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records the start position of entities that have none yet. Call
    /// before anything moves.
    ///
    /// # Errors
    ///
    /// Returns an error if a physics-backed entity's body is missing.
    pub fn prime<P: PhysicsBackend + ?Sized>(&self, scene: &mut Scene, physics: &P) -> Result<()> {
        for id in scene.portalable_entities() {
            if scene.entity(id)?.last_position.is_none() {
                let position = scene.entity_position(id, physics)?;
                scene.entity_mut(id)?.last_position = Some(position);
            }
        }
        Ok(())
    }

    /// Detects crossings since the start of the step, moves the crossing
    /// entities through, expires last step's records and closes the step.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity, portal, wall or physics body is
    /// missing.
    pub fn execute<P: PhysicsBackend + ?Sized>(
        &self,
        scene: &mut Scene,
        physics: &mut P,
    ) -> Result<Vec<Crossing>> {
        let step = scene.step_index();
        let mut crossings = Vec::new();

        for entity in scene.portalable_entities() {
            let data = scene.entity(entity)?;
            let previous = data.traversal.filter(|record| record.step < step);
            let Some(from) = data.last_position else {
                continue;
            };
            let to = scene.entity_position(entity, physics)?;

            let hit = DetectCrossing::new(from, to)
                .leaving(previous.map(|record| record.exit))
                .execute(scene)?;

            if let Some((portal, intersection)) = hit {
                let record = EnterPortal::new(portal).execute_on_entity(scene, entity, physics)?;
                debug!(?entity, ?portal, t = intersection.t_last, "portal crossing");
                crossings.push(Crossing {
                    entity,
                    portal,
                    exit: record.exit,
                    intersection,
                });
            } else if previous.is_some() {
                scene.entity_mut(entity)?.traversal = None;
            }

            let position = scene.entity_position(entity, physics)?;
            scene.entity_mut(entity)?.last_position = Some(position);
        }

        scene.advance_step_index();
        Ok(crossings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Transform2, Velocity2};
    use crate::scene::physics::testing::PointMassWorld;
    use crate::scene::{EntityData, EntityKind, Kinematic, PortalAnchor, PortalData};
    use approx::assert_relative_eq;

    fn add_free(scene: &mut Scene, x: f64) -> PortalId {
        scene
            .add_portal(PortalData::new(PortalAnchor::free(Point2::new(x, 0.0), 0.0)))
            .unwrap()
    }

    fn linked(scene: &mut Scene, x_a: f64, x_b: f64) -> (PortalId, PortalId) {
        let a = add_free(scene, x_a);
        let b = add_free(scene, x_b);
        scene.link(a, b).unwrap();
        (a, b)
    }

    fn add_kinematic(scene: &mut Scene, x: f64) -> EntityId {
        scene.add_entity(EntityData::new(EntityKind::Kinematic(Kinematic::new(
            Transform2::from_position_rotation(Point2::new(x, 0.0), 0.0),
            Velocity2::default(),
        ))))
    }

    fn move_to(scene: &mut Scene, id: EntityId, x: f64) {
        let EntityKind::Kinematic(k) = &mut scene.entity_mut(id).unwrap().kind else {
            panic!("not kinematic");
        };
        k.transform.position = Point2::new(x, 0.0);
    }

    fn position(scene: &Scene, id: EntityId) -> Point2 {
        scene
            .entity_position(id, &PointMassWorld::default())
            .unwrap()
    }

    #[test]
    fn path_through_portal_is_detected() {
        let mut scene = Scene::new();
        let (a, _) = linked(&mut scene, 0.0, 10.0);
        let (portal, hit) = DetectCrossing::new(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0))
            .execute(&scene)
            .unwrap()
            .unwrap();
        assert_eq!(portal, a);
        assert_relative_eq!(hit.t_first, 0.5, epsilon = 1e-12);
        assert_relative_eq!(hit.t_last, 0.5, epsilon = 1e-12);
        assert_relative_eq!(hit.position, Point2::origin(), epsilon = 1e-12);
    }

    #[test]
    fn path_short_of_portal_is_not_detected() {
        let mut scene = Scene::new();
        linked(&mut scene, 0.0, 10.0);
        let hit = DetectCrossing::new(Point2::new(-1.0, 0.0), Point2::new(-0.1, 0.0))
            .execute(&scene)
            .unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn unlinked_portals_are_ignored() {
        let mut scene = Scene::new();
        add_free(&mut scene, 0.0);
        let hit = DetectCrossing::new(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0))
            .execute(&scene)
            .unwrap();
        assert!(hit.is_none());
    }

    #[test]
    fn leaving_ignores_only_the_start_of_the_path() {
        let mut scene = Scene::new();
        let (a, _) = linked(&mut scene, 0.0, 10.0);
        let hit = DetectCrossing::new(Point2::origin(), Point2::new(-1.0, 0.0))
            .leaving(Some(a))
            .execute(&scene)
            .unwrap();
        assert!(hit.is_none());

        let (portal, _) = DetectCrossing::new(Point2::new(1.0, 0.0), Point2::new(-1.0, 0.0))
            .leaving(Some(a))
            .execute(&scene)
            .unwrap()
            .unwrap();
        assert_eq!(portal, a);
    }

    #[test]
    fn crossing_moves_entity_through() {
        let mut scene = Scene::new();
        let (a, b) = linked(&mut scene, 0.0, 10.0);
        let id = add_kinematic(&mut scene, -0.5);
        let mut physics = PointMassWorld::default();
        let resolve = ResolveCrossings::new();

        resolve.prime(&mut scene, &physics).unwrap();
        move_to(&mut scene, id, 0.5);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();

        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].portal, a);
        assert_eq!(crossings[0].exit, b);
        assert_relative_eq!(position(&scene, id), Point2::new(9.5, 0.0), epsilon = 1e-12);
        let data = scene.entity(id).unwrap();
        assert_eq!(data.traversal().unwrap().step, 0);
        assert_relative_eq!(data.last_position().unwrap(), Point2::new(9.5, 0.0), epsilon = 1e-12);
        assert_eq!(scene.step_index(), 1);
    }

    #[test]
    fn reversing_through_exit_traverses_back() {
        let mut scene = Scene::new();
        let (a, b) = linked(&mut scene, 0.0, 10.0);
        let id = add_kinematic(&mut scene, -0.5);
        let mut physics = PointMassWorld::default();
        let resolve = ResolveCrossings::new();

        resolve.prime(&mut scene, &physics).unwrap();
        move_to(&mut scene, id, 0.5);
        resolve.execute(&mut scene, &mut physics).unwrap();
        assert_relative_eq!(position(&scene, id), Point2::new(9.5, 0.0), epsilon = 1e-12);

        // Bounces straight back over B on the very next step.
        move_to(&mut scene, id, 10.5);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].portal, b);
        assert_eq!(crossings[0].exit, a);
        assert_relative_eq!(position(&scene, id), Point2::new(-0.5, 0.0), epsilon = 1e-12);
        assert_eq!(scene.entity(id).unwrap().traversal().unwrap().step, 1);
    }

    #[test]
    fn entity_ending_on_portal_is_not_sent_back() {
        let mut scene = Scene::new();
        let (a, b) = linked(&mut scene, 0.0, 10.0);
        let id = add_kinematic(&mut scene, -0.5);
        let mut physics = PointMassWorld::default();
        let resolve = ResolveCrossings::new();

        // Stops exactly on A and comes out exactly on B.
        resolve.prime(&mut scene, &physics).unwrap();
        move_to(&mut scene, id, 0.0);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].portal, a);
        assert_relative_eq!(position(&scene, id), Point2::new(10.0, 0.0), epsilon = 1e-12);

        // Moving off B the way it came out is not a crossing, and the record
        // expires.
        move_to(&mut scene, id, 9.5);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert!(crossings.is_empty());
        assert_relative_eq!(position(&scene, id), Point2::new(9.5, 0.0), epsilon = 1e-12);
        assert!(scene.entity(id).unwrap().traversal().is_none());

        // With the record gone B behaves like any other portal.
        move_to(&mut scene, id, 10.5);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].portal, b);
    }

    #[test]
    fn first_portal_in_order_wins() {
        let mut scene = Scene::new();
        let (a, _) = linked(&mut scene, 0.0, 10.0);
        linked(&mut scene, 0.25, -10.0);
        let id = add_kinematic(&mut scene, -1.0);
        let mut physics = PointMassWorld::default();
        let resolve = ResolveCrossings::new();

        resolve.prime(&mut scene, &physics).unwrap();
        move_to(&mut scene, id, 1.0);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].portal, a);
    }

    #[test]
    fn non_portalable_entities_are_exempt() {
        let mut scene = Scene::new();
        linked(&mut scene, 0.0, 10.0);
        let id = scene.add_entity(
            EntityData::new(EntityKind::Kinematic(Kinematic::new(
                Transform2::from_position_rotation(Point2::new(-0.5, 0.0), 0.0),
                Velocity2::default(),
            )))
            .with_portalable(false),
        );
        let mut physics = PointMassWorld::default();
        let resolve = ResolveCrossings::new();

        resolve.prime(&mut scene, &physics).unwrap();
        move_to(&mut scene, id, 0.5);
        let crossings = resolve.execute(&mut scene, &mut physics).unwrap();
        assert!(crossings.is_empty());
        assert_relative_eq!(position(&scene, id), Point2::new(0.5, 0.0));
        assert!(scene.entity(id).unwrap().last_position().is_none());
    }

    #[test]
    fn unprimed_entities_are_not_tested() {
        let mut scene = Scene::new();
        linked(&mut scene, 0.0, 10.0);
        let id = add_kinematic(&mut scene, 0.5);
        let mut physics = PointMassWorld::default();
        let crossings = ResolveCrossings::new()
            .execute(&mut scene, &mut physics)
            .unwrap();
        assert!(crossings.is_empty());
        assert!(scene.entity(id).unwrap().last_position().is_none());
    }
}
