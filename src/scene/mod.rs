pub mod entity;
pub mod physics;
pub mod portal;
pub mod wall;

pub use entity::{
    Camera, EntityData, EntityId, EntityKind, HasTransform, Kinematic, Portalable,
    TraversalRecord,
};
pub use physics::{BodyHandle, BoundBody, PhysicsBackend, PhysicsBody};
pub use portal::{PortalAnchor, PortalData, PortalId};
pub use wall::{EdgeCoord, WallData, WallId};

use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use crate::error::{Result, SceneError};
use crate::geometry::{portal_local_vertices, Transform2, Velocity2};
use crate::math::{transform_direction, transform_points, Point2, Vector2};

/// Central arena that owns walls, portals and entities.
///
/// Everything references everything else through typed ids, so linked
/// portals never form an ownership cycle.
#[derive(Debug, Default, Clone)]
pub struct Scene {
    walls: SlotMap<WallId, WallData>,
    portals: SlotMap<PortalId, PortalData>,
    entities: SlotMap<EntityId, EntityData>,
    step_index: u64,
}

/// Ids picked out of a scene for [`Scene::clone_subset`].
#[derive(Debug, Default, Clone)]
pub struct Selection {
    pub walls: Vec<WallId>,
    pub portals: Vec<PortalId>,
    pub entities: Vec<EntityId>,
}

/// Maps ids of a source scene to the ids of their clones.
#[derive(Debug, Default)]
pub struct IdRemap {
    pub walls: SecondaryMap<WallId, WallId>,
    pub portals: SecondaryMap<PortalId, PortalId>,
    pub entities: SecondaryMap<EntityId, EntityId>,
}

impl Scene {
    /// Creates a new, empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed simulation steps.
    #[must_use]
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub(crate) fn advance_step_index(&mut self) {
        self.step_index += 1;
    }

    // --- Wall operations ---

    /// Inserts a wall and returns its ID.
    pub fn add_wall(&mut self, data: WallData) -> WallId {
        self.walls.insert(data)
    }

    /// Returns a reference to the wall data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall is not in the scene.
    pub fn wall(&self, id: WallId) -> Result<&WallData> {
        self.walls
            .get(id)
            .ok_or_else(|| SceneError::EntityNotFound("wall".into()).into())
    }

    /// Returns a mutable reference to the wall data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall is not in the scene.
    pub fn wall_mut(&mut self, id: WallId) -> Result<&mut WallData> {
        self.walls
            .get_mut(id)
            .ok_or_else(|| SceneError::EntityNotFound("wall".into()).into())
    }

    /// Removes a wall together with every portal attached to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the wall is not in the scene.
    pub fn remove_wall(&mut self, id: WallId) -> Result<WallData> {
        let attached: Vec<PortalId> = self
            .portals
            .iter()
            .filter(|(_, p)| matches!(p.anchor, PortalAnchor::Wall { wall, .. } if wall == id))
            .map(|(pid, _)| pid)
            .collect();
        let wall = self
            .walls
            .remove(id)
            .ok_or_else(|| SceneError::EntityNotFound("wall".into()))?;
        for pid in attached {
            self.remove_portal(pid)?;
        }
        Ok(wall)
    }

    // --- Portal operations ---

    /// Inserts a portal and returns its ID.
    ///
    /// Any link stored in `data` is discarded; use [`Scene::link`].
    ///
    /// # Errors
    ///
    /// Returns an error if the anchor refers to a missing wall or edge.
    pub fn add_portal(&mut self, mut data: PortalData) -> Result<PortalId> {
        self.check_anchor(&data.anchor)?;
        data.linked = None;
        Ok(self.portals.insert(data))
    }

    /// Returns a reference to the portal data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is not in the scene.
    pub fn portal(&self, id: PortalId) -> Result<&PortalData> {
        self.portals
            .get(id)
            .ok_or_else(|| SceneError::EntityNotFound("portal".into()).into())
    }

    /// Returns a mutable reference to the portal data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is not in the scene.
    pub fn portal_mut(&mut self, id: PortalId) -> Result<&mut PortalData> {
        self.portals
            .get_mut(id)
            .ok_or_else(|| SceneError::EntityNotFound("portal".into()).into())
    }

    /// Moves a portal to a new anchor.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is missing or the anchor is invalid.
    pub fn set_portal_anchor(&mut self, id: PortalId, anchor: PortalAnchor) -> Result<()> {
        self.check_anchor(&anchor)?;
        self.portal_mut(id)?.anchor = anchor;
        Ok(())
    }

    /// Removes a portal, clearing the link on its partner first.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is not in the scene.
    pub fn remove_portal(&mut self, id: PortalId) -> Result<PortalData> {
        self.unlink(id)?;
        debug!(?id, "portal removed");
        self.portals
            .remove(id)
            .ok_or_else(|| SceneError::EntityNotFound("portal".into()).into())
    }

    /// Links two portals to each other.
    ///
    /// Previous partners of either portal are unlinked, so a portal always
    /// has at most one link and links are always symmetric.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::SelfLink` if `a == b`, or an error if either
    /// portal is missing.
    pub fn link(&mut self, a: PortalId, b: PortalId) -> Result<()> {
        if a == b {
            return Err(SceneError::SelfLink.into());
        }
        self.portal(a)?;
        self.portal(b)?;
        if self.portal(a)?.linked == Some(b) {
            return Ok(());
        }
        self.unlink(a)?;
        self.unlink(b)?;
        self.portal_mut(a)?.linked = Some(b);
        self.portal_mut(b)?.linked = Some(a);
        debug!(?a, ?b, "portals linked");
        Ok(())
    }

    /// Clears the link of `id` and of its partner. Unlinked portals are left
    /// as they are.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal is not in the scene.
    pub fn unlink(&mut self, id: PortalId) -> Result<()> {
        let Some(partner) = self.portal_mut(id)?.linked.take() else {
            return Ok(());
        };
        if let Some(p) = self.portals.get_mut(partner) {
            if p.linked == Some(id) {
                p.linked = None;
            }
        }
        debug!(?id, ?partner, "portals unlinked");
        Ok(())
    }

    /// Iterates over all portals.
    pub fn portals(&self) -> impl Iterator<Item = (PortalId, &PortalData)> {
        self.portals.iter()
    }

    /// Ids of all portals that are linked, in iteration order.
    #[must_use]
    pub fn live_portals(&self) -> Vec<PortalId> {
        self.portals
            .iter()
            .filter(|(_, p)| p.is_linked())
            .map(|(id, _)| id)
            .collect()
    }

    /// The portal's world transform, derived from its anchor.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_world_transform(&self, id: PortalId) -> Result<Transform2> {
        let portal = self.portal(id)?;
        let size = Vector2::new(portal.size(), portal.size());
        match &portal.anchor {
            PortalAnchor::Free {
                position, rotation, ..
            } => Ok(Transform2 {
                position: *position,
                rotation: *rotation,
                scale: size,
                mirror_x: portal.mirror_x,
            }),
            PortalAnchor::Wall { wall, coord } => {
                let wall = self.wall(*wall)?;
                let (position, rotation) = wall.edge_placement(coord)?;
                let local = Transform2 {
                    position,
                    rotation,
                    scale: size,
                    mirror_x: portal.mirror_x,
                };
                Ok(local.compose(&wall.transform))
            }
        }
    }

    /// The portal's world velocity, including the lever-arm term of a
    /// rotating wall.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_world_velocity(&self, id: PortalId) -> Result<Velocity2> {
        match &self.portal(id)?.anchor {
            PortalAnchor::Free { velocity, .. } => Ok(*velocity),
            PortalAnchor::Wall { wall, .. } => {
                let wall = self.wall(*wall)?;
                let r = self.portal_world_transform(id)?.position - wall.transform.position;
                Ok(wall.velocity.at_offset(&r))
            }
        }
    }

    /// The portal segment's endpoints in world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_world_vertices(&self, id: PortalId) -> Result<[Point2; 2]> {
        self.portal_world_vertices_scaled(id, 1.0)
    }

    /// Like [`Scene::portal_world_vertices`], with the local segment scaled
    /// by `scalar` first.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_world_vertices_scaled(&self, id: PortalId, scalar: f64) -> Result<[Point2; 2]> {
        let m = self.portal_world_transform(id)?.matrix();
        let local = portal_local_vertices().map(|v| Point2::from(v.coords * scalar));
        let world = transform_points(&m, &local);
        Ok([world[0], world[1]])
    }

    /// Unit normal of the portal's front face in world space.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_world_normal(&self, id: PortalId) -> Result<Vector2> {
        let m = self.portal_world_transform(id)?.matrix();
        Ok(transform_direction(&m, &Vector2::new(1.0, 0.0)).normalize())
    }

    /// Whether the portal's world transform is mirrored.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn is_mirrored(&self, id: PortalId) -> Result<bool> {
        Ok(self.portal_world_transform(id)?.mirror_x)
    }

    /// Axis-aligned box around the portal segment grown by `margin`, as four
    /// corners.
    ///
    /// # Errors
    ///
    /// Returns an error if the portal or its wall is missing.
    pub fn portal_bounds(&self, id: PortalId, margin: f64) -> Result<[Point2; 4]> {
        let [a, b] = self.portal_world_vertices(id)?;
        let min = Point2::new(a.x.min(b.x) - margin, a.y.min(b.y) - margin);
        let max = Point2::new(a.x.max(b.x) + margin, a.y.max(b.y) + margin);
        Ok([
            min,
            Point2::new(min.x, max.y),
            max,
            Point2::new(max.x, min.y),
        ])
    }

    fn check_anchor(&self, anchor: &PortalAnchor) -> Result<()> {
        if let PortalAnchor::Wall { wall, coord } = anchor {
            self.wall(*wall)?.edge_placement(coord)?;
        }
        Ok(())
    }

    // --- Entity operations ---

    /// Inserts an entity and returns its ID.
    pub fn add_entity(&mut self, data: EntityData) -> EntityId {
        self.entities.insert(data)
    }

    /// Returns a reference to the entity data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not in the scene.
    pub fn entity(&self, id: EntityId) -> Result<&EntityData> {
        self.entities
            .get(id)
            .ok_or_else(|| SceneError::EntityNotFound("entity".into()).into())
    }

    /// Returns a mutable reference to the entity data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not in the scene.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut EntityData> {
        self.entities
            .get_mut(id)
            .ok_or_else(|| SceneError::EntityNotFound("entity".into()).into())
    }

    /// Removes an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not in the scene.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<EntityData> {
        self.entities
            .remove(id)
            .ok_or_else(|| SceneError::EntityNotFound("entity".into()).into())
    }

    /// Iterates over all entities.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &EntityData)> {
        self.entities.iter()
    }

    pub(crate) fn entities_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut EntityData)> {
        self.entities.iter_mut()
    }

    /// Ids of all entities marked portalable.
    #[must_use]
    pub fn portalable_entities(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.portalable)
            .map(|(id, _)| id)
            .collect()
    }

    /// Current world position of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is missing, or its body is unknown to
    /// `physics`.
    pub fn entity_position<P: PhysicsBackend + ?Sized>(
        &self,
        id: EntityId,
        physics: &P,
    ) -> Result<Point2> {
        match &self.entity(id)?.kind {
            EntityKind::Kinematic(k) => Ok(k.transform.position),
            EntityKind::Camera(c) => Ok(c.transform.position),
            EntityKind::Body(b) => {
                if !physics.contains_body(b.handle) {
                    return Err(SceneError::BodyNotFound(b.handle.0).into());
                }
                Ok(physics.body_position(b.handle))
            }
        }
    }

    // --- Cloning ---

    /// Copies the selected walls, portals and entities into a new scene.
    ///
    /// Links survive only when both portals are selected. A portal whose wall
    /// is not selected becomes a free portal at its current world placement.
    /// Physics body handles are copied verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if any selected id is missing.
    pub fn clone_subset(&self, selection: &Selection) -> Result<(Scene, IdRemap)> {
        let mut scene = Scene::new();
        let mut remap = IdRemap::default();

        for &id in &selection.walls {
            let new_id = scene.walls.insert(self.wall(id)?.clone());
            remap.walls.insert(id, new_id);
        }

        for &id in &selection.portals {
            let mut data = self.portal(id)?.clone();
            data.linked = None;
            if let PortalAnchor::Wall { wall, coord } = data.anchor {
                if let Some(&new_wall) = remap.walls.get(wall) {
                    data.anchor = PortalAnchor::Wall {
                        wall: new_wall,
                        coord,
                    };
                } else {
                    let world = self.portal_world_transform(id)?;
                    data.anchor = PortalAnchor::Free {
                        position: world.position,
                        rotation: world.rotation,
                        velocity: self.portal_world_velocity(id)?,
                    };
                    data.set_size(world.world_scale().y)?;
                    data.mirror_x = world.is_orientation_flipped();
                }
            }
            let new_id = scene.portals.insert(data);
            remap.portals.insert(id, new_id);
        }

        for &id in &selection.portals {
            let Some(partner) = self.portal(id)?.linked else {
                continue;
            };
            if let (Some(&a), Some(&b)) = (remap.portals.get(id), remap.portals.get(partner)) {
                scene.link(a, b)?;
            }
        }

        for &id in &selection.entities {
            let mut data = self.entity(id)?.clone();
            data.traversal = data.traversal.and_then(|mut record| {
                let exit = remap.portals.get(record.exit)?;
                record.exit = *exit;
                Some(record)
            });
            let new_id = scene.entities.insert(data);
            remap.entities.insert(id, new_id);
        }

        scene.step_index = self.step_index;
        Ok((scene, remap))
    }
}
