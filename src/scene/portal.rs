use crate::error::{GeometryError, Result};
use crate::math::Point2;

use super::wall::{EdgeCoord, WallId};
use crate::geometry::Velocity2;

slotmap::new_key_type! {
    /// Unique identifier for a portal in the scene.
    pub struct PortalId;
}

/// What a portal is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum PortalAnchor {
    /// Attached to an edge of a wall; follows the wall's transform.
    Wall { wall: WallId, coord: EdgeCoord },
    /// Free-floating in world space.
    Free {
        position: Point2,
        rotation: f64,
        velocity: Velocity2,
    },
}

impl PortalAnchor {
    /// A static free anchor.
    #[must_use]
    pub fn free(position: Point2, rotation: f64) -> Self {
        PortalAnchor::Free {
            position,
            rotation,
            velocity: Velocity2::default(),
        }
    }
}

/// Data associated with a portal.
///
/// Links are owned by the [`super::Scene`]; they can only be changed through
/// `Scene::link` and `Scene::unlink` so both sides always agree.
#[derive(Debug, Clone)]
pub struct PortalData {
    pub(crate) anchor: PortalAnchor,
    pub(crate) linked: Option<PortalId>,
    size: f64,
    /// A one-sided portal can only be seen through its front face. Entities
    /// still travel through it in both directions.
    pub one_sided: bool,
    pub mirror_x: bool,
}

impl PortalData {
    /// Creates an unlinked, one-sided portal of unit size.
    #[must_use]
    pub fn new(anchor: PortalAnchor) -> Self {
        Self {
            anchor,
            linked: None,
            size: 1.0,
            one_sided: true,
            mirror_x: false,
        }
    }

    /// Sets the portal size.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroPortalSize` if `size` is zero.
    pub fn with_size(mut self, size: f64) -> Result<Self> {
        self.set_size(size)?;
        Ok(self)
    }

    /// Builder-style setter for [`PortalData::one_sided`].
    #[must_use]
    pub fn with_one_sided(mut self, one_sided: bool) -> Self {
        self.one_sided = one_sided;
        self
    }

    /// Builder-style setter for [`PortalData::mirror_x`].
    #[must_use]
    pub fn with_mirror_x(mut self, mirror_x: bool) -> Self {
        self.mirror_x = mirror_x;
        self
    }

    /// Length of the portal segment.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Changes the portal size.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroPortalSize` if `size` is zero.
    pub fn set_size(&mut self, size: f64) -> Result<()> {
        if size == 0.0 {
            return Err(GeometryError::ZeroPortalSize.into());
        }
        self.size = size;
        Ok(())
    }

    #[must_use]
    pub fn anchor(&self) -> &PortalAnchor {
        &self.anchor
    }

    /// The portal this one is linked with.
    #[must_use]
    pub fn linked(&self) -> Option<PortalId> {
        self.linked
    }

    /// A portal without a link is inert.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.linked.is_some()
    }
}
