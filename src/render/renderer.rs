use nalgebra::Vector3;
use tracing::trace;

use crate::error::{RenderError, Result};
use crate::math::intersect_2d::segment_in_rectangle;
use crate::math::line_2d::Line2;
use crate::math::{transform_point, Matrix4, Point2};
use crate::operations::{portal_matrix_between, PortalFov};
use crate::scene::{Camera, PortalId, Scene};

use super::backend::GraphicsBackend;
use super::config::{RenderConfig, MAX_STENCIL_DEPTH};
use super::state::{RenderState, StateTracker};

/// Counters gathered over one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Portal levels that carved a window and drew through it.
    pub portals_drawn: usize,
    /// Portal levels rejected as back-facing, off-screen or degenerate.
    pub portals_culled: usize,
    pub stencil_writes: usize,
    pub scene_draws: usize,
    /// Backend state calls issued by the tracker.
    pub state_changes: usize,
    /// Highest stencil level reached.
    pub deepest_level: u32,
}

/// Draws the views through portals, nested up to a depth budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortalRenderer {
    config: RenderConfig,
}

impl PortalRenderer {
    /// Creates a renderer after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidParameters` if the configuration is
    /// unusable.
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Starts a pass over `scene`. The backend must be in the
    /// [`RenderState::scene`] state.
    ///
    /// # Errors
    ///
    /// Returns an error if the FOV settings are invalid.
    pub fn begin<'a, B: GraphicsBackend + ?Sized>(
        &self,
        scene: &'a Scene,
        backend: &'a mut B,
    ) -> Result<RenderPass<'a, B>> {
        Ok(RenderPass {
            scene,
            backend,
            tracker: StateTracker::new(RenderState::scene()),
            config: self.config,
            fov: PortalFov::new(self.config.fov_distance, self.config.fov_detail)?,
            outline: PortalFov::new(self.config.fov_distance, self.config.outline_detail)?,
            stats: RenderStats::default(),
        })
    }
}

/// One frame's worth of portal drawing on a backend.
pub struct RenderPass<'a, B: GraphicsBackend + ?Sized> {
    scene: &'a Scene,
    backend: &'a mut B,
    tracker: StateTracker,
    config: RenderConfig,
    fov: PortalFov,
    outline: PortalFov,
    stats: RenderStats,
}

impl<B: GraphicsBackend + ?Sized> RenderPass<'_, B> {
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Ends the pass.
    #[must_use]
    pub fn finish(self) -> RenderStats {
        self.stats
    }

    /// Draws the scene from `camera`, then everything seen through portals.
    ///
    /// # Errors
    ///
    /// Returns an error if a portal or its wall is missing.
    pub fn draw_camera(&mut self, camera: &Camera) -> Result<()> {
        let view = camera.view_matrix();
        self.backend.draw_scene(self.scene, &view);
        self.stats.scene_draws += 1;
        self.draw_all(&view, &camera.viewpoint())
    }

    /// Draws every live portal, farthest from `viewpoint` first, each on a
    /// freshly cleared stencil and depth buffer. Leaves the stencil test off.
    ///
    /// # Errors
    ///
    /// Returns an error if a portal or its wall is missing.
    pub fn draw_all(&mut self, view: &Matrix4, viewpoint: &Point2) -> Result<()> {
        let mut portals = Vec::new();
        for portal in self.scene.live_portals() {
            let [v0, v1] = self.scene.portal_world_vertices(portal)?;
            portals.push((portal, Line2::new(v0, v1).distance_to(viewpoint, true)));
        }
        portals.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (portal, _) in portals {
            self.backend.clear_stencil_and_depth();
            self.draw_portal(portal, view, viewpoint, self.config.max_depth, 0)?;
        }
        self.transition(&RenderState::scene());
        Ok(())
    }

    /// Draws what is visible through `portal` from `viewpoint`, then recurses
    /// into the portal's own image up to `depth` levels. `count` is the
    /// stencil level of the window being drawn into.
    ///
    /// The backend is returned to the state it had on entry, whichever way
    /// the call ends.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidParameters` if `count + depth` exceeds
    /// [`MAX_STENCIL_DEPTH`], or an error if a portal or its wall is missing.
    ///
    /// # Panics
    ///
    /// Panics if `depth > 0` and `portal` is not linked.
    pub fn draw_portal(
        &mut self,
        portal: PortalId,
        view: &Matrix4,
        viewpoint: &Point2,
        depth: u32,
        count: u32,
    ) -> Result<()> {
        if count.saturating_add(depth) > MAX_STENCIL_DEPTH {
            return Err(RenderError::InvalidParameters(format!(
                "stencil level {count} with depth {depth} exceeds {MAX_STENCIL_DEPTH}"
            ))
            .into());
        }
        let entry = self.tracker.current();
        let result = self.draw_level(portal, view, viewpoint, depth, count);
        self.transition(&entry);
        result
    }

    fn draw_level(
        &mut self,
        portal: PortalId,
        view: &Matrix4,
        viewpoint: &Point2,
        depth: u32,
        count: u32,
    ) -> Result<()> {
        if depth == 0 {
            return Ok(());
        }
        let scene = self.scene;
        let Some(exit) = scene.portal(portal)?.linked() else {
            panic!("portal must be linked to another portal");
        };

        let [v0, v1] = scene.portal_world_vertices(portal)?;
        if scene.portal(portal)?.one_sided {
            let line = Line2::new(v0, v1);
            let front = v0 + scene.portal_world_normal(portal)?;
            if line.side_of(&front) != line.side_of(viewpoint) {
                trace!(?portal, count, "portal seen from behind");
                self.stats.portals_culled += 1;
                return Ok(());
            }
        }

        let on_screen = segment_in_rectangle(
            &Point2::new(-1.0, -1.0),
            &Point2::new(1.0, 1.0),
            &transform_point(view, &v0),
            &transform_point(view, &v1),
        );
        if !on_screen {
            trace!(?portal, count, "portal off screen");
            self.stats.portals_culled += 1;
            return Ok(());
        }

        let fov = self.fov.execute(scene, portal, viewpoint)?;
        if fov.is_empty() {
            trace!(?portal, count, "portal seen edge-on");
            self.stats.portals_culled += 1;
            return Ok(());
        }

        let view = view * depth_offset(self.config.scene_depth);

        self.transition(&RenderState::stencil_carve(count));
        self.backend.draw_polygon(fov.vertices(), &view);
        self.stats.stencil_writes += 1;

        let to_image = portal_matrix_between(scene, exit, portal)?;
        let portal_view = view * to_image;
        self.transition(&RenderState::stencil_masked(count + 1));
        self.backend.draw_scene(scene, &portal_view);
        self.stats.scene_draws += 1;

        if let Some(edges) = self.outline.execute(scene, portal, viewpoint)?.edge_lines() {
            let segments = edges.map(|edge| [edge.start, edge.end]);
            let lifted = view * depth_offset(self.config.scene_depth * f64::from(count));
            self.transition(
                &RenderState::stencil_masked(count + 1).with_line_width(self.config.outline_width),
            );
            self.backend.draw_lines(&segments, &lifted);
        }

        self.stats.portals_drawn += 1;
        self.stats.deepest_level = self.stats.deepest_level.max(count + 1);
        trace!(?portal, depth, count, "portal level drawn");

        if depth == 1 {
            return Ok(());
        }
        // The next level's window is the portal's image in this level's view.
        let image = Line2::new(
            transform_point(&to_image, &v0),
            transform_point(&to_image, &v1),
        );
        if !image.is_visible_through(viewpoint, &Line2::new(v0, v1)) {
            trace!(?portal, count, "portal image outside the view");
            self.stats.portals_culled += 1;
            return Ok(());
        }

        let inner_viewpoint =
            transform_point(&portal_matrix_between(scene, portal, exit)?, viewpoint);
        self.draw_portal(portal, &portal_view, &inner_viewpoint, depth - 1, count + 1)
    }

    fn transition(&mut self, target: &RenderState) {
        self.stats.state_changes += self.tracker.transition(&mut *self.backend, target);
    }
}

fn depth_offset(z: f64) -> Matrix4 {
    Matrix4::new_translation(&Vector3::new(0.0, 0.0, z))
}
