use crate::error::{RenderError, Result};

/// Largest recursion depth the 8-bit stencil buffer can nest.
pub const MAX_STENCIL_DEPTH: u32 = 255;

/// Parameters of the recursive portal renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// How many portals-within-portals are drawn.
    pub max_depth: u32,
    /// Points on the far arc of the stencil wedge.
    pub fov_detail: usize,
    /// Minimum reach of the stencil wedge from the viewpoint.
    pub fov_distance: f64,
    /// Points on the far arc of the outline wedge.
    pub outline_detail: usize,
    /// Depth offset between recursion levels.
    pub scene_depth: f64,
    /// Width of the wedge outline in pixels.
    pub outline_width: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            fov_detail: 10,
            fov_distance: 50.0,
            outline_detail: 2,
            scene_depth: 20.0,
            outline_width: 2.0,
        }
    }
}

impl RenderConfig {
    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidParameters` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RenderError::InvalidParameters(msg).into());
        if self.max_depth > MAX_STENCIL_DEPTH {
            return invalid(format!(
                "max depth {} exceeds the stencil range {MAX_STENCIL_DEPTH}",
                self.max_depth
            ));
        }
        if self.fov_detail < 2 || self.outline_detail < 2 {
            return invalid("FOV detail must be at least 2".to_owned());
        }
        if !(self.fov_distance.is_finite() && self.fov_distance > 0.0) {
            return invalid("FOV distance must be positive".to_owned());
        }
        if !self.scene_depth.is_finite() {
            return invalid("scene depth must be finite".to_owned());
        }
        if !(self.outline_width.is_finite() && self.outline_width > 0.0) {
            return invalid("outline width must be positive".to_owned());
        }
        Ok(())
    }
}
