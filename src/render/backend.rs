use crate::math::{Matrix4, Point2};
use crate::scene::Scene;

use super::state::{RenderState, StencilFunc, StencilOp, StencilState};

/// Opaque handle of a GPU buffer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// The immediate-mode slice of a graphics API the portal renderer drives.
///
/// Calls take effect synchronously and in order.
pub trait GraphicsBackend {
    fn set_color_mask(&mut self, enabled: bool);
    fn set_depth_mask(&mut self, enabled: bool);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_stencil_test(&mut self, enabled: bool);
    fn set_stencil_func(&mut self, func: StencilFunc, reference: u32, mask: u32);
    fn set_stencil_op(&mut self, op: StencilOp);
    fn set_line_width(&mut self, width: f32);
    fn clear_stencil_and_depth(&mut self);
    /// Fills a polygon given in world space.
    fn draw_polygon(&mut self, vertices: &[Point2], transform: &Matrix4);
    /// Draws line segments given in world space.
    fn draw_lines(&mut self, segments: &[[Point2; 2]], transform: &Matrix4);
    /// Draws every drawable of the scene through `view`.
    fn draw_scene(&mut self, scene: &Scene, view: &Matrix4);
    fn delete_buffer(&mut self, buffer: BufferHandle);
}

/// A command received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    ColorMask(bool),
    DepthMask(bool),
    DepthTest(bool),
    StencilTest(bool),
    StencilFunc {
        func: StencilFunc,
        reference: u32,
        mask: u32,
    },
    StencilOp(StencilOp),
    LineWidth(f32),
    ClearStencilAndDepth,
    Polygon {
        vertices: Vec<Point2>,
        transform: Matrix4,
        /// Drawn while the stencil test was on and updating the buffer.
        stencil_write: bool,
    },
    Lines {
        segments: Vec<[Point2; 2]>,
        transform: Matrix4,
    },
    Scene {
        view: Matrix4,
        /// Stencil value the draw was limited to, if any.
        stencil_reference: Option<u32>,
    },
    DeleteBuffer(BufferHandle),
}

/// A backend that draws nothing and logs every call.
///
/// It also follows the device state the calls imply, so tests can check
/// what state the renderer left behind.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    commands: Vec<DrawCommand>,
    color_mask: bool,
    depth_mask: bool,
    depth_test: bool,
    stencil_test: bool,
    stencil: StencilState,
    line_width: f32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            color_mask: true,
            depth_mask: true,
            depth_test: true,
            stencil_test: false,
            stencil: StencilState {
                func: StencilFunc::Always,
                reference: 0,
                op: StencilOp::Keep,
            },
            line_width: 1.0,
        }
    }
}

impl RecordingBackend {
    /// A backend in the [`RenderState::scene`] state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Forgets the logged commands, keeping the device state.
    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// The device state implied by the calls so far.
    #[must_use]
    pub fn current_state(&self) -> RenderState {
        RenderState {
            color_write: self.color_mask,
            depth_write: self.depth_mask,
            depth_test: self.depth_test,
            stencil: self.stencil_test.then_some(self.stencil),
            line_width: self.line_width,
        }
    }

    /// Polygons that updated the stencil buffer.
    pub fn stencil_writes(&self) -> impl Iterator<Item = &[Point2]> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Polygon {
                vertices,
                stencil_write: true,
                ..
            } => Some(vertices.as_slice()),
            _ => None,
        })
    }

    /// Views the scene was drawn through, with their stencil reference.
    pub fn scene_draws(&self) -> impl Iterator<Item = (&Matrix4, Option<u32>)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Scene {
                view,
                stencil_reference,
            } => Some((view, *stencil_reference)),
            _ => None,
        })
    }
}

impl GraphicsBackend for RecordingBackend {
    fn set_color_mask(&mut self, enabled: bool) {
        self.color_mask = enabled;
        self.commands.push(DrawCommand::ColorMask(enabled));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.depth_mask = enabled;
        self.commands.push(DrawCommand::DepthMask(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(DrawCommand::DepthTest(enabled));
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.stencil_test = enabled;
        self.commands.push(DrawCommand::StencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: StencilFunc, reference: u32, mask: u32) {
        self.stencil.func = func;
        self.stencil.reference = reference;
        self.commands.push(DrawCommand::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn set_stencil_op(&mut self, op: StencilOp) {
        self.stencil.op = op;
        self.commands.push(DrawCommand::StencilOp(op));
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
        self.commands.push(DrawCommand::LineWidth(width));
    }

    fn clear_stencil_and_depth(&mut self) {
        self.commands.push(DrawCommand::ClearStencilAndDepth);
    }

    fn draw_polygon(&mut self, vertices: &[Point2], transform: &Matrix4) {
        let stencil_write = self.stencil_test && self.stencil.op != StencilOp::Keep;
        self.commands.push(DrawCommand::Polygon {
            vertices: vertices.to_vec(),
            transform: *transform,
            stencil_write,
        });
    }

    fn draw_lines(&mut self, segments: &[[Point2; 2]], transform: &Matrix4) {
        self.commands.push(DrawCommand::Lines {
            segments: segments.to_vec(),
            transform: *transform,
        });
    }

    fn draw_scene(&mut self, _scene: &Scene, view: &Matrix4) {
        let stencil_reference = self.stencil_test.then_some(self.stencil.reference);
        self.commands.push(DrawCommand::Scene {
            view: *view,
            stencil_reference,
        });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(DrawCommand::DeleteBuffer(buffer));
    }
}
