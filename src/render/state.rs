//! Graphics state as a value.
//!
//! The renderer never toggles device flags directly. It asks a
//! [`StateTracker`] to move the device to a target [`RenderState`], and the
//! tracker issues only the calls for fields that differ.

use super::backend::GraphicsBackend;

/// Bits of the stencil buffer compared and written.
pub const STENCIL_MASK: u32 = 0xFF;

/// Stencil comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilFunc {
    Always,
    /// Pass where the stored value equals the reference.
    Equal,
}

/// Stencil update applied to pixels passing the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Increment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub func: StencilFunc,
    pub reference: u32,
    pub op: StencilOp,
}

/// The device flags the portal renderer cares about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub color_write: bool,
    pub depth_write: bool,
    pub depth_test: bool,
    /// `None` disables the stencil test.
    pub stencil: Option<StencilState>,
    pub line_width: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self::scene()
    }
}

impl RenderState {
    /// Plain scene drawing: color and depth on, no stencil.
    #[must_use]
    pub fn scene() -> Self {
        Self {
            color_write: true,
            depth_write: true,
            depth_test: true,
            stencil: None,
            line_width: 1.0,
        }
    }

    /// Stencil-only pass that raises pixels at level `count` to `count + 1`.
    #[must_use]
    pub fn stencil_carve(count: u32) -> Self {
        Self {
            color_write: false,
            depth_write: false,
            depth_test: false,
            stencil: Some(StencilState {
                func: StencilFunc::Equal,
                reference: count,
                op: StencilOp::Increment,
            }),
            line_width: 1.0,
        }
    }

    /// Scene drawing limited to pixels whose stencil equals `reference`.
    #[must_use]
    pub fn stencil_masked(reference: u32) -> Self {
        Self {
            stencil: Some(StencilState {
                func: StencilFunc::Equal,
                reference,
                op: StencilOp::Keep,
            }),
            ..Self::scene()
        }
    }

    #[must_use]
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }
}

/// Mirrors the state last sent to a backend.
#[derive(Debug, Clone, Copy)]
pub struct StateTracker {
    current: RenderState,
}

impl StateTracker {
    /// Starts tracking a backend known to be in `current`.
    #[must_use]
    pub fn new(current: RenderState) -> Self {
        Self { current }
    }

    #[must_use]
    pub fn current(&self) -> RenderState {
        self.current
    }

    /// Moves the backend to `target`, returning the number of calls issued.
    #[allow(clippy::float_cmp)]
    pub fn transition<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        target: &RenderState,
    ) -> usize {
        let from = self.current;
        let mut calls = 0;

        if from.color_write != target.color_write {
            backend.set_color_mask(target.color_write);
            calls += 1;
        }
        if from.depth_write != target.depth_write {
            backend.set_depth_mask(target.depth_write);
            calls += 1;
        }
        if from.depth_test != target.depth_test {
            backend.set_depth_test(target.depth_test);
            calls += 1;
        }

        match (from.stencil, target.stencil) {
            (None, None) => {}
            (Some(_), None) => {
                backend.set_stencil_test(false);
                calls += 1;
            }
            (old, Some(new)) => {
                if old.is_none() {
                    backend.set_stencil_test(true);
                    calls += 1;
                }
                // Func and op persist while the test is off, but the tracker
                // does not follow them then, so reissue on enable.
                if old.is_none_or(|o| (o.func, o.reference) != (new.func, new.reference)) {
                    backend.set_stencil_func(new.func, new.reference, STENCIL_MASK);
                    calls += 1;
                }
                if old.is_none_or(|o| o.op != new.op) {
                    backend.set_stencil_op(new.op);
                    calls += 1;
                }
            }
        }

        if from.line_width != target.line_width {
            backend.set_line_width(target.line_width);
            calls += 1;
        }

        self.current = *target;
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{DrawCommand, RecordingBackend};

    #[test]
    fn same_state_issues_nothing() {
        let mut backend = RecordingBackend::new();
        let mut tracker = StateTracker::new(RenderState::scene());
        assert_eq!(tracker.transition(&mut backend, &RenderState::scene()), 0);
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn carve_from_scene() {
        let mut backend = RecordingBackend::new();
        let mut tracker = StateTracker::new(RenderState::scene());
        let calls = tracker.transition(&mut backend, &RenderState::stencil_carve(2));
        assert_eq!(calls, 6);
        assert_eq!(
            backend.commands(),
            &[
                DrawCommand::ColorMask(false),
                DrawCommand::DepthMask(false),
                DrawCommand::DepthTest(false),
                DrawCommand::StencilTest(true),
                DrawCommand::StencilFunc {
                    func: StencilFunc::Equal,
                    reference: 2,
                    mask: STENCIL_MASK,
                },
                DrawCommand::StencilOp(StencilOp::Increment),
            ]
        );
        assert_eq!(backend.current_state(), RenderState::stencil_carve(2));
    }

    #[test]
    fn carve_to_mask_only_touches_differences() {
        let mut backend = RecordingBackend::new();
        let mut tracker = StateTracker::new(RenderState::scene());
        tracker.transition(&mut backend, &RenderState::stencil_carve(0));
        backend.clear_log();
        tracker.transition(&mut backend, &RenderState::stencil_masked(1));
        assert_eq!(
            backend.commands(),
            &[
                DrawCommand::ColorMask(true),
                DrawCommand::DepthMask(true),
                DrawCommand::DepthTest(true),
                DrawCommand::StencilFunc {
                    func: StencilFunc::Equal,
                    reference: 1,
                    mask: STENCIL_MASK,
                },
                DrawCommand::StencilOp(StencilOp::Keep),
            ]
        );
    }

    #[test]
    fn round_trip_restores_device() {
        let mut backend = RecordingBackend::new();
        let mut tracker = StateTracker::new(RenderState::scene());
        tracker.transition(&mut backend, &RenderState::stencil_masked(3).with_line_width(2.0));
        tracker.transition(&mut backend, &RenderState::scene());
        assert_eq!(backend.current_state(), RenderState::scene());
        assert_eq!(tracker.current(), RenderState::scene());
    }
}
