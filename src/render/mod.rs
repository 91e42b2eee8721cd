//! Recursive stencil rendering of portal views.

mod backend;
mod config;
mod reclaim;
mod renderer;
mod state;

pub use backend::{BufferHandle, DrawCommand, GraphicsBackend, RecordingBackend};
pub use config::{RenderConfig, MAX_STENCIL_DEPTH};
pub use reclaim::ReclaimQueue;
pub use renderer::{PortalRenderer, RenderPass, RenderStats};
pub use state::{RenderState, StateTracker, StencilFunc, StencilOp, StencilState, STENCIL_MASK};
