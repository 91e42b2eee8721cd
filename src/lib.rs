pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod render;
pub mod scene;
pub mod simulation;

#[cfg(test)]
mod test_support;

pub use error::{PortalError, Result};
