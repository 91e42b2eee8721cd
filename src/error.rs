use thiserror::Error;

/// Top-level error type for the portal subsystem.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors related to geometric values.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("scale component {axis} must be non-zero")]
    ZeroScale { axis: &'static str },

    #[error("portal size must be non-zero")]
    ZeroPortalSize,

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors related to the scene registry.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("a portal cannot be linked to itself")]
    SelfLink,

    #[error("edge {edge} is out of range for a wall with {edge_count} edges")]
    EdgeOutOfRange { edge: usize, edge_count: usize },

    #[error("physics body {0} is unknown to the physics backend")]
    BodyNotFound(u64),

    #[error("entity is not a camera")]
    NotACamera,

    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
}

/// Errors related to render configuration.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render parameters: {0}")]
    InvalidParameters(String),
}

/// Convenience type alias for results using [`PortalError`].
pub type Result<T> = std::result::Result<T, PortalError>;
