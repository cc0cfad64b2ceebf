use thiserror::Error;

/// Failures surfaced by the viewer to its caller.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The element the renderer should be attached to does not exist.
    #[error("mount element `{0}` not found")]
    MountNotFound(String),
    /// The hosting environment rejected a call (DOM, window system).
    #[error("host error: {0}")]
    Host(String),
    /// The renderer could not be created or failed to draw a frame.
    #[error("renderer backend failed: {0:#}")]
    Backend(anyhow::Error),
}

/// Reasons a colour value could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("unknown colour name `{0}`")]
    UnknownName(String),
    #[error("invalid hex colour `{0}`")]
    InvalidHex(String),
    #[error("invalid colour function `{0}`")]
    InvalidFunction(String),
}
