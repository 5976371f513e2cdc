//! Error types for room graph construction and loading

use thiserror::Error;

/// Main error type for the crate.
///
/// The tracer itself never returns errors; these come from building,
/// mutating or loading a room graph.
#[derive(Debug, Error)]
pub enum Error {
    #[error("room {0} does not exist")]
    InvalidRoom(u32),

    #[error("static {0} does not exist")]
    InvalidStatic(u32),

    #[error("roamer {0} does not exist")]
    InvalidRoamer(u32),

    #[error("portal {0} does not exist")]
    InvalidPortal(u32),

    #[error("portal needs at least 3 points, got {0}")]
    TooFewPortalPoints(usize),

    #[error("portal polygon is degenerate (zero area)")]
    DegeneratePortal,

    #[error("portal links room {0} to itself")]
    SelfLinkedPortal(u32),

    #[error("occluder {0} does not exist")]
    InvalidOccluder(u32),

    #[error("occluder shape is degenerate")]
    DegenerateOccluder,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
