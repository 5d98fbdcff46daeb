// Error types for the solver core

use std::path::PathBuf;

use thiserror::Error;

/// Contract violations raised at the solver's call boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("grid must be at least 3x3 (got {width}x{height})")]
    GridTooSmall { width: usize, height: usize },

    #[error("cell ({row}, {col}) is outside the {width}x{height} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    #[error("cell ({row}, {col}) is not an interior cell of the {width}x{height} grid")]
    NotInterior {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    #[error("{what} has {actual} cells but the grid has {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("expected a {expected_width}x{expected_height} grid, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("inflow segment {start}..={end} does not fit a boundary of length {len}")]
    InflowOutOfRange { start: usize, end: usize, len: usize },
}

pub type SimResult<T> = Result<T, SimError>;

/// Failures of the headless driver: loading input, writing output, or a
/// solver contract violation surfaced through it.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to load mask image: {0}")]
    Image(#[from] image::ImageError),

    #[error("the input does not define a mask; provide a PNG path or use the built-in channel")]
    MissingMask,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("frames directory {} is not empty; refusing to write snapshots into it", .0.display())]
    FramesDirNotEmpty(PathBuf),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error(transparent)]
    Sim(#[from] SimError),
}
