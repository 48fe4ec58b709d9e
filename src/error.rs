//! Error types for DEM evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop (or degrade) an evaluation run.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A required raster could not be opened or decoded.
    #[error("missing input '{}': {reason}", .path.display())]
    MissingInput { path: PathBuf, reason: String },

    /// Two rasters that are compared cell by cell have different extents.
    #[error("dimension mismatch: {left} is {left_dims:?} but {right} is {right_dims:?} (rows, cols)")]
    DimensionMismatch {
        left: String,
        right: String,
        left_dims: (usize, usize),
        right_dims: (usize, usize),
    },

    /// An aggregate was requested over an empty set.
    #[error("degenerate statistics: no {quantity}")]
    DegenerateStatistics { quantity: &'static str },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unsupported raster format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl EvalError {
    /// True for failures that must abort the run. Degenerate statistics are
    /// reported as a sentinel instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EvalError::DegenerateStatistics { .. })
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
