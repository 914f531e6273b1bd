//! Error type shared by the whole crate.
//!
//! Only construction-time problems surface here: unknown strategy names,
//! invalid settings, mismatched raster sizes and a broken evaluation hand-off.
//! Operators (selection, crossover, mutation, replacement) never fail; they
//! degrade to clones or no-ops instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown {role} strategy '{name}'")]
    UnknownStrategy { role: &'static str, name: String },

    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("raster size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("evaluation returned {got} results for {expected} tasks")]
    ResultCountMismatch { expected: usize, got: usize },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
