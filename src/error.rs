// src/error.rs

use std::io;
use thiserror::Error;

/// Fatal problems with the input handed to the node builder.
/// Algorithmic trouble (no splitter, collapsing splits) never ends up here;
/// the builder degrades instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("linedef {line} references missing vertex {vertex}")]
    MissingVertex { line: usize, vertex: usize },

    #[error("linedef {line} references missing sidedef {side}")]
    MissingSideDef { line: usize, side: usize },

    #[error("sidedef {side} references missing sector {sector}")]
    MissingSector { side: usize, sector: usize },

    #[error("level has no usable segs")]
    NoSegs,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read build options: {0}")]
    Io(#[from] io::Error),

    #[error("invalid build options: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{name} must be positive and finite (got {value})")]
    NotPositive { name: &'static str, value: f64 },

    #[error("vertex cell size {cell} is smaller than the vertex epsilon {epsilon}")]
    CellTooSmall { cell: f64, epsilon: f64 },

    #[error("max_segs_per_pass must be at least 1")]
    EmptyPass,
}
