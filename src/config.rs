// src/config.rs
//! Tunables for one node build.
//!
//! Every field has a default, so a JSON options file only needs to name the
//! values it changes:
//!
//! ```
//! use rust_nodes::BuildOptions;
//!
//! let opts = BuildOptions::from_json_str(r#"{ "gl_nodes": true }"#).unwrap();
//! assert!(opts.gl_nodes);
//! assert_eq!(opts.max_segs_per_pass, 64);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bsp::{
    AA_PREFERENCE, MAX_SEGS_PER_PASS, SIDE_EPSILON, SPLIT_COST, VERTEX_EPSILON,
};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Close every subsector with minisegs so it forms a polygon.
    pub gl_nodes: bool,

    /// Sets larger than this are sampled when looking for a splitter.
    pub max_segs_per_pass: usize,

    /// Score for every seg a candidate leaves unsplit.
    pub split_cost: i64,

    /// Bonus for horizontal and vertical splitters.
    pub aa_preference: i64,

    /// Points closer than this to a line are on it.
    pub side_epsilon: f64,

    /// Split points closer than this (per axis) share one vertex.
    pub vertex_epsilon: f64,

    /// Cell size of the vertex grid.
    pub vertex_cell_size: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            gl_nodes: false,
            max_segs_per_pass: MAX_SEGS_PER_PASS,
            split_cost: SPLIT_COST,
            aa_preference: AA_PREFERENCE,
            side_epsilon: SIDE_EPSILON,
            vertex_epsilon: VERTEX_EPSILON,
            vertex_cell_size: VERTEX_EPSILON * 2.0,
        }
    }
}

impl BuildOptions {
    /// Defaults with GL subsector closing switched on.
    pub fn gl() -> Self {
        BuildOptions {
            gl_nodes: true,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let opts: BuildOptions = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reads and validates a JSON options file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("side_epsilon", self.side_epsilon),
            ("vertex_epsilon", self.vertex_epsilon),
            ("vertex_cell_size", self.vertex_cell_size),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.vertex_cell_size < self.vertex_epsilon {
            return Err(ConfigError::CellTooSmall {
                cell: self.vertex_cell_size,
                epsilon: self.vertex_epsilon,
            });
        }
        if self.max_segs_per_pass == 0 {
            return Err(ConfigError::EmptyPass);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BuildOptions::default().validate().is_ok());
        assert!(BuildOptions::gl().gl_nodes);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = BuildOptions::from_json_str(r#"{ "split_cost": 12 }"#).unwrap();
        assert_eq!(opts.split_cost, 12);
        assert_eq!(opts.aa_preference, AA_PREFERENCE);
        assert!(!opts.gl_nodes);
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let err = BuildOptions::from_json_str(r#"{ "vertex_epsilon": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { name: "vertex_epsilon", .. }));
    }

    #[test]
    fn test_rejects_small_cell() {
        let opts = BuildOptions {
            vertex_cell_size: VERTEX_EPSILON / 2.0,
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(ConfigError::CellTooSmall { .. })));
    }

    #[test]
    fn test_rejects_empty_pass() {
        let err = BuildOptions::from_json_str(r#"{ "max_segs_per_pass": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPass));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            BuildOptions::from_json_str("{ gl_nodes"),
            Err(ConfigError::Parse(_))
        ));
    }
}
