// src/bsp/mod.rs
pub mod bsp_level;
pub mod bsp_node;
pub mod bsp_procedural;
mod bsp_util;
mod builder;
mod events;
mod extract;
mod heuristic;
mod minisegs;
mod planes;
mod split;
mod vertex_map;

pub use bsp_level::{BspLevel, BuildStats, Seg, SegmentSide, Subsector};
pub use bsp_node::{BspNode, NodeChild};
pub use bsp_util::{point_to_angle, BoundingBox, DivLine, Point2D, PointSide};
pub use vertex_map::VertexMap;

use crate::config::BuildOptions;
use crate::error::BuildError;
use crate::map::Level;

// Builder defaults; BuildOptions starts from these.
pub const MAX_SEGS_PER_PASS: usize = 64;
pub const SPLIT_COST: i64 = 8;
pub const AA_PREFERENCE: i64 = 16;
pub const SIDE_EPSILON: f64 = 6.5 / 65536.0;
pub const VERTEX_EPSILON: f64 = 6.0 / 65536.0;

/// Every scored splitter starts here so valid candidates stay positive.
pub const SCORE_BASE: i64 = 1_000_000;

/// Angular slack (BAM units) for "seg lies along the splitter" tests.
pub const ANGLE_EPSILON: u32 = 5000;

/// Where a seg falls relative to a partition line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegPosition {
    Front,
    Back,
    Spanning,
}

/// Builds the BSP tree for `level`. Shorthand for [`BspLevel::build`].
pub fn build_nodes(level: &Level, options: &BuildOptions) -> Result<BspLevel, BuildError> {
    BspLevel::build(level, options)
}
