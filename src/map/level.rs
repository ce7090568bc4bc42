// src/map/level.rs

use serde::{Deserialize, Serialize};

use crate::map::{LineDef, Sector, SideDef, Vertex};

/// A point inside a polyobject container. Segs of the loop that encloses it
/// are never split by the node builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolySpot {
    pub x: f64,
    pub y: f64,
}

/// The flat geometry of one map: everything the node builder reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub linedefs: Vec<LineDef>,
    pub sidedefs: Vec<SideDef>,
    pub sectors: Vec<Sector>,
    pub poly_spots: Vec<PolySpot>,
}

impl Level {
    /// Create a new empty level.
    pub fn new(name: impl Into<String>) -> Self {
        Level {
            name: name.into(),
            ..Default::default()
        }
    }

    // --- Geometry construction ---

    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, x: f64, y: f64) -> usize {
        self.vertices.push(Vertex::new(x, y));
        self.vertices.len() - 1
    }

    /// Adds a sector and returns its index.
    pub fn add_sector(&mut self, floor_height: i32, ceiling_height: i32) -> usize {
        self.sectors.push(Sector::new(floor_height, ceiling_height));
        self.sectors.len() - 1
    }

    /// Adds a sidedef facing `sector` and returns its index.
    pub fn add_sidedef(&mut self, sector: usize) -> usize {
        self.sidedefs.push(SideDef::new(sector));
        self.sidedefs.len() - 1
    }

    /// Adds a linedef from `start` to `end`. The front (right) side faces
    /// `front_sector`; `back_sector` makes the line two-sided.
    /// A new sidedef is created for each side.
    pub fn add_linedef(
        &mut self,
        start: usize,
        end: usize,
        front_sector: Option<usize>,
        back_sector: Option<usize>,
    ) -> usize {
        let right = front_sector.map(|s| self.add_sidedef(s));
        let left = back_sector.map(|s| self.add_sidedef(s));
        self.linedefs.push(LineDef::new(start, end, right, left));
        self.linedefs.len() - 1
    }

    /// Adds a closed loop of one-sided lines through `points`, front side
    /// facing `sector`. Points must run clockwise around the sector.
    /// Returns the index of the first linedef.
    pub fn add_loop(&mut self, points: &[(f64, f64)], sector: usize) -> usize {
        let first_vertex = self.vertices.len();
        for &(x, y) in points {
            self.add_vertex(x, y);
        }
        let first_line = self.linedefs.len();
        for i in 0..points.len() {
            let start = first_vertex + i;
            let end = first_vertex + (i + 1) % points.len();
            self.add_linedef(start, end, Some(sector), None);
        }
        first_line
    }

    pub fn add_poly_spot(&mut self, x: f64, y: f64) {
        self.poly_spots.push(PolySpot { x, y });
    }

    /// Sector index referenced by a sidedef, if the sidedef exists.
    pub fn sector_of_side(&self, side: usize) -> Option<usize> {
        self.sidedefs.get(side).map(|sd| sd.sector)
    }

    /// Number of seg-producing sides across all linedefs.
    pub fn side_count(&self) -> usize {
        self.linedefs
            .iter()
            .map(|l| l.right.is_some() as usize + l.left.is_some() as usize)
            .sum()
    }
}
