// src/bsp/bsp_procedural.rs
//! Seeded test maps: a grid of jittered quads, some neighbours merged into
//! one sector.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::bsp::Point2D;
use crate::map::Level;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub columns: usize,
    pub rows: usize,
    pub cell_size: f64,
    /// Largest per-axis offset applied to interior grid points. Keep it
    /// under a quarter of `cell_size` so every cell stays convex.
    pub jitter: f64,
    /// Chance that two neighbouring cells become one sector.
    pub merge_chance: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            columns: 8,
            rows: 8,
            cell_size: 128.0,
            jitter: 16.0,
            merge_chance: 0.3,
            seed: 0,
        }
    }
}

pub struct GridGenerator {
    config: GeneratorConfig,
}

impl GridGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        GridGenerator { config }
    }

    /// Builds the level. The same config always yields the same level.
    pub fn generate(&self) -> Level {
        let cfg = &self.config;
        let mut level = Level::new("GRID");
        if cfg.columns == 0 || cfg.rows == 0 {
            return level;
        }

        for row in self.grid_points() {
            for p in row {
                level.add_vertex(p.x, p.y);
            }
        }

        let sector_of_cell = self.assign_sectors(&mut level);
        let cols = cfg.columns;
        let vertex = |r: usize, c: usize| r * (cols + 1) + c;
        let cell = |r: usize, c: usize| sector_of_cell[r * cols + c];

        // Vertical lines run up with the right-hand cell in front; the east
        // boundary runs down so it faces its cell.
        for r in 0..cfg.rows {
            for c in 0..=cols {
                let (a, b) = (vertex(r, c), vertex(r + 1, c));
                match (c.checked_sub(1).map(|w| cell(r, w)), (c < cols).then(|| cell(r, c))) {
                    (None, Some(east)) => {
                        level.add_linedef(a, b, Some(east), None);
                    }
                    (Some(west), None) => {
                        level.add_linedef(b, a, Some(west), None);
                    }
                    (Some(west), Some(east)) if west != east => {
                        level.add_linedef(a, b, Some(east), Some(west));
                    }
                    _ => {}
                }
            }
        }

        // Horizontal lines run east with the cell below in front; the south
        // boundary runs west.
        for r in 0..=cfg.rows {
            for c in 0..cols {
                let (a, b) = (vertex(r, c), vertex(r, c + 1));
                match (r.checked_sub(1).map(|s| cell(s, c)), (r < cfg.rows).then(|| cell(r, c))) {
                    (None, Some(north)) => {
                        level.add_linedef(b, a, Some(north), None);
                    }
                    (Some(south), None) => {
                        level.add_linedef(a, b, Some(south), None);
                    }
                    (Some(south), Some(north)) if south != north => {
                        level.add_linedef(a, b, Some(south), Some(north));
                    }
                    _ => {}
                }
            }
        }

        debug!(
            "generated {}x{} grid: {} sectors, {} linedefs",
            cfg.columns,
            cfg.rows,
            level.sectors.len(),
            level.linedefs.len()
        );
        level
    }

    /// Grid points by row. Each row draws from its own seeded stream so rows
    /// can be jittered in parallel.
    fn grid_points(&self) -> Vec<Vec<Point2D>> {
        let cfg = &self.config;
        (0..=cfg.rows)
            .into_par_iter()
            .map(|r| {
                let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add((r as u64 + 1) << 32));
                (0..=cfg.columns)
                    .map(|c| {
                        let mut p = Point2D::new(c as f64 * cfg.cell_size, r as f64 * cfg.cell_size);
                        let interior = r > 0 && r < cfg.rows && c > 0 && c < cfg.columns;
                        if interior && cfg.jitter > 0.0 {
                            p.x += rng.random_range(-cfg.jitter..=cfg.jitter);
                            p.y += rng.random_range(-cfg.jitter..=cfg.jitter);
                        }
                        p
                    })
                    .collect()
            })
            .collect()
    }

    /// Merges neighbouring cells and adds one sector per group. Returns the
    /// sector of every cell, row-major. Sectors are numbered in the order
    /// their first cell appears, so an unmerged grid numbers them like its
    /// cells.
    fn assign_sectors(&self, level: &mut Level) -> Vec<usize> {
        let cfg = &self.config;
        let cols = cfg.columns;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut groups = QuickUnionUf::<UnionBySize>::new(cols * cfg.rows);

        for r in 0..cfg.rows {
            for c in 0..cols {
                let here = r * cols + c;
                if c + 1 < cols && rng.random::<f64>() < cfg.merge_chance {
                    groups.union(here, here + 1);
                }
                if r + 1 < cfg.rows && rng.random::<f64>() < cfg.merge_chance {
                    groups.union(here, here + cols);
                }
            }
        }

        let mut sector_of_root = vec![None; cols * cfg.rows];
        (0..cols * cfg.rows)
            .map(|cell| {
                let root = groups.find(cell);
                *sector_of_root[root].get_or_insert_with(|| {
                    let floor = 8 * rng.random_range(0..4);
                    level.add_sector(floor, 128)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(merge_chance: f64, seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            columns: 4,
            rows: 3,
            cell_size: 64.0,
            jitter: 10.0,
            merge_chance,
            seed,
        }
    }

    #[test]
    fn test_unmerged_grid_counts() {
        let level = GridGenerator::new(config(0.0, 1)).generate();
        assert_eq!(level.vertices.len(), 5 * 4);
        assert_eq!(level.sectors.len(), 12);
        // 14 boundary lines, 3*3 interior vertical, 4*2 interior horizontal.
        assert_eq!(level.linedefs.len(), 14 + 9 + 8);
        assert_eq!(level.side_count(), 14 + 2 * 17);
    }

    #[test]
    fn test_full_merge_leaves_only_boundary() {
        let level = GridGenerator::new(config(1.0, 1)).generate();
        assert_eq!(level.sectors.len(), 1);
        assert_eq!(level.linedefs.len(), 14);
        assert!(level.linedefs.iter().all(|l| l.left.is_none()));
    }

    #[test]
    fn test_same_seed_same_level() {
        let a = GridGenerator::new(config(0.4, 9)).generate();
        let b = GridGenerator::new(config(0.4, 9)).generate();
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.linedefs, b.linedefs);
        assert_eq!(a.sectors.len(), b.sectors.len());
    }

    #[test]
    fn test_boundary_points_stay_on_the_edge() {
        let level = GridGenerator::new(config(0.0, 3)).generate();
        let cols = 4;
        for (i, v) in level.vertices.iter().enumerate() {
            let (r, c) = (i / (cols + 1), i % (cols + 1));
            if r == 0 || r == 3 || c == 0 || c == cols {
                assert_eq!((v.x, v.y), (c as f64 * 64.0, r as f64 * 64.0));
            } else {
                assert!((v.x - c as f64 * 64.0).abs() <= 10.0);
                assert!((v.y - r as f64 * 64.0).abs() <= 10.0);
            }
        }
    }

    #[test]
    fn test_front_sides_face_their_cell() {
        // With no merges, a line's front sector is the cell on its right.
        let level = GridGenerator::new(GeneratorConfig {
            jitter: 0.0,
            ..config(0.0, 5)
        })
        .generate();
        for line in &level.linedefs {
            let a = &level.vertices[line.start];
            let b = &level.vertices[line.end];
            let mid = ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
            // Step a little to the right of the direction of travel.
            let (dx, dy) = (b.x - a.x, b.y - a.y);
            let len = dx.hypot(dy);
            let probe = (mid.0 + dy / len * 4.0, mid.1 - dx / len * 4.0);
            let cell = (probe.1 / 64.0).floor() as usize * 4 + (probe.0 / 64.0).floor() as usize;
            let front = line.right.and_then(|s| level.sector_of_side(s));
            assert_eq!(front, Some(cell));
        }
    }
}
