// src/bsp/bsp_level.rs

use log::info;
use serde::{Deserialize, Serialize};

use crate::bsp::builder::NodeBuilder;
use crate::bsp::{BoundingBox, BspNode, NodeChild, Point2D};
use crate::config::BuildOptions;
use crate::error::BuildError;
use crate::map::Level;

/// One piece of a linedef side (or a miniseg, when `linedef` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seg {
    pub v1: usize,
    pub v2: usize,
    pub linedef: Option<usize>,
    pub sidedef: Option<usize>,
    pub side: SegmentSide, // Keep track if it's a front (right) or back (left) side
    pub front_sector: Option<usize>,
    pub back_sector: Option<usize>,
    /// The seg running the other way along the same piece of line.
    pub partner: Option<usize>,
    /// Direction as a binary angle.
    pub angle: u32,
    /// Distance from the start of the linedef side to `v1`.
    pub offset: f64,
}

impl Seg {
    pub fn is_miniseg(&self) -> bool {
        self.linedef.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentSide {
    Front, // Right side of linedef
    Back,  // Left side of linedef
}

/// A convex leaf: `num_segs` segs starting at `first_seg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsector {
    pub first_seg: usize,
    pub num_segs: usize,
    pub sector: Option<usize>,
    pub bbox: BoundingBox,
}

impl Subsector {
    pub fn seg_range(&self) -> std::ops::Range<usize> {
        self.first_seg..self.first_seg + self.num_segs
    }
}

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub input_segs: usize,
    pub planes: usize,
    pub splits: usize,
    /// Cuts that landed on an endpoint and were placed whole instead.
    pub collapsed_splits: usize,
    /// Partitions synthesized because no seg made a usable splitter.
    pub forced_splits: usize,
    pub minisegs: usize,
}

/// The finished tree and its seg, vertex and subsector arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BspLevel {
    /// Input vertices in their original order, then every vertex created by
    /// a split.
    pub vertices: Vec<Point2D>,
    pub segs: Vec<Seg>,
    pub subsectors: Vec<Subsector>,
    /// Children come before their parents; the root is the last node.
    pub nodes: Vec<BspNode>,
    pub root: NodeChild,
    pub stats: BuildStats,
}

impl BspLevel {
    pub fn build(level: &Level, options: &BuildOptions) -> Result<Self, BuildError> {
        options.validate()?;

        // 1. Segs from linedef sides, then the polyobject loops they form.
        let mut builder = NodeBuilder::new(options);
        builder.make_segs_from_sides(level)?;
        builder.find_poly_containers(&level.poly_spots);

        // 2. One set holding every seg, grouped into planes.
        let head = builder.group_seg_planes().ok_or(BuildError::NoSegs)?;
        let count = builder.segs.len();

        // 3. Build the tree recursively.
        let mut bbox = BoundingBox::new_empty();
        let root = builder.create_node(head, count, &mut bbox);

        // 4. Flatten.
        let bsp = builder.extract(root);
        info!(
            "{}: {} nodes, {} subsectors, {} segs, {} vertices ({} splits)",
            if level.name.is_empty() { "<unnamed>" } else { &level.name },
            bsp.nodes.len(),
            bsp.subsectors.len(),
            bsp.segs.len(),
            bsp.vertices.len(),
            bsp.stats.splits
        );
        Ok(bsp)
    }

    /// Subsector containing `point`. Points on a partition line go to its
    /// front side.
    pub fn locate(&self, point: Point2D) -> usize {
        let mut child = self.root;
        loop {
            match child {
                NodeChild::Subsector(ss) => return ss,
                NodeChild::Node(n) => {
                    let node = &self.nodes[n];
                    child = if node.partition.classify_point(&point) < 0.0 {
                        node.back()
                    } else {
                        node.front()
                    };
                }
            }
        }
    }

    pub fn subsector_segs(&self, ss: usize) -> &[Seg] {
        &self.segs[self.subsectors[ss].seg_range()]
    }

    pub fn seg_points(&self, seg: &Seg) -> (Point2D, Point2D) {
        (self.vertices[seg.v1], self.vertices[seg.v2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::bsp_procedural::{GeneratorConfig, GridGenerator};
    use crate::bsp::{DivLine, PointSide};
    use assert_approx_eq::assert_approx_eq;

    fn square(size: f64) -> Level {
        let mut level = Level::new("SQUARE");
        let s = level.add_sector(0, 128);
        level.add_loop(&[(0.0, 0.0), (0.0, size), (size, size), (size, 0.0)], s);
        level
    }

    /// Two 10x10 rooms sharing the wall x = 10.
    fn two_rooms() -> Level {
        let mut level = Level::new("TWO");
        let left = level.add_sector(0, 128);
        let right = level.add_sector(8, 128);
        let v: Vec<usize> = [(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (20.0, 10.0), (20.0, 0.0), (10.0, 0.0)]
            .iter()
            .map(|&(x, y)| level.add_vertex(x, y))
            .collect();
        level.add_linedef(v[0], v[1], Some(left), None);
        level.add_linedef(v[1], v[2], Some(left), None);
        level.add_linedef(v[2], v[3], Some(right), None);
        level.add_linedef(v[3], v[4], Some(right), None);
        level.add_linedef(v[4], v[5], Some(right), None);
        level.add_linedef(v[5], v[0], Some(left), None);
        level.add_linedef(v[5], v[2], Some(right), Some(left));
        level
    }

    fn grid(seed: u64, merge_chance: f64) -> Level {
        GridGenerator::new(GeneratorConfig {
            columns: 5,
            rows: 4,
            cell_size: 64.0,
            jitter: 12.0,
            merge_chance,
            seed,
        })
        .generate()
    }

    fn assert_partner_symmetry(bsp: &BspLevel) {
        for (i, seg) in bsp.segs.iter().enumerate() {
            if let Some(p) = seg.partner {
                let other = &bsp.segs[p];
                assert_eq!(other.partner, Some(i), "partner of {} does not point back", i);
                assert_eq!(other.v1, seg.v2);
                assert_eq!(other.v2, seg.v1);
                assert_eq!(other.front_sector, seg.back_sector);
            }
        }
    }

    fn assert_homogeneous(bsp: &BspLevel) {
        for (i, ss) in bsp.subsectors.iter().enumerate() {
            let mut sectors = bsp
                .subsector_segs(i)
                .iter()
                .filter(|s| !s.is_miniseg() && s.front_sector != s.back_sector)
                .map(|s| s.front_sector);
            if let Some(first) = sectors.next() {
                assert!(sectors.all(|s| s == first), "subsector {} mixes sectors", i);
                assert_eq!(ss.sector, first);
            }
        }
    }

    fn assert_convex(bsp: &BspLevel) {
        for i in 0..bsp.subsectors.len() {
            let segs = bsp.subsector_segs(i);
            for seg in segs.iter().filter(|s| !s.is_miniseg()) {
                let (a, b) = bsp.seg_points(seg);
                let line = DivLine::from_points(a, b);
                for other in segs.iter().filter(|s| !s.is_miniseg()) {
                    let (p, q) = bsp.seg_points(other);
                    for pt in [p, q] {
                        assert_ne!(
                            line.point_side(&pt, 0.01),
                            PointSide::Back,
                            "subsector {} is not convex",
                            i
                        );
                    }
                }
            }
        }
    }

    fn assert_conservation(level: &Level, bsp: &BspLevel) {
        for (line_idx, line) in level.linedefs.iter().enumerate() {
            for (side, sidedef) in [(SegmentSide::Front, line.right), (SegmentSide::Back, line.left)] {
                let Some(sidedef) = sidedef else { continue };
                let pieces: Vec<&Seg> = bsp
                    .segs
                    .iter()
                    .filter(|s| s.linedef == Some(line_idx) && s.side == side)
                    .collect();
                assert!(!pieces.is_empty(), "side of linedef {} vanished", line_idx);
                assert!(pieces.iter().all(|s| s.sidedef == Some(sidedef)));

                let (a, b) = (&level.vertices[line.start], &level.vertices[line.end]);
                let total: f64 = pieces
                    .iter()
                    .map(|s| {
                        let (p, q) = bsp.seg_points(s);
                        (q.x - p.x).hypot(q.y - p.y)
                    })
                    .sum();
                assert_approx_eq!(total, (b.x - a.x).hypot(b.y - a.y), 1e-3);
            }
        }
    }

    fn assert_closed(bsp: &BspLevel) {
        for (i, ss) in bsp.subsectors.iter().enumerate() {
            let segs = bsp.subsector_segs(i);
            assert!(ss.num_segs > 0, "subsector {} is empty", i);
            for k in 0..segs.len() {
                let next = &segs[(k + 1) % segs.len()];
                assert_eq!(segs[k].v2, next.v1, "subsector {} is open after seg {}", i, k);
            }
        }
    }

    #[test]
    fn test_square_is_one_subsector() {
        for options in [BuildOptions::default(), BuildOptions::gl()] {
            let level = square(10.0);
            let bsp = BspLevel::build(&level, &options).unwrap();
            assert_eq!(bsp.subsectors.len(), 1);
            assert_eq!(bsp.segs.len(), 4);
            assert_eq!(bsp.vertices.len(), 4);
            assert!(bsp.nodes.is_empty());
            assert_eq!(bsp.root, NodeChild::Subsector(0));
            assert_eq!(bsp.subsectors[0].sector, Some(0));
            assert_eq!(bsp.subsectors[0].bbox, BoundingBox::new(0.0, 0.0, 10.0, 10.0));
            assert_eq!(bsp.stats.splits, 0);
        }
    }

    #[test]
    fn test_convex_room_keeps_every_wall() {
        let mut level = Level::new("OCT");
        let s = level.add_sector(0, 128);
        let points: Vec<(f64, f64)> = (0..8)
            .map(|i| {
                // Clockwise: decreasing angle.
                let a = -(i as f64) * std::f64::consts::TAU / 8.0;
                (100.0 * a.cos(), 100.0 * a.sin())
            })
            .collect();
        level.add_loop(&points, s);
        let bsp = BspLevel::build(&level, &BuildOptions::gl()).unwrap();
        assert_eq!(bsp.subsectors.len(), 1);
        assert_eq!(bsp.segs.len(), 8);
        assert!(bsp.nodes.is_empty());
        assert_closed(&bsp);
    }

    #[test]
    fn test_two_rooms_split_on_shared_wall() {
        let level = two_rooms();
        let bsp = BspLevel::build(&level, &BuildOptions::default()).unwrap();

        assert_eq!(bsp.nodes.len(), 1);
        assert_eq!(bsp.subsectors.len(), 2);
        assert_eq!(bsp.root, NodeChild::Node(0));
        let node = &bsp.nodes[0];
        assert_eq!(node.partition.x, 10.0);
        assert_eq!(node.partition.dx, 0.0);
        assert_eq!(node.bounds(), BoundingBox::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(bsp.stats.splits, 0);
        assert_eq!(bsp.vertices.len(), 6);
        assert_homogeneous(&bsp);
        assert_partner_symmetry(&bsp);

        let left = bsp.locate(Point2D::new(5.0, 5.0));
        let right = bsp.locate(Point2D::new(15.0, 5.0));
        assert_ne!(left, right);
        assert_eq!(bsp.subsectors[left].sector, Some(0));
        assert_eq!(bsp.subsectors[right].sector, Some(1));
    }

    #[test]
    fn test_locate_on_partition_takes_front_child() {
        let bsp = BspLevel::build(&two_rooms(), &BuildOptions::default()).unwrap();
        let NodeChild::Subsector(front) = bsp.nodes[0].front() else {
            panic!("front child of the root should be a subsector");
        };
        assert_eq!(bsp.locate(Point2D::new(10.0, 5.0)), front);
        assert_eq!(bsp.locate(Point2D::new(10.0, 0.0)), front);
    }

    #[test]
    fn test_two_rooms_gl_closed() {
        let level = two_rooms();
        let bsp = BspLevel::build(&level, &BuildOptions::gl()).unwrap();
        assert_eq!(bsp.subsectors.len(), 2);
        assert_eq!(bsp.segs.len(), 8);
        assert_closed(&bsp);
        assert_partner_symmetry(&bsp);
    }

    #[test]
    fn test_offsets_follow_the_line() {
        let level = two_rooms();
        let bsp = BspLevel::build(&level, &BuildOptions::default()).unwrap();
        for seg in bsp.segs.iter().filter(|s| s.linedef.is_some()) {
            assert_approx_eq!(seg.offset, 0.0);
        }
        let west = bsp.segs.iter().find(|s| s.linedef == Some(0)).unwrap();
        assert_eq!(west.angle, 0x4000_0000);
    }

    #[test]
    fn test_jittered_grids_hold_invariants() {
        for seed in 0..6 {
            for merge in [0.0, 0.4] {
                let level = grid(seed, merge);
                for options in [BuildOptions::default(), BuildOptions::gl()] {
                    let bsp = BspLevel::build(&level, &options).unwrap();
                    assert_partner_symmetry(&bsp);
                    assert_homogeneous(&bsp);
                    assert_convex(&bsp);
                    assert_conservation(&level, &bsp);
                    if options.gl_nodes {
                        assert_closed(&bsp);
                    }
                    assert_eq!(bsp.stats.collapsed_splits, 0);
                }
            }
        }
    }

    #[test]
    fn test_locate_finds_cell_sector() {
        let level = grid(7, 0.0);
        let bsp = BspLevel::build(&level, &BuildOptions::default()).unwrap();
        // Cell centres stay inside their cells whatever the jitter.
        for row in 0..4 {
            for col in 0..5 {
                let p = Point2D::new(col as f64 * 64.0 + 32.0, row as f64 * 64.0 + 32.0);
                let ss = bsp.locate(p);
                assert_eq!(bsp.subsectors[ss].sector, Some(row * 5 + col));
            }
        }
    }

    #[test]
    fn test_poly_container_is_not_split() {
        let mut level = Level::new("POLY");
        let outer = level.add_sector(0, 128);
        let inner = level.add_sector(0, 0);
        level.add_loop(&[(0.0, 0.0), (0.0, 256.0), (256.0, 256.0), (256.0, 0.0)], outer);
        let pts = [(96.0, 96.0), (96.0, 160.0), (160.0, 160.0), (160.0, 96.0)];
        let v: Vec<usize> = pts.iter().map(|&(x, y)| level.add_vertex(x, y)).collect();
        for k in 0..4 {
            level.add_linedef(v[k], v[(k + 1) % 4], Some(inner), Some(outer));
        }
        // A diagonal pillar whose faces would cut straight through the box.
        let pillar = level.add_sector(0, 128);
        let p: Vec<usize> = [(20.0, 40.0), (40.0, 20.0), (30.0, 10.0), (10.0, 30.0)]
            .iter()
            .map(|&(x, y)| level.add_vertex(x, y))
            .collect();
        for k in 0..4 {
            level.add_linedef(p[k], p[(k + 1) % 4], Some(pillar), Some(outer));
        }
        level.add_poly_spot(128.0, 128.0);

        let bsp = BspLevel::build(&level, &BuildOptions::default()).unwrap();
        for line in 4..8 {
            let pieces = bsp
                .segs
                .iter()
                .filter(|s| s.linedef == Some(line) && s.side == SegmentSide::Front)
                .count();
            assert_eq!(pieces, 1, "container line {} was split", line);
        }
        assert_homogeneous(&bsp);
    }

    #[test]
    fn test_overlapping_rooms_force_splits() {
        // Two identical rooms drawn on top of each other. No seg separates
        // them, so every split has to be synthesized.
        let mut level = Level::new("OVERLAP");
        let a = level.add_sector(0, 128);
        let b = level.add_sector(16, 128);
        let corners = [(0.0, 0.0), (0.0, 64.0), (64.0, 64.0), (64.0, 0.0)];
        level.add_loop(&corners, a);
        level.add_loop(&corners, b);

        for options in [BuildOptions::default(), BuildOptions::gl()] {
            let bsp = BspLevel::build(&level, &options).unwrap();
            assert!(bsp.stats.forced_splits > 0);
            assert!(bsp.subsectors.len() > 1);
            assert_homogeneous(&bsp);
            assert_partner_symmetry(&bsp);
            if options.gl_nodes {
                assert_closed(&bsp);
            }
        }
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = BuildOptions {
            side_epsilon: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            BspLevel::build(&square(10.0), &options),
            Err(BuildError::Config(_))
        ));
        assert!(matches!(
            BspLevel::build(&Level::new("EMPTY"), &BuildOptions::default()),
            Err(BuildError::NoSegs)
        ));
    }
}
