// src/bsp/builder.rs
//! Per-build state and the recursive tree driver.
//!
//! Every seg, vertex and node lives in an arena owned by [`NodeBuilder`];
//! everything else refers to them by index. A set of segs is the head of a
//! chain threaded through [`PrivSeg::next`].

use log::{debug, warn};

use crate::bsp::bsp_level::{BuildStats, SegmentSide};
use crate::bsp::bsp_node::{BspNode, NodeChild};
use crate::bsp::bsp_util::{point_to_angle, BoundingBox, DivLine, Point2D};
use crate::bsp::events::EventTree;
use crate::bsp::heuristic::Selection;
use crate::bsp::vertex_map::VertexMap;
use crate::config::BuildOptions;
use crate::error::BuildError;
use crate::map::{Level, PolySpot};

#[derive(Debug, Clone)]
pub(crate) struct PrivSeg {
    pub v1: usize,
    pub v2: usize,
    /// `None` for minisegs.
    pub linedef: Option<usize>,
    pub sidedef: Option<usize>,
    pub side: SegmentSide,
    pub front_sector: Option<usize>,
    pub back_sector: Option<usize>,
    pub next: Option<usize>,
    pub partner: Option<usize>,
    /// Non-zero for segs of a polyobject container.
    pub loop_num: u32,
    pub plane: Option<usize>,
    pub plane_front: bool,
    /// Index in the output seg array once extracted.
    pub stored: Option<usize>,
}

impl PrivSeg {
    pub(crate) fn miniseg(v1: usize, v2: usize) -> Self {
        PrivSeg {
            v1,
            v2,
            linedef: None,
            sidedef: None,
            side: SegmentSide::Front,
            front_sector: None,
            back_sector: None,
            next: None,
            partner: None,
            loop_num: 0,
            plane: None,
            plane_front: true,
            stored: None,
        }
    }

    pub(crate) fn is_miniseg(&self) -> bool {
        self.linedef.is_none()
    }

    /// Same sector on both sides.
    pub(crate) fn is_special(&self) -> bool {
        self.front_sector == self.back_sector
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PrivVert {
    pub pos: Point2D,
    /// Segs whose `v1` is this vertex.
    pub starts: Vec<usize>,
    /// Segs whose `v2` is this vertex.
    pub ends: Vec<usize>,
    /// First input vertex that landed here.
    pub index: Option<usize>,
}

impl PrivVert {
    fn new(pos: Point2D, index: Option<usize>) -> Self {
        PrivVert {
            pos,
            starts: Vec::new(),
            ends: Vec::new(),
            index,
        }
    }
}

/// A collinear seg touching several events of the current splitter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitSharer {
    pub distance: f64,
    pub seg: usize,
    pub forward: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SubsectorSet {
    pub head: Option<usize>,
    pub bbox: BoundingBox,
}

pub(crate) struct NodeBuilder {
    pub(crate) options: BuildOptions,
    pub(crate) segs: Vec<PrivSeg>,
    pub(crate) vertices: Vec<PrivVert>,
    pub(crate) vertex_map: VertexMap,
    pub(crate) planes: Vec<DivLine>,
    pub(crate) nodes: Vec<BspNode>,
    pub(crate) subsector_sets: Vec<SubsectorSet>,
    pub(crate) events: EventTree,
    pub(crate) split_sharers: Vec<SplitSharer>,
    pub(crate) hack_seg: Option<usize>,
    pub(crate) hack_mate: Option<usize>,
    pub(crate) stats: BuildStats,
    /// Input vertex positions, in input order.
    pub(crate) input_vertices: Vec<Point2D>,
    /// Start and end of every linedef, for seg offsets.
    pub(crate) line_ends: Vec<(Point2D, Point2D)>,
}

/// Iterates the members of one set.
pub(crate) struct SetIter<'a> {
    segs: &'a [PrivSeg],
    cur: Option<usize>,
}

impl Iterator for SetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let cur = self.cur?;
        self.cur = self.segs[cur].next;
        Some(cur)
    }
}

impl NodeBuilder {
    pub(crate) fn new(options: &BuildOptions) -> Self {
        NodeBuilder {
            vertex_map: VertexMap::new(options.vertex_cell_size, options.vertex_epsilon),
            options: options.clone(),
            segs: Vec::new(),
            vertices: Vec::new(),
            planes: Vec::new(),
            nodes: Vec::new(),
            subsector_sets: Vec::new(),
            events: EventTree::new(),
            split_sharers: Vec::new(),
            hack_seg: None,
            hack_mate: None,
            stats: BuildStats::default(),
            input_vertices: Vec::new(),
            line_ends: Vec::new(),
        }
    }

    pub(crate) fn set_iter(&self, head: Option<usize>) -> SetIter<'_> {
        SetIter {
            segs: &self.segs,
            cur: head,
        }
    }

    pub(crate) fn vertex_pos(&self, v: usize) -> Point2D {
        self.vertices[v].pos
    }

    pub(crate) fn seg_ends(&self, seg: usize) -> (Point2D, Point2D) {
        let s = &self.segs[seg];
        (self.vertices[s.v1].pos, self.vertices[s.v2].pos)
    }

    pub(crate) fn seg_angle(&self, seg: usize) -> u32 {
        let (a, b) = self.seg_ends(seg);
        point_to_angle(b.x - a.x, b.y - a.y)
    }

    /// Pushes a seg and files it under both of its vertices.
    pub(crate) fn add_seg(&mut self, seg: PrivSeg) -> usize {
        let id = self.segs.len();
        self.vertices[seg.v1].starts.push(id);
        self.vertices[seg.v2].ends.push(id);
        self.segs.push(seg);
        id
    }

    // --- Vertices ---

    /// Vertex at exactly `point`, created if needed. Used for input vertices.
    pub(crate) fn select_vertex_exact(&mut self, point: Point2D, input: usize) -> usize {
        if let Some(id) = self.vertex_map.find_exact(&point) {
            return id;
        }
        self.push_vertex(point, Some(input))
    }

    /// Vertex within the vertex epsilon of `point`, created if needed.
    /// Used for split points.
    pub(crate) fn select_vertex_close(&mut self, point: Point2D) -> usize {
        if let Some(id) = self.vertex_map.find_near(&point) {
            return id;
        }
        self.push_vertex(point, None)
    }

    fn push_vertex(&mut self, point: Point2D, index: Option<usize>) -> usize {
        let id = self.vertices.len();
        self.vertices.push(PrivVert::new(point, index));
        self.vertex_map.insert(id, point);
        id
    }

    // --- Input ---

    /// Turns every linedef side into a seg. Two-sided lines get a partnered
    /// pair.
    pub(crate) fn make_segs_from_sides(&mut self, level: &Level) -> Result<(), BuildError> {
        self.input_vertices = level.vertices.iter().map(|v| Point2D::new(v.x, v.y)).collect();
        let mut input_verts = Vec::with_capacity(level.vertices.len());
        for i in 0..self.input_vertices.len() {
            input_verts.push(self.select_vertex_exact(self.input_vertices[i], i));
        }

        for (line_idx, line) in level.linedefs.iter().enumerate() {
            let vertex = |v: usize| {
                input_verts
                    .get(v)
                    .copied()
                    .ok_or(BuildError::MissingVertex { line: line_idx, vertex: v })
            };
            let v1 = vertex(line.start)?;
            let v2 = vertex(line.end)?;
            let right = side_sector(level, line_idx, line.right)?;
            let left = side_sector(level, line_idx, line.left)?;
            self.line_ends.push((self.vertices[v1].pos, self.vertices[v2].pos));

            if v1 == v2 {
                warn!("linedef {} has zero length, skipped", line_idx);
                continue;
            }

            let front = right.map(|(side, sector)| {
                self.add_seg(PrivSeg {
                    linedef: Some(line_idx),
                    sidedef: Some(side),
                    side: SegmentSide::Front,
                    front_sector: Some(sector),
                    back_sector: left.map(|(_, s)| s),
                    ..PrivSeg::miniseg(v1, v2)
                })
            });
            let back = left.map(|(side, sector)| {
                self.add_seg(PrivSeg {
                    linedef: Some(line_idx),
                    sidedef: Some(side),
                    side: SegmentSide::Back,
                    front_sector: Some(sector),
                    back_sector: right.map(|(_, s)| s),
                    ..PrivSeg::miniseg(v2, v1)
                })
            });
            if let (Some(f), Some(b)) = (front, back) {
                self.segs[f].partner = Some(b);
                self.segs[b].partner = Some(f);
            }
        }

        if self.segs.is_empty() {
            return Err(BuildError::NoSegs);
        }
        self.stats.input_segs = self.segs.len();
        debug!("{} segs from {} linedefs", self.segs.len(), level.linedefs.len());
        Ok(())
    }

    // --- Polyobject containers ---

    /// Marks the seg loop around each spot so splitters avoid cutting it.
    pub(crate) fn find_poly_containers(&mut self, spots: &[PolySpot]) {
        let mut loop_num = 1;
        for spot in spots {
            let p = Point2D::new(spot.x, spot.y);
            match self.nearest_facing_seg(p) {
                Some(seg) if self.segs[seg].loop_num == 0 => {
                    let marked = self.mark_loop(seg, loop_num);
                    debug!(
                        "polyobject container at ({}, {}): {} segs in loop {}",
                        spot.x, spot.y, marked, loop_num
                    );
                    loop_num += 1;
                }
                Some(_) => {}
                None => warn!("no container loop found around ({}, {})", spot.x, spot.y),
            }
        }
    }

    /// Casts a ray in +x from `p` and returns the closest seg it crosses
    /// whose front faces `p`.
    fn nearest_facing_seg(&self, p: Point2D) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for (i, seg) in self.segs.iter().enumerate() {
            if seg.is_miniseg() {
                continue;
            }
            let a = self.vertices[seg.v1].pos;
            let b = self.vertices[seg.v2].pos;
            if (a.y > p.y) == (b.y > p.y) {
                continue;
            }
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x < p.x {
                continue;
            }
            if DivLine::from_points(a, b).classify_point(&p) <= 0.0 {
                continue;
            }
            if best.map_or(true, |(bx, _)| x < bx) {
                best = Some((x, i));
            }
        }
        best.map(|(_, i)| i)
    }

    /// Walks the boundary of `start`'s front sector, tagging each seg and its
    /// partner. Returns the number of boundary segs walked.
    fn mark_loop(&mut self, start: usize, loop_num: u32) -> usize {
        let sector = self.segs[start].front_sector;
        let mut seg = start;
        let mut marked = 0;
        loop {
            self.segs[seg].loop_num = loop_num;
            if let Some(partner) = self.segs[seg].partner {
                self.segs[partner].loop_num = loop_num;
            }
            marked += 1;

            let back_angle = self.seg_angle(seg).wrapping_add(1 << 31);
            let v2 = self.segs[seg].v2;
            let mut best: Option<(u32, usize)> = None;
            for &out in &self.vertices[v2].starts {
                let s = &self.segs[out];
                if s.is_miniseg() || s.front_sector != sector {
                    continue;
                }
                let turn = self.seg_angle(out).wrapping_sub(back_angle);
                if turn != 0 && best.map_or(true, |(t, _)| turn < t) {
                    best = Some((turn, out));
                }
            }

            match best {
                Some((_, next)) if self.segs[next].loop_num != loop_num => seg = next,
                Some(_) => break,
                None => {
                    warn!("polyobject container loop {} is not closed", loop_num);
                    break;
                }
            }
        }
        marked
    }

    // --- Tree driver ---

    /// Builds the subtree for `set` and widens `bbox` to cover it.
    pub(crate) fn create_node(&mut self, set: usize, count: usize, bbox: &mut BoundingBox) -> NodeChild {
        match self.choose_partition(set, count) {
            Some((partition, splitter)) => {
                let plane = self.segs[splitter].plane;
                let split = self.split_segs(set, &partition, splitter, plane);

                let mut child_boxes = [BoundingBox::new_empty(), BoundingBox::new_empty()];
                let front = self.create_child(split.front, split.front_count, &mut child_boxes[0]);
                // Cuts made under the front child also cut partners waiting
                // in the back set.
                let back_count = self.set_iter(split.back).count();
                let back = self.create_child(split.back, back_count, &mut child_boxes[1]);
                bbox.combine(&child_boxes[0]);
                bbox.combine(&child_boxes[1]);

                self.nodes.push(BspNode::new(partition, child_boxes, [front, back]));
                NodeChild::Node(self.nodes.len() - 1)
            }
            None => self.create_subsector(Some(set), bbox),
        }
    }

    fn create_child(&mut self, set: Option<usize>, count: usize, bbox: &mut BoundingBox) -> NodeChild {
        match set {
            Some(head) => self.create_node(head, count, bbox),
            None => {
                warn!("split left one side empty");
                self.create_subsector(None, bbox)
            }
        }
    }

    /// Picks a splitter for `set`, or returns `None` when the set is a
    /// finished subsector.
    fn choose_partition(&mut self, set: usize, count: usize) -> Option<(DivLine, usize)> {
        let max = self.options.max_segs_per_pass.max(1);
        let step = count.div_ceil(max).max(1);

        let mut selection = self.select_splitter(set, step, true);
        if step > 1 && !selection.is_found() {
            selection = self.select_splitter(set, 1, true);
        }
        if selection == Selection::Rejected {
            selection = self.select_splitter(set, step, false);
            if step > 1 && !selection.is_found() {
                selection = self.select_splitter(set, 1, false);
            }
        }

        match selection {
            Selection::Found(seg) => Some((self.node_from_seg(seg), seg)),
            _ => self.check_subsector(set),
        }
    }

    /// The partition line running along `seg`'s plane.
    pub(crate) fn node_from_seg(&self, seg: usize) -> DivLine {
        match self.segs[seg].plane {
            Some(plane) => self.planes[plane],
            None => {
                let (a, b) = self.seg_ends(seg);
                DivLine::from_points(a, b)
            }
        }
    }

    /// Decides whether a set with no natural splitter can stand as a
    /// subsector. Returns a synthesized partition when it cannot.
    fn check_subsector(&mut self, set: usize) -> Option<(DivLine, usize)> {
        let mut sector = None;
        let mut offender = None;
        for i in self.set_iter(Some(set)) {
            let seg = &self.segs[i];
            if seg.is_miniseg() || seg.is_special() {
                continue;
            }
            match sector {
                None => sector = Some(seg.front_sector),
                Some(s) if s != seg.front_sector => {
                    offender = Some(i);
                    break;
                }
                Some(_) => {}
            }
        }

        match offender {
            None => {
                if self.options.gl_nodes {
                    self.check_subsector_overlapping_segs(set)
                } else {
                    None
                }
            }
            Some(seg) => {
                debug!("set {} spans several sectors, forcing a split at seg {}", set, seg);
                self.shove_seg_behind(set, seg, None)
            }
        }
    }

    /// Two segs starting at the same vertex cannot share a closed subsector.
    fn check_subsector_overlapping_segs(&mut self, set: usize) -> Option<(DivLine, usize)> {
        let members: Vec<usize> = self.set_iter(Some(set)).collect();
        for (n, &seg1) in members.iter().enumerate() {
            if self.segs[seg1].is_miniseg() {
                continue;
            }
            let v1 = self.segs[seg1].v1;
            for &seg2 in &members[n + 1..] {
                if self.segs[seg2].v1 != v1 {
                    continue;
                }
                let (first, second) = if self.segs[seg2].is_miniseg() {
                    (seg2, seg1)
                } else {
                    (seg1, seg2)
                };
                debug!("segs {} and {} share start vertex {}", first, second, v1);
                return self.shove_seg_behind(set, second, Some(first));
            }
        }
        None
    }

    /// Uses `seg`'s own line as the partition, with `seg` forced to the back.
    fn shove_seg_behind(&mut self, set: usize, seg: usize, mate: Option<usize>) -> Option<(DivLine, usize)> {
        let mut partition = self.node_from_seg(seg);
        if !self.segs[seg].plane_front {
            partition = partition.flipped();
        }
        self.hack_seg = Some(seg);
        self.hack_mate = mate;

        let plane = self.segs[seg].plane;
        if self.heuristic(&partition, plane, set, false) > 0 {
            self.stats.forced_splits += 1;
            Some((partition, seg))
        } else {
            debug!("could not force a split at seg {}", seg);
            self.hack_seg = None;
            self.hack_mate = None;
            None
        }
    }

    fn create_subsector(&mut self, set: Option<usize>, bbox: &mut BoundingBox) -> NodeChild {
        let mut ss_box = BoundingBox::new_empty();
        for i in self.set_iter(set) {
            let (a, b) = self.seg_ends(i);
            ss_box.expand_point(a.x, a.y);
            ss_box.expand_point(b.x, b.y);
        }
        bbox.combine(&ss_box);
        self.subsector_sets.push(SubsectorSet { head: set, bbox: ss_box });
        NodeChild::Subsector(self.subsector_sets.len() - 1)
    }
}

/// Validates a sidedef slot and resolves its sector.
fn side_sector(
    level: &Level,
    line: usize,
    side: Option<usize>,
) -> Result<Option<(usize, usize)>, BuildError> {
    let Some(side) = side else {
        return Ok(None);
    };
    let sector = level
        .sector_of_side(side)
        .ok_or(BuildError::MissingSideDef { line, side })?;
    if sector >= level.sectors.len() {
        return Err(BuildError::MissingSector { side, sector });
    }
    Ok(Some((side, sector)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_container() -> Level {
        let mut level = Level::new("POLY");
        let outer = level.add_sector(0, 128);
        let inner = level.add_sector(0, 0);
        level.add_loop(&[(0.0, 0.0), (0.0, 256.0), (256.0, 256.0), (256.0, 0.0)], outer);

        // Two-sided box whose right sides face the container sector.
        let a = level.add_vertex(96.0, 96.0);
        let b = level.add_vertex(96.0, 160.0);
        let c = level.add_vertex(160.0, 160.0);
        let d = level.add_vertex(160.0, 96.0);
        for (s, e) in [(a, b), (b, c), (c, d), (d, a)] {
            level.add_linedef(s, e, Some(inner), Some(outer));
        }
        level.add_poly_spot(128.0, 128.0);
        level
    }

    #[test]
    fn test_segs_from_sides() {
        let level = room_with_container();
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        builder.make_segs_from_sides(&level).unwrap();

        assert_eq!(builder.segs.len(), 12);
        assert_eq!(builder.vertices.len(), 8);
        for (i, seg) in builder.segs.iter().enumerate() {
            if let Some(p) = seg.partner {
                assert_eq!(builder.segs[p].partner, Some(i));
                assert_eq!(builder.segs[p].v1, seg.v2);
                assert_eq!(builder.segs[p].front_sector, seg.back_sector);
            }
        }
    }

    #[test]
    fn test_missing_references_are_errors() {
        let mut level = Level::new("BAD");
        let s = level.add_sector(0, 64);
        let v = level.add_vertex(0.0, 0.0);
        level.add_linedef(v, 9, Some(s), None);
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        assert!(matches!(
            builder.make_segs_from_sides(&level),
            Err(BuildError::MissingVertex { line: 0, vertex: 9 })
        ));

        let mut level = Level::new("BAD");
        let s = level.add_sector(0, 64);
        let v1 = level.add_vertex(0.0, 0.0);
        let v2 = level.add_vertex(0.0, 8.0);
        let line = level.add_linedef(v1, v2, Some(s), None);
        level.sidedefs[0].sector = 4;
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        assert!(matches!(
            builder.make_segs_from_sides(&level),
            Err(BuildError::MissingSector { side: 0, sector: 4 })
        ));

        level.linedefs[line].right = Some(3);
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        assert!(matches!(
            builder.make_segs_from_sides(&level),
            Err(BuildError::MissingSideDef { line: 0, side: 3 })
        ));
    }

    #[test]
    fn test_zero_length_lines_are_skipped() {
        let mut level = Level::new("ZERO");
        let s = level.add_sector(0, 64);
        let v1 = level.add_vertex(5.0, 5.0);
        let v2 = level.add_vertex(5.0, 5.0);
        level.add_linedef(v1, v2, Some(s), None);
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        assert!(matches!(builder.make_segs_from_sides(&level), Err(BuildError::NoSegs)));
        // Duplicate input vertices collapse onto one builder vertex.
        assert_eq!(builder.vertices.len(), 1);
    }

    #[test]
    fn test_poly_container_loop_is_marked() {
        let level = room_with_container();
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        builder.make_segs_from_sides(&level).unwrap();
        builder.find_poly_containers(&level.poly_spots);

        // Lines 0..4 are the outer room, 4..8 the container.
        for seg in &builder.segs {
            let expected = if seg.linedef >= Some(4) { 1 } else { 0 };
            assert_eq!(seg.loop_num, expected, "seg of linedef {:?}", seg.linedef);
        }
    }

    #[test]
    fn test_select_vertex_close_merges_nearby_points() {
        let mut builder = NodeBuilder::new(&BuildOptions::default());
        let eps = builder.options.vertex_epsilon;
        let a = builder.select_vertex_close(Point2D::new(10.0, 10.0));
        let b = builder.select_vertex_close(Point2D::new(10.0 + eps / 2.0, 10.0));
        let c = builder.select_vertex_close(Point2D::new(10.0 + eps * 4.0, 10.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(builder.vertices[a].index, None);
    }
}
