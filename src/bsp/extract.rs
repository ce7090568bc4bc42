// src/bsp/extract.rs
//! Flattens the builder's arenas into a [`BspLevel`].

use log::debug;

use crate::bsp::bsp_level::{BspLevel, Seg, SegmentSide, Subsector};
use crate::bsp::bsp_node::NodeChild;
use crate::bsp::builder::NodeBuilder;
use crate::bsp::bsp_util::{point_to_angle, Point2D};

/// Output arrays under construction.
struct Output {
    vertices: Vec<Point2D>,
    /// Output index of every builder vertex.
    vertex_index: Vec<usize>,
    segs: Vec<Seg>,
    /// Builder-side partner of each output seg, resolved at the end.
    partners: Vec<Option<usize>>,
}

impl NodeBuilder {
    pub(crate) fn extract(mut self, root: NodeChild) -> BspLevel {
        let mut out = self.output_vertices();
        let mut subsectors = Vec::with_capacity(self.subsector_sets.len());

        for ss in 0..self.subsector_sets.len() {
            let mut members: Vec<usize> = self.set_iter(self.subsector_sets[ss].head).collect();
            members.sort_by_key(|&s| self.seg_sort_key(s));
            let sector = self.subsector_sector(&members);

            let first_seg = out.segs.len();
            if self.options.gl_nodes && !members.is_empty() {
                self.close_subsector(&members, sector, &mut out);
            } else {
                for &seg in &members {
                    self.push_seg(seg, &mut out);
                }
            }

            subsectors.push(Subsector {
                first_seg,
                num_segs: out.segs.len() - first_seg,
                sector,
                bbox: self.subsector_sets[ss].bbox,
            });
        }

        for (i, partner) in out.partners.iter().enumerate() {
            out.segs[i].partner = partner.and_then(|p| self.segs[p].stored);
        }

        self.stats.planes = self.planes.len();
        debug!(
            "extracted {} vertices, {} segs, {} subsectors, {} nodes",
            out.vertices.len(),
            out.segs.len(),
            subsectors.len(),
            self.nodes.len()
        );

        BspLevel {
            vertices: out.vertices,
            segs: out.segs,
            subsectors,
            nodes: self.nodes,
            root,
            stats: self.stats,
        }
    }

    /// Input vertices keep their indices; synthesized ones follow.
    fn output_vertices(&self) -> Output {
        let mut vertices = self.input_vertices.clone();
        let mut vertex_index = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices {
            match v.index {
                Some(i) => vertex_index.push(i),
                None => {
                    vertex_index.push(vertices.len());
                    vertices.push(v.pos);
                }
            }
        }
        Output {
            vertices,
            vertex_index,
            segs: Vec::new(),
            partners: Vec::new(),
        }
    }

    /// Two-sector lines first, then same-sector lines, then minisegs; by
    /// linedef within each group.
    fn seg_sort_key(&self, seg: usize) -> (u8, usize) {
        let s = &self.segs[seg];
        match s.linedef {
            None => (2, 0),
            Some(line) if s.is_special() => (1, line),
            Some(line) => (0, line),
        }
    }

    fn subsector_sector(&self, members: &[usize]) -> Option<usize> {
        let real = || members.iter().map(|&s| &self.segs[s]).filter(|s| !s.is_miniseg());
        real()
            .find(|s| !s.is_special())
            .or_else(|| real().next())
            .or_else(|| members.first().map(|&s| &self.segs[s]))
            .and_then(|s| s.front_sector)
    }

    fn push_seg(&mut self, seg: usize, out: &mut Output) -> usize {
        let s = &self.segs[seg];
        let a = self.vertices[s.v1].pos;
        let b = self.vertices[s.v2].pos;
        let offset = match s.linedef {
            Some(line) => {
                let (start, end) = self.line_ends[line];
                let origin = if s.side == SegmentSide::Front { start } else { end };
                (a.x - origin.x).hypot(a.y - origin.y)
            }
            None => 0.0,
        };

        let id = out.segs.len();
        out.segs.push(Seg {
            v1: out.vertex_index[s.v1],
            v2: out.vertex_index[s.v2],
            linedef: s.linedef,
            sidedef: s.sidedef,
            side: s.side,
            front_sector: s.front_sector,
            back_sector: s.back_sector,
            partner: None,
            angle: point_to_angle(b.x - a.x, b.y - a.y),
            offset,
        });
        out.partners.push(s.partner);
        self.segs[seg].stored = Some(id);
        id
    }

    /// Fills the gap from builder vertex `v1` to `v2` with an unpartnered
    /// miniseg.
    fn push_connecting_seg(&mut self, v1: usize, v2: usize, sector: Option<usize>, out: &mut Output) {
        let a = self.vertices[v1].pos;
        let b = self.vertices[v2].pos;
        out.segs.push(Seg {
            v1: out.vertex_index[v1],
            v2: out.vertex_index[v2],
            linedef: None,
            sidedef: None,
            side: SegmentSide::Front,
            front_sector: sector,
            back_sector: sector,
            partner: None,
            angle: point_to_angle(b.x - a.x, b.y - a.y),
            offset: 0.0,
        });
        out.partners.push(None);
        self.stats.minisegs += 1;
    }

    /// Outputs `seg`, bridging from `prev` first if the two do not touch.
    fn push_linked(&mut self, prev: usize, seg: usize, sector: Option<usize>, out: &mut Output) {
        let (gap_start, gap_end) = (self.segs[prev].v2, self.segs[seg].v1);
        if gap_start != gap_end {
            self.push_connecting_seg(gap_start, gap_end, sector, out);
        }
        self.push_seg(seg, out);
    }

    /// Outputs the subsector's segs as one closed loop.
    fn close_subsector(&mut self, members: &[usize], sector: Option<usize>, out: &mut Output) {
        let first = members[0];
        let first_plane = self.segs[first].plane;
        let mut sum = (0.0, 0.0);
        let mut diff_planes = false;
        for &seg in members {
            let (a, b) = self.seg_ends(seg);
            sum.0 += a.x + b.x;
            sum.1 += a.y + b.y;
            diff_planes |= self.segs[seg].plane != first_plane;
        }
        let n = members.len() as f64;
        let mid = Point2D::new(sum.0 / n / 2.0, sum.1 / n / 2.0);

        let mut used = vec![false; members.len()];
        used[0] = true;
        self.push_seg(first, out);
        let first_vert = self.segs[first].v1;
        let mut prev = first;

        if diff_planes {
            // Clockwise around the centroid, by the angle to each seg's start.
            let angle_from_mid = |b: &NodeBuilder, seg: usize| {
                let p = b.vertex_pos(b.segs[seg].v1);
                point_to_angle(p.x - mid.x, p.y - mid.y)
            };
            let mut prev_angle = angle_from_mid(self, first);
            for _ in 1..members.len() {
                let mut best: Option<(usize, u32)> = None;
                for (j, &seg) in members.iter().enumerate() {
                    if used[j] {
                        continue;
                    }
                    let ang = angle_from_mid(self, seg);
                    if self.segs[seg].v1 == self.segs[prev].v2 {
                        best = Some((j, ang));
                        break;
                    }
                    let diff = prev_angle.wrapping_sub(ang);
                    let better = match best {
                        None => true,
                        Some((_, best_ang)) => {
                            let best_diff = prev_angle.wrapping_sub(best_ang);
                            (diff == 0, diff) < (best_diff == 0, best_diff)
                        }
                    };
                    if better {
                        best = Some((j, ang));
                    }
                }
                let Some((j, ang)) = best else { break };
                used[j] = true;
                self.push_linked(prev, members[j], sector, out);
                prev = members[j];
                prev_angle = ang;
            }
        } else {
            // Every seg lies on one line. Walk out along the first seg's
            // direction, back along the reversed segs, then out again.
            let (origin, end) = self.seg_ends(first);
            let (dx, dy) = (end.x - origin.x, end.y - origin.y);
            let dot = |b: &NodeBuilder, seg: usize| {
                let p = b.vertex_pos(b.segs[seg].v1);
                (p.x - origin.x) * dx + (p.y - origin.y) * dy
            };
            let runs_forward = |b: &NodeBuilder, seg: usize| {
                let (p, q) = b.seg_ends(seg);
                (q.x - p.x) * dx + (q.y - p.y) * dy > 0.0
            };

            for stage in 0..3 {
                let this: &NodeBuilder = self;
                let mut picks: Vec<(usize, f64)> = members
                    .iter()
                    .enumerate()
                    .filter(|&(j, &seg)| {
                        !used[j]
                            && match stage {
                                0 => runs_forward(this, seg) && dot(this, seg) > 0.0,
                                1 => !runs_forward(this, seg),
                                _ => runs_forward(this, seg),
                            }
                    })
                    .map(|(j, &seg)| (j, dot(this, seg)))
                    .collect();
                picks.sort_by(|a, b| {
                    let order = a.1.total_cmp(&b.1);
                    if stage == 1 {
                        order.reverse()
                    } else {
                        order
                    }
                });
                for (j, _) in picks {
                    used[j] = true;
                    self.push_linked(prev, members[j], sector, out);
                    prev = members[j];
                }
            }
        }

        let last = self.segs[prev].v2;
        if last != first_vert {
            self.push_connecting_seg(last, first_vert, sector, out);
        }
    }
}
