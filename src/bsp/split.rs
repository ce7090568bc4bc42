// src/bsp/split.rs
//! Dividing a set of segs along a partition line.

use log::{trace, warn};

use crate::bsp::builder::{NodeBuilder, SplitSharer};
use crate::bsp::bsp_util::{DivLine, Point2D, PointSide};
use crate::bsp::events::Event;
use crate::bsp::SegPosition;

/// The two sets produced by one split.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SplitResult {
    pub front: Option<usize>,
    pub back: Option<usize>,
    pub front_count: usize,
    pub back_count: usize,
}

impl SplitResult {
    pub(crate) fn push(&mut self, builder: &mut NodeBuilder, side: usize, seg: usize) {
        if side == 0 {
            builder.segs[seg].next = self.front;
            self.front = Some(seg);
            self.front_count += 1;
        } else {
            builder.segs[seg].next = self.back;
            self.back = Some(seg);
            self.back_count += 1;
        }
    }

    fn recount(&mut self, builder: &NodeBuilder) {
        self.front_count = builder.set_iter(self.front).count();
        self.back_count = builder.set_iter(self.back).count();
    }
}

impl NodeBuilder {
    /// Distributes `set` to both sides of `node`, cutting the segs that
    /// cross it. `splitter` is the seg the partition was taken from.
    pub(crate) fn split_segs(
        &mut self,
        set: usize,
        node: &DivLine,
        splitter: usize,
        plane: Option<usize>,
    ) -> SplitResult {
        let gl = self.options.gl_nodes;
        let mut out = SplitResult::default();
        self.events.clear();
        self.split_sharers.clear();

        let mut cur = Some(set);
        while let Some(i) = cur {
            let next = self.segs[i].next;
            let hack = self.hack_seg == Some(i);
            let (position, sides) = self.classify_seg(i, node, plane);
            if hack {
                self.hack_seg = None;
            }

            let placed = match position {
                SegPosition::Front => {
                    out.push(self, 0, i);
                    true
                }
                SegPosition::Back => {
                    out.push(self, 1, i);
                    true
                }
                SegPosition::Spanning => self.cut_seg(i, node, sides, &mut out),
            };

            if gl && placed {
                let (v1, v2) = (self.segs[i].v1, self.segs[i].v2);
                if sides[0] == PointSide::On {
                    let d1 = self.add_intersection(node, v1);
                    if sides[1] == PointSide::On {
                        let d2 = self.add_intersection(node, v2);
                        self.split_sharers.push(SplitSharer {
                            distance: d1,
                            seg: i,
                            forward: d2 > d1,
                        });
                    }
                } else if sides[1] == PointSide::On {
                    self.add_intersection(node, v2);
                }
            }

            if hack && gl {
                self.close_hack_seg(i, plane, &mut out);
            }
            cur = next;
        }
        self.hack_mate = None;

        if gl {
            self.fix_split_sharers(node);
            self.add_minisegs(node, plane, &mut out);
            // Sharer pieces are spliced in behind their originals without
            // going through push.
            out.recount(self);
        }
        trace!(
            "split at seg {}: {} front, {} back, {} events",
            splitter,
            out.front_count,
            out.back_count,
            self.events.len()
        );
        out
    }

    /// Cuts a spanning seg (and its partner) where it meets `node`. Returns
    /// true when the seg was placed whole instead, in which case its
    /// endpoints may still need recording as events.
    fn cut_seg(&mut self, seg: usize, node: &DivLine, sides: [PointSide; 2], out: &mut SplitResult) -> bool {
        let (a, b) = self.seg_ends(seg);
        let frac = node.intercept(&a, &b);
        let point = Point2D::new(a.x + frac * (b.x - a.x), a.y + frac * (b.y - a.y));
        let vert = self.select_vertex_close(point);

        if vert == self.segs[seg].v1 || vert == self.segs[seg].v2 {
            warn!(
                "split of seg {} at ({}, {}) collapsed onto an endpoint",
                seg, point.x, point.y
            );
            self.stats.collapsed_splits += 1;
            let side = if out.front_count <= out.back_count { 0 } else { 1 };
            out.push(self, side, seg);
            return true;
        }

        let front = self.split_seg(seg, vert, sides[0] == PointSide::Back);
        out.push(self, 0, front);
        out.push(self, 1, seg);

        // The partner's new piece joins whichever set holds the partner,
        // right behind it. The partner has not been placed yet, so both
        // pieces are counted when this split reaches them.
        if let Some(partner1) = self.segs[seg].partner {
            let partner2 = self.split_seg(partner1, vert, sides[1] == PointSide::Back);
            self.segs[partner1].next = Some(partner2);
            self.segs[partner2].partner = Some(front);
            self.segs[front].partner = Some(partner2);
        }
        self.stats.splits += 1;

        if self.options.gl_nodes {
            self.add_intersection(node, vert);
        }
        false
    }

    /// Cuts `seg` at `vert`. The original seg keeps the half behind the
    /// splitter and the returned new seg holds the front half.
    pub(crate) fn split_seg(&mut self, seg: usize, vert: usize, v1_in_back: bool) -> usize {
        let new_id = self.segs.len();
        let mut new_seg = self.segs[seg].clone();
        new_seg.stored = None;

        if v1_in_back {
            let old_v2 = self.segs[seg].v2;
            new_seg.v1 = vert;
            self.segs[seg].v2 = vert;
            self.vertices[old_v2].ends.retain(|&s| s != seg);
            self.vertices[old_v2].ends.push(new_id);
            self.vertices[vert].starts.push(new_id);
            self.vertices[vert].ends.push(seg);
        } else {
            let old_v1 = self.segs[seg].v1;
            new_seg.v2 = vert;
            self.segs[seg].v1 = vert;
            self.vertices[old_v1].starts.retain(|&s| s != seg);
            self.vertices[old_v1].starts.push(new_id);
            self.vertices[vert].ends.push(new_id);
            self.vertices[vert].starts.push(seg);
        }

        self.segs.push(new_seg);
        new_id
    }

    /// Records `vertex` as touched by the splitter. Returns its position
    /// along it.
    pub(crate) fn add_intersection(&mut self, node: &DivLine, vertex: usize) -> f64 {
        let dist = node.distance_along(&self.vertices[vertex].pos);
        self.events.insert(dist, vertex);
        dist
    }

    fn next_event(&self, distance: f64, forward: bool) -> Option<Event> {
        if forward {
            self.events.successor(distance)
        } else {
            self.events.predecessor(distance)
        }
    }

    /// Cuts segs lying along the splitter at every event strictly between
    /// their endpoints, so each piece spans exactly two neighbouring events.
    fn fix_split_sharers(&mut self, node: &DivLine) {
        let sharers = std::mem::take(&mut self.split_sharers);
        for sharer in &sharers {
            let forward = sharer.forward;
            let mut seg = sharer.seg;
            let v2 = self.segs[seg].v2;
            let end = node.distance_along(&self.vertices[v2].pos);
            let Some(start) = self.events.find(sharer.distance) else {
                continue;
            };

            let mut event = self.next_event(start.distance, forward);
            let mut next = event.and_then(|e| self.next_event(e.distance, forward));
            while let (Some(ev), Some(after)) = (event, next) {
                let past_end = if forward { ev.distance >= end } else { ev.distance <= end };
                if ev.vertex == v2 || past_end {
                    break;
                }

                let new_seg = self.split_seg(seg, ev.vertex, true);
                self.segs[seg].next = Some(new_seg);

                if let Some(partner) = self.segs[seg].partner {
                    let end_partner = self.split_seg(partner, ev.vertex, true);
                    self.segs[partner].next = Some(end_partner);
                    self.segs[seg].partner = Some(end_partner);
                    self.segs[end_partner].partner = Some(seg);
                    self.segs[partner].partner = Some(new_seg);
                    self.segs[new_seg].partner = Some(partner);
                }
                self.stats.splits += 1;

                seg = new_seg;
                event = Some(after);
                next = self.next_event(after.distance, forward);
            }
        }
    }

    /// Gives the forced-back seg its own closing miniseg behind the
    /// splitter and a partner in front of it.
    fn close_hack_seg(&mut self, seg: usize, plane: Option<usize>, out: &mut SplitResult) {
        let (v1, v2) = (self.segs[seg].v1, self.segs[seg].v2);
        let new_back = self.add_miniseg(v2, v1, None, plane);

        let mate = self
            .hack_mate
            .filter(|&m| self.segs[m].partner.is_none());
        let new_front = match mate {
            Some(m) => {
                self.segs[m].partner = Some(new_back);
                self.segs[new_back].partner = Some(m);
                m
            }
            None => {
                let f = self.add_miniseg(v1, v2, Some(new_back), plane);
                out.push(self, 0, f);
                f
            }
        };

        let sector = self.segs[seg].front_sector;
        for s in [new_back, new_front] {
            self.segs[s].front_sector = sector;
            self.segs[s].back_sector = sector;
        }
        out.push(self, 1, new_back);
    }
}
