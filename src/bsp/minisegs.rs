// src/bsp/minisegs.rs
//! Closing subsectors along a splitter with minisegs (GL nodes only).

use log::warn;

use crate::bsp::builder::{NodeBuilder, PrivSeg};
use crate::bsp::bsp_util::{point_to_angle, DivLine, PointSide};
use crate::bsp::events::Event;
use crate::bsp::split::SplitResult;
use crate::bsp::ANGLE_EPSILON;

impl NodeBuilder {
    /// Adds a front/back miniseg pair between each two neighbouring events
    /// where both sides of the splitter have an open loop to close.
    pub(crate) fn add_minisegs(&mut self, node: &DivLine, plane: Option<usize>, out: &mut SplitResult) {
        let events: Vec<Event> = self.events.iter().collect();
        for pair in events.windows(2) {
            let (prev, event) = (pair[0].vertex, pair[1].vertex);

            let Some(fseg1) = self.check_loop_start(node.dx, node.dy, prev, event) else {
                continue;
            };
            let Some(bseg1) = self.check_loop_start(-node.dx, -node.dy, event, prev) else {
                continue;
            };
            if self.check_loop_end(node.dx, node.dy, event).is_none()
                || self.check_loop_end(-node.dx, -node.dy, prev).is_none()
            {
                continue;
            }

            let front = self.add_miniseg(prev, event, None, plane);
            out.push(self, 0, front);
            let back = self.add_miniseg(event, prev, Some(front), plane);
            out.push(self, 1, back);

            let fsector = self.segs[fseg1].front_sector;
            let bsector = self.segs[bseg1].front_sector;
            self.segs[front].front_sector = fsector;
            self.segs[front].back_sector = bsector;
            self.segs[back].front_sector = bsector;
            self.segs[back].back_sector = fsector;

            if fsector != bsector
                && fsector != self.segs[fseg1].back_sector
                && bsector != self.segs[bseg1].back_sector
            {
                let p = self.vertex_pos(prev);
                let e = self.vertex_pos(event);
                warn!(
                    "sectors {:?} and {:?} meet across a miniseg at ({}, {})-({}, {})",
                    fsector, bsector, p.x, p.y, e.x, e.y
                );
            }
        }
    }

    /// The seg ending at `vertex` that makes the tightest turn onto the
    /// splitter heading `(dx, dy)`, provided no seg already leaves `vertex`
    /// for `vertex2` or turns even tighter.
    pub(crate) fn check_loop_start(&self, dx: f64, dy: f64, vertex: usize, vertex2: usize) -> Option<usize> {
        let v = self.vertex_pos(vertex);
        let split_angle = point_to_angle(dx, dy);
        let line = DivLine::new(v.x, v.y, dx, dy);
        let eps = self.options.side_epsilon;

        let mut best_angle = u32::MAX;
        let mut best = None;
        for &seg in &self.vertices[vertex].ends {
            let p = self.vertex_pos(self.segs[seg].v1);
            let diff = split_angle.wrapping_sub(point_to_angle(p.x - v.x, p.y - v.y));
            if diff < ANGLE_EPSILON && line.point_side(&p, eps) == PointSide::On {
                // Lies along the splitter.
                continue;
            }
            if diff <= best_angle {
                best_angle = diff;
                best = Some(seg);
            }
        }
        let best = best?;

        for &seg in &self.vertices[vertex].starts {
            let s = &self.segs[seg];
            if s.v2 == vertex2 {
                return None;
            }
            let p = self.vertex_pos(s.v2);
            let diff = split_angle.wrapping_sub(point_to_angle(p.x - v.x, p.y - v.y));
            if diff < best_angle && s.partner != Some(best) {
                return None;
            }
        }
        Some(best)
    }

    /// Mirror of [`check_loop_start`](Self::check_loop_start) for the seg
    /// leaving `vertex`.
    pub(crate) fn check_loop_end(&self, dx: f64, dy: f64, vertex: usize) -> Option<usize> {
        let v = self.vertex_pos(vertex);
        let split_angle = point_to_angle(dx, dy).wrapping_add(1 << 31);
        let line = DivLine::new(v.x, v.y, dx, dy);
        let eps = self.options.side_epsilon;

        let mut best_angle = u32::MAX;
        let mut best = None;
        for &seg in &self.vertices[vertex].starts {
            let p = self.vertex_pos(self.segs[seg].v2);
            let diff = point_to_angle(p.x - v.x, p.y - v.y).wrapping_sub(split_angle);
            if diff < ANGLE_EPSILON && line.point_side(&p, eps) == PointSide::On {
                continue;
            }
            if diff <= best_angle {
                best_angle = diff;
                best = Some(seg);
            }
        }
        let best = best?;

        for &seg in &self.vertices[vertex].ends {
            let s = &self.segs[seg];
            let p = self.vertex_pos(s.v1);
            let diff = point_to_angle(p.x - v.x, p.y - v.y).wrapping_sub(split_angle);
            if diff < best_angle && s.partner != Some(best) {
                return None;
            }
        }
        Some(best)
    }

    /// Pushes a miniseg on `plane`; links it with `partner` when given.
    pub(crate) fn add_miniseg(&mut self, v1: usize, v2: usize, partner: Option<usize>, plane: Option<usize>) -> usize {
        let a = self.vertex_pos(v1);
        let b = self.vertex_pos(v2);
        let plane_front = plane.map_or(true, |p| {
            let line = &self.planes[p];
            (b.x - a.x) * line.dx + (b.y - a.y) * line.dy > 0.0
        });

        let id = self.add_seg(PrivSeg {
            plane,
            plane_front,
            partner,
            ..PrivSeg::miniseg(v1, v2)
        });
        if let Some(p) = partner {
            self.segs[p].partner = Some(id);
        }
        self.stats.minisegs += 1;
        id
    }
}
