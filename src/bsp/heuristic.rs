// src/bsp/heuristic.rs
//! Splitter scoring and selection.

use log::trace;

use crate::bsp::builder::NodeBuilder;
use crate::bsp::bsp_util::{DivLine, PointSide};
use crate::bsp::{SegPosition, SCORE_BASE};

/// Outcome of one pass over a set looking for a splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    /// Best candidate seg; the partition runs along its plane.
    Found(usize),
    /// No candidate divides the set.
    Convex,
    /// No candidate divides the set and at least one was refused outright.
    Rejected,
}

impl Selection {
    pub(crate) fn is_found(&self) -> bool {
        matches!(self, Selection::Found(_))
    }
}

impl NodeBuilder {
    /// Position of `seg` relative to `node`. Segs on `plane` count as lying
    /// on the line, and the hack seg is always behind it.
    pub(crate) fn classify_seg(
        &self,
        seg: usize,
        node: &DivLine,
        plane: Option<usize>,
    ) -> (SegPosition, [PointSide; 2]) {
        if self.hack_seg == Some(seg) {
            return (SegPosition::Back, [PointSide::On, PointSide::On]);
        }
        let (a, b) = self.seg_ends(seg);
        if plane.is_some() && self.segs[seg].plane == plane {
            let along = (b.x - a.x) * node.dx + (b.y - a.y) * node.dy;
            let position = if along > 0.0 { SegPosition::Front } else { SegPosition::Back };
            return (position, [PointSide::On, PointSide::On]);
        }
        node.classify_segment(&a, &b, self.options.side_epsilon)
    }

    /// Scores `node` as a splitter for `set`. Zero means everything stays on
    /// one side, negative means the splitter must not be used.
    pub(crate) fn heuristic(
        &self,
        node: &DivLine,
        plane: Option<usize>,
        set: usize,
        honor_no_split: bool,
    ) -> i64 {
        let eps = self.options.vertex_epsilon;
        let mut score = SCORE_BASE;
        let mut counts = [0i64; 2];
        let mut real_segs = [0usize; 2];
        let mut special_segs = [0usize; 2];
        let mut touched: Vec<u32> = Vec::new();
        let mut colinear: Vec<u32> = Vec::new();

        for i in self.set_iter(Some(set)) {
            let seg = &self.segs[i];
            let (position, sides) = self.classify_seg(i, node, plane);

            let side = match position {
                SegPosition::Front => 0,
                SegPosition::Back => 1,
                SegPosition::Spanning => {
                    if seg.loop_num != 0 && honor_no_split {
                        trace!("splitter cuts container seg {}", i);
                        return -1;
                    }

                    let (a, b) = self.seg_ends(i);
                    let frac = node.intercept(&a, &b);
                    let x = a.x + frac * (b.x - a.x);
                    let y = a.y + frac * (b.y - a.y);
                    if ((x - a.x).abs() < eps && (y - a.y).abs() < eps)
                        || ((x - b.x).abs() < eps && (y - b.y).abs() < eps)
                    {
                        trace!("splitter lands on an endpoint of seg {}", i);
                        return -1;
                    }
                    if !(0.001..=0.999).contains(&frac) {
                        let near = if frac > 0.999 { 1.0 - frac } else { frac };
                        let penalty = (1.0 / near) as i64;
                        score = (score - penalty).max(1);
                    }

                    counts[0] += 1;
                    counts[1] += 1;
                    if !seg.is_miniseg() {
                        real_segs[0] += 1;
                        real_segs[1] += 1;
                    }
                    continue;
                }
            };

            if seg.loop_num != 0
                && honor_no_split
                && (sides[0] == PointSide::On || sides[1] == PointSide::On)
            {
                let list = if sides[0] == PointSide::On && sides[1] == PointSide::On {
                    &mut colinear
                } else {
                    &mut touched
                };
                if !list.contains(&seg.loop_num) {
                    list.push(seg.loop_num);
                }
            }

            counts[side] += 1;
            if seg.is_miniseg() {
                score += self.options.split_cost / 4;
            } else {
                real_segs[side] += 1;
                if seg.is_special() {
                    special_segs[side] += 1;
                }
                score += self.options.split_cost;
            }
        }

        if counts[0] == 0 || counts[1] == 0 {
            return 0;
        }

        // Each side needs a real seg to tell which sector it belongs to.
        if real_segs[0] == 0 || real_segs[1] == 0 {
            return -1;
        }

        if honor_no_split && (special_segs[0] == real_segs[0] || special_segs[1] == real_segs[1]) {
            return -1;
        }

        // Touching a container's vertex is only fine while running along
        // one of its edges.
        if touched.iter().any(|l| !colinear.contains(l)) {
            return -1;
        }

        if node.is_axis_aligned() {
            score += self.options.aa_preference;
        }

        score + (counts[0] + counts[1]) - (counts[0] - counts[1]).abs()
    }

    /// Scores one candidate per plane, sampling every `step`th seg.
    pub(crate) fn select_splitter(&mut self, set: usize, step: usize, honor_no_split: bool) -> Selection {
        let mut checked = vec![false; self.planes.len()];
        let mut best_value = 0;
        let mut best_seg = None;
        let mut rejected = false;
        let mut step_left: i64 = 0;

        let members: Vec<usize> = self.set_iter(Some(set)).collect();
        for seg in members {
            step_left -= 1;
            if step_left > 0 {
                continue;
            }
            let plane = self.segs[seg].plane;
            if let Some(p) = plane {
                if checked[p] {
                    continue;
                }
                checked[p] = true;
            }

            step_left = step as i64;
            let node = self.node_from_seg(seg);
            let value = self.heuristic(&node, plane, set, honor_no_split);
            trace!("seg {} scores {}", seg, value);

            if value > best_value {
                best_value = value;
                best_seg = Some(seg);
            } else if value < 0 {
                rejected = true;
            }
        }

        match best_seg {
            Some(seg) => Selection::Found(seg),
            None if rejected => Selection::Rejected,
            None => Selection::Convex,
        }
    }
}
