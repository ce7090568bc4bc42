// src/bsp/planes.rs
//! Groups collinear segs under one plane id so each distinct line is scored
//! once per splitter search.

use crate::bsp::bsp_util::{point_to_angle, DivLine, Point2D, PointSide};
use crate::bsp::builder::NodeBuilder;

const BUCKET_BITS: u32 = 12;
const BUCKETS: usize = 1 << BUCKET_BITS;

/// Planes hashed by direction (modulo a half turn).
#[derive(Debug, Clone)]
pub struct PlaneIndex {
    planes: Vec<DivLine>,
    buckets: Vec<Vec<usize>>,
    epsilon: f64,
}

impl PlaneIndex {
    pub fn new(epsilon: f64) -> Self {
        PlaneIndex {
            planes: Vec::new(),
            buckets: vec![Vec::new(); BUCKETS],
            epsilon,
        }
    }

    fn bucket_of(start: &Point2D, end: &Point2D) -> usize {
        let mut ang = point_to_angle(end.x - start.x, end.y - start.y);
        if ang >= 1 << 31 {
            ang = ang.wrapping_add(1 << 31);
        }
        (ang >> (31 - BUCKET_BITS)) as usize
    }

    /// Plane id for the seg `start -> end`, and whether the seg runs the same
    /// way as the plane. Registers a new plane when none matches.
    pub fn classify(&mut self, start: Point2D, end: Point2D) -> (usize, bool) {
        let bucket = Self::bucket_of(&start, &end);
        // Neighbouring buckets wrap: just below a half turn and just above
        // zero are the same orientation.
        let neighbours = [(bucket + BUCKETS - 1) % BUCKETS, bucket, (bucket + 1) % BUCKETS];
        for b in neighbours {
            for &plane_id in &self.buckets[b] {
                let plane = &self.planes[plane_id];
                if plane.point_side(&start, self.epsilon) == PointSide::On
                    && plane.point_side(&end, self.epsilon) == PointSide::On
                {
                    let along = (end.x - start.x) * plane.dx + (end.y - start.y) * plane.dy;
                    return (plane_id, along > 0.0);
                }
            }
        }

        let plane_id = self.planes.len();
        self.planes.push(DivLine::from_points(start, end));
        self.buckets[bucket].push(plane_id);
        (plane_id, true)
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn into_planes(self) -> Vec<DivLine> {
        self.planes
    }
}

impl NodeBuilder {
    /// Assigns every seg a plane id and chains all segs into one set.
    /// Returns the head of that set.
    pub(crate) fn group_seg_planes(&mut self) -> Option<usize> {
        let mut index = PlaneIndex::new(self.options.side_epsilon);
        let count = self.segs.len();
        for i in 0..count {
            let start = self.vertices[self.segs[i].v1].pos;
            let end = self.vertices[self.segs[i].v2].pos;
            let (plane, front) = index.classify(start, end);
            let seg = &mut self.segs[i];
            seg.plane = Some(plane);
            seg.plane_front = front;
            seg.next = if i + 1 < count { Some(i + 1) } else { None };
        }
        log::debug!("{} segs grouped into {} planes", count, index.len());
        self.planes = index.into_planes();
        (count > 0).then_some(0)
    }
}
