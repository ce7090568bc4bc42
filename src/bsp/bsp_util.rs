// src/bsp/bsp_util.rs
// Geometry and other helper functions specific to BSP.

use serde::{Deserialize, Serialize};

use crate::bsp::SegPosition;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }
}

/// Which side of a partition line a point lies on. The front is the right
/// hand side when looking along the line's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSide {
    Front,
    On,
    Back,
}

/// An infinite partition line through `(x, y)` heading along `(dx, dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DivLine {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

impl DivLine {
    pub fn new(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        DivLine { x, y, dx, dy }
    }

    pub fn from_points(start: Point2D, end: Point2D) -> Self {
        DivLine::new(start.x, start.y, end.x - start.x, end.y - start.y)
    }

    /// Same line, opposite direction.
    pub fn flipped(&self) -> Self {
        DivLine::new(self.x + self.dx, self.y + self.dy, -self.dx, -self.dy)
    }

    pub fn classify_point(&self, point: &Point2D) -> f64 {
        // Returns positive if point is on front side
        // Returns negative if point is on back side
        // Returns near zero if point is on the line
        (self.dy * (point.x - self.x)) - (self.dx * (point.y - self.y))
    }

    /// Side of `point`, treating anything within `epsilon` of the line as on it.
    pub fn point_side(&self, point: &Point2D, epsilon: f64) -> PointSide {
        let s = self.classify_point(point);
        let len2 = self.dx * self.dx + self.dy * self.dy;
        if s * s < epsilon * epsilon * len2 {
            PointSide::On
        } else if s > 0.0 {
            PointSide::Front
        } else {
            PointSide::Back
        }
    }

    /// Classifies the segment `a -> b`. A segment lying on the line goes to
    /// the front when it runs the same way as the line, otherwise to the back.
    pub fn classify_segment(
        &self,
        a: &Point2D,
        b: &Point2D,
        epsilon: f64,
    ) -> (SegPosition, [PointSide; 2]) {
        let sides = [self.point_side(a, epsilon), self.point_side(b, epsilon)];
        let position = match sides {
            [PointSide::On, PointSide::On] => {
                if (b.x - a.x) * self.dx + (b.y - a.y) * self.dy > 0.0 {
                    SegPosition::Front
                } else {
                    SegPosition::Back
                }
            }
            [PointSide::Front | PointSide::On, PointSide::Front | PointSide::On] => SegPosition::Front,
            [PointSide::Back | PointSide::On, PointSide::Back | PointSide::On] => SegPosition::Back,
            _ => SegPosition::Spanning,
        };
        (position, sides)
    }

    /// Fraction along `a -> b` where it meets this line. Zero if parallel.
    pub fn intercept(&self, a: &Point2D, b: &Point2D) -> f64 {
        let sdx = b.x - a.x;
        let sdy = b.y - a.y;
        let den = self.dy * sdx - self.dx * sdy;
        if den == 0.0 {
            return 0.0;
        }
        let num = (self.x - a.x) * self.dy + (a.y - self.y) * self.dx;
        num / den
    }

    /// Signed position of `point` projected on the line, scaled by the
    /// line's length. Only useful for ordering.
    pub fn distance_along(&self, point: &Point2D) -> f64 {
        (point.x - self.x) * self.dx + (point.y - self.y) * self.dy
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.dx == 0.0 || self.dy == 0.0
    }
}

/// Binary angle (BAM) of a direction: a full turn spans the whole `u32`
/// range, so differences wrap the way angles do.
pub fn point_to_angle(dx: f64, dy: f64) -> u32 {
    let turns = (dy.atan2(dx) / std::f64::consts::TAU).rem_euclid(1.0);
    (turns * 4_294_967_296.0) as u64 as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::new_empty()
    }
}

impl BoundingBox {
    pub fn new_empty() -> Self {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn combine(&mut self, other: &BoundingBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn test_front_is_right_hand_side() {
        let line = DivLine::new(0.0, 0.0, 1.0, 0.0);
        assert_eq!(line.point_side(&p(5.0, -1.0), 0.01), PointSide::Front);
        assert_eq!(line.point_side(&p(5.0, 1.0), 0.01), PointSide::Back);
        assert_eq!(line.point_side(&p(5.0, 0.001), 0.01), PointSide::On);
    }

    #[test]
    fn test_point_side_independent_of_direction_length() {
        let short = DivLine::new(0.0, 0.0, 0.5, 0.0);
        let long = DivLine::new(0.0, 0.0, 500.0, 0.0);
        let q = p(3.0, 0.005);
        assert_eq!(short.point_side(&q, 0.01), long.point_side(&q, 0.01));
    }

    #[test]
    fn test_classify_segment() {
        let line = DivLine::new(0.0, 0.0, 0.0, 1.0); // heading +y, front is +x
        let eps = 0.01;
        assert_eq!(line.classify_segment(&p(1.0, 0.0), &p(2.0, 5.0), eps).0, SegPosition::Front);
        assert_eq!(line.classify_segment(&p(-1.0, 0.0), &p(-2.0, 5.0), eps).0, SegPosition::Back);
        assert_eq!(line.classify_segment(&p(-1.0, 0.0), &p(1.0, 0.0), eps).0, SegPosition::Spanning);
        // Touching the line with one end does not make it span.
        assert_eq!(line.classify_segment(&p(0.0, 0.0), &p(1.0, 1.0), eps).0, SegPosition::Front);
        // Collinear segs use their direction.
        assert_eq!(line.classify_segment(&p(0.0, 2.0), &p(0.0, 4.0), eps).0, SegPosition::Front);
        assert_eq!(line.classify_segment(&p(0.0, 4.0), &p(0.0, 2.0), eps).0, SegPosition::Back);
    }

    #[test]
    fn test_intercept() {
        let line = DivLine::new(0.0, 0.0, 0.0, 10.0);
        assert_approx_eq!(line.intercept(&p(-2.0, 3.0), &p(6.0, 3.0)), 0.25);
        let parallel = DivLine::new(0.0, 0.0, 1.0, 0.0);
        assert_eq!(parallel.intercept(&p(0.0, 1.0), &p(5.0, 1.0)), 0.0);
    }

    #[test]
    fn test_flipped_swaps_sides() {
        let line = DivLine::new(0.0, 0.0, 4.0, 0.0);
        let flipped = line.flipped();
        let q = p(2.0, -3.0);
        assert_eq!(line.point_side(&q, 0.01), PointSide::Front);
        assert_eq!(flipped.point_side(&q, 0.01), PointSide::Back);
        assert_approx_eq!(flipped.x, 4.0);
    }

    #[test]
    fn test_point_to_angle_quadrants() {
        assert_eq!(point_to_angle(1.0, 0.0), 0);
        assert_eq!(point_to_angle(0.0, 1.0), 0x4000_0000);
        assert_eq!(point_to_angle(-1.0, 0.0), 0x8000_0000);
        assert_eq!(point_to_angle(0.0, -1.0), 0xC000_0000);
    }

    #[test]
    fn test_bounding_box() {
        let mut bbox = BoundingBox::new_empty();
        assert!(bbox.is_empty());
        bbox.expand_point(1.0, 2.0);
        bbox.expand_point(-3.0, 5.0);
        assert!(!bbox.is_empty());
        assert_eq!(bbox, BoundingBox::new(-3.0, 2.0, 1.0, 5.0));

        let mut other = BoundingBox::new(0.0, 0.0, 10.0, 1.0);
        other.combine(&bbox);
        assert_eq!(other, BoundingBox::new(-3.0, 0.0, 10.0, 5.0));
    }
}
