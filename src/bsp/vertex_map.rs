// src/bsp/vertex_map.rs
//! Uniform grid over vertex positions.
//!
//! A vertex is filed under every cell its epsilon box touches, so a lookup
//! only ever has to scan the single cell containing the query point.

use std::collections::HashMap;

use crate::bsp::Point2D;

#[derive(Debug, Clone)]
pub struct VertexMap {
    cell_size: f64,
    epsilon: f64,
    cells: HashMap<(i64, i64), Vec<(usize, Point2D)>>,
}

impl VertexMap {
    pub fn new(cell_size: f64, epsilon: f64) -> Self {
        VertexMap {
            cell_size,
            epsilon,
            cells: HashMap::new(),
        }
    }

    fn cell_coord(&self, v: f64) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    fn cell_of(&self, point: &Point2D) -> (i64, i64) {
        (self.cell_coord(point.x), self.cell_coord(point.y))
    }

    /// Vertex sitting exactly on `point`.
    pub fn find_exact(&self, point: &Point2D) -> Option<usize> {
        self.cells
            .get(&self.cell_of(point))?
            .iter()
            .find(|(_, p)| p.x == point.x && p.y == point.y)
            .map(|&(id, _)| id)
    }

    /// Vertex within epsilon of `point` on both axes.
    pub fn find_near(&self, point: &Point2D) -> Option<usize> {
        let eps = self.epsilon;
        self.cells
            .get(&self.cell_of(point))?
            .iter()
            .find(|(_, p)| (p.x - point.x).abs() < eps && (p.y - point.y).abs() < eps)
            .map(|&(id, _)| id)
    }

    pub fn insert(&mut self, id: usize, point: Point2D) {
        let eps = self.epsilon;
        let (x0, x1) = (self.cell_coord(point.x - eps), self.cell_coord(point.x + eps));
        let (y0, y1) = (self.cell_coord(point.y - eps), self.cell_coord(point.y + eps));
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                self.cells.entry((cx, cy)).or_default().push((id, point));
            }
        }
    }
}
