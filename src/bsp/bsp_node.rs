//! src/bsp/bsp_node.rs

use serde::{Deserialize, Serialize};

use crate::bsp::{BoundingBox, DivLine};

/// Reference to one side of a node: another node or a finished subsector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeChild {
    Node(usize),
    Subsector(usize),
}

/// An internal node of the BSP tree. Index 0 of `bbox` and `children` is the
/// front (right) side of `partition`, index 1 the back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BspNode {
    pub partition: DivLine,
    pub bbox: [BoundingBox; 2],
    pub children: [NodeChild; 2],
}

impl BspNode {
    pub fn new(partition: DivLine, bbox: [BoundingBox; 2], children: [NodeChild; 2]) -> Self {
        BspNode {
            partition,
            bbox,
            children,
        }
    }

    pub fn front(&self) -> NodeChild {
        self.children[0]
    }

    pub fn back(&self) -> NodeChild {
        self.children[1]
    }

    /// Box covering both children.
    pub fn bounds(&self) -> BoundingBox {
        let mut bounds = self.bbox[0];
        bounds.combine(&self.bbox[1]);
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_and_bounds() {
        let node = BspNode::new(
            DivLine::new(10.0, 0.0, 0.0, 10.0),
            [
                BoundingBox::new(10.0, 0.0, 20.0, 10.0),
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            ],
            [NodeChild::Subsector(0), NodeChild::Node(3)],
        );
        assert_eq!(node.front(), NodeChild::Subsector(0));
        assert_eq!(node.back(), NodeChild::Node(3));
        assert_eq!(node.bounds(), BoundingBox::new(0.0, 0.0, 20.0, 10.0));
    }
}
