//! BSP tree node implementation.

use std::collections::BTreeSet;
use std::fmt;

use crate::{classify_point, LineSide, Point, PointSides};

/// Stable handle of a region stored in a [`BspTree`](super::BspTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub(crate) usize);

impl RegionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Handle of a node in a [`BspTree`](super::BspTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One side of a partition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The half of a node on one side of its partition line.
///
/// A half either continues into a child node or is a leaf cell holding the
/// regions that end there (its neighbor set). A half never does both.
#[derive(Debug, Clone, Default)]
pub struct NodeHalf {
    child: Option<NodeId>,
    neighbors: BTreeSet<RegionId>,
}

impl NodeHalf {
    #[inline]
    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    /// Regions stored in this leaf cell.
    #[inline]
    pub fn neighbors(&self) -> &BTreeSet<RegionId> {
        &self.neighbors
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child.is_none()
    }
}

/// A node in the BSP tree.
///
/// The partition line runs from `line_a` to `line_b` and is taken from an
/// edge of a region when the node is created; it never changes afterwards.
/// Points left of the directed line belong to the left half.
#[derive(Debug, Clone)]
pub struct BspNode {
    line_a: Point,
    line_b: Point,
    left: NodeHalf,
    right: NodeHalf,
}

impl BspNode {
    /// Creates a node with two empty leaf halves.
    pub fn new(line_a: Point, line_b: Point) -> Self {
        debug_assert!(!line_a.approx_eq(&line_b), "Partition line needs two distinct points");
        Self {
            line_a,
            line_b,
            left: NodeHalf::default(),
            right: NodeHalf::default(),
        }
    }

    /// Returns the partition line as `(a, b)`.
    #[inline]
    pub fn line(&self) -> (&Point, &Point) {
        (&self.line_a, &self.line_b)
    }

    #[inline]
    pub fn half(&self, side: Side) -> &NodeHalf {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    #[inline]
    pub(crate) fn half_mut(&mut self, side: Side) -> &mut NodeHalf {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    #[inline]
    pub fn left(&self) -> &NodeHalf {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &NodeHalf {
        &self.right
    }

    /// Checks if this node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left.is_leaf() && self.right.is_leaf()
    }

    /// Buckets `points` against the partition line.
    #[inline]
    pub fn classify<'a>(&self, points: impl IntoIterator<Item = &'a Point>) -> PointSides {
        PointSides::classify(&self.line_a, &self.line_b, points)
    }

    /// Halves a point belongs to: one, or both when it lies on the line.
    pub fn sides_of(&self, point: &Point) -> &'static [Side] {
        match classify_point(point, &self.line_a, &self.line_b) {
            LineSide::Left => &[Side::Left],
            LineSide::Right => &[Side::Right],
            LineSide::On => &[Side::Left, Side::Right],
        }
    }

    pub(crate) fn set_child(&mut self, side: Side, child: NodeId) {
        let half = self.half_mut(side);
        debug_assert!(half.neighbors.is_empty(), "Leaf must be emptied before it gets a child");
        half.child = Some(child);
    }

    pub(crate) fn add_neighbor(&mut self, side: Side, region: RegionId) {
        self.half_mut(side).neighbors.insert(region);
    }

    pub(crate) fn remove_neighbor(&mut self, side: Side, region: RegionId) -> bool {
        self.half_mut(side).neighbors.remove(&region)
    }

    pub(crate) fn take_neighbors(&mut self, side: Side) -> BTreeSet<RegionId> {
        std::mem::take(&mut self.half_mut(side).neighbors)
    }

    /// Number of regions stored directly at this node.
    pub fn neighbor_count(&self) -> usize {
        self.left.neighbors.len() + self.right.neighbors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal() -> BspNode {
        BspNode::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0))
    }

    #[test]
    fn new_node_is_empty_leaf() {
        let node = horizontal();
        assert!(node.is_leaf());
        assert_eq!(node.neighbor_count(), 0);
        assert!(node.left().neighbors().is_empty());
    }

    #[test]
    fn set_child_updates_leaf_status() {
        let mut node = horizontal();
        node.set_child(Side::Right, NodeId(3));
        assert!(!node.is_leaf());
        assert!(node.left().is_leaf());
        assert_eq!(node.right().child(), Some(NodeId(3)));
    }

    #[test]
    fn neighbor_bookkeeping() {
        let mut node = horizontal();
        node.add_neighbor(Side::Left, RegionId(1));
        node.add_neighbor(Side::Left, RegionId(2));
        node.add_neighbor(Side::Right, RegionId(5));
        assert_eq!(node.neighbor_count(), 3);

        assert!(node.remove_neighbor(Side::Left, RegionId(1)));
        assert!(!node.remove_neighbor(Side::Left, RegionId(1)));

        let taken = node.take_neighbors(Side::Left);
        assert_eq!(taken.into_iter().collect::<Vec<_>>(), vec![RegionId(2)]);
        assert!(node.half(Side::Left).neighbors().is_empty());
        assert_eq!(node.half(Side::Right).neighbors().len(), 1);
    }

    #[test]
    fn point_sides() {
        let node = horizontal();
        assert_eq!(node.sides_of(&Point::new(0.5, 2.0)), &[Side::Left]);
        assert_eq!(node.sides_of(&Point::new(0.5, -2.0)), &[Side::Right]);
        assert_eq!(node.sides_of(&Point::new(9.0, 0.0)), &[Side::Left, Side::Right]);
        assert_eq!(Side::Left.opposite(), Side::Right);
    }

    #[test]
    fn region_id_display() {
        assert_eq!(RegionId(12).to_string(), "r12");
        assert_eq!(RegionId(12).index(), 12);
    }
}
