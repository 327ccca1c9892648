//! Binary Space Partitioning tree for 2D regions.
//!
//! The tree partitions the plane with lines taken from region edges. It
//! supports:
//!
//! - Insertion with automatic splitting of straddling regions
//! - Overlap resolution where the newest region wins
//! - Point location and potential-overlap queries
//! - Border adjacency between stored regions (the region graph)
//! - Near-to-far traversal relative to a point, for rendering collaborators
//!
//! # Example
//!
//! ```ignore
//! use region_bsp::{BspTree, Point, Region};
//! use region_bsp::bsp::CollectingVisitor;
//!
//! let mut tree = BspTree::new();
//! tree.resolve_overlaps(Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]))?;
//! tree.resolve_overlaps(Region::from_coords(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)]))?;
//!
//! // A point on the shared border lies in both regions
//! assert_eq!(tree.locate(&Point::new(1.0, 0.5))?.len(), 2);
//!
//! let mut visitor = CollectingVisitor::new();
//! tree.traverse_near_to_far(&Point::new(1.5, 0.5), &mut visitor);
//! ```
//!
//! # Architecture
//!
//! - [`BspTree`]: arenas of nodes and regions plus the insertion work queue
//! - [`BspNode`]: a partition line and its two halves
//! - [`EdgeSelector`]: strategy for choosing partition lines
//! - [`OverlapMemo`]: pairs of regions already known not to overlap
//! - [`RegionVisitor`]: visitor trait for custom traversal behavior
//! - [`SharedTree`]: the tree behind a lock, with pending-insertion tracking

mod memo;
mod node;
mod selector;
mod shared;
mod tree;
mod visitor;

pub use memo::OverlapMemo;
pub use node::{BspNode, NodeHalf, NodeId, RegionId, Side};
pub use selector::{EdgeScore, EdgeSelector, FewestSplits, FirstEdge};
pub use shared::{PendingGuard, PendingInsertions, SharedTree};
pub use tree::BspTree;
pub use visitor::{CollectingVisitor, FnVisitor, RegionVisitor};
