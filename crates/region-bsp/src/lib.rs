//! 2D region index built on a Binary Space Partitioning (BSP) tree.
//!
//! Regions are simple polygons carrying an opaque property bag. The crate
//! cleans them up ([`Region::optimize`]), splits and clips them, stores them
//! in a [`BspTree`] that answers point-location queries, and finds
//! cost-weighted paths across regions that share a border.

pub mod bsp;
mod config;
mod convex;
mod error;
mod optimize;
mod path;
mod point;
mod predicates;
mod region;
mod sides;
mod split;

pub use bsp::{BspTree, RegionId, SharedTree};
pub use config::{PathfinderConfig, TreeConfig};
pub use convex::join_convex;
pub use error::{BspError, BspResult, InvalidRegion, PathError, SplitFailure};
pub use path::{find_path, CostEvaluator, Path, Pathfinder};
pub use point::{CoordinateSystem, Point};
pub use predicates::{
    bounds_overlap, colinear, distance_to_segment, nearest_point_on_segment, segment_intersection,
    side_of_line, slope, Extents, IntersectionResult, AREA_EPSILON, POINT_EPSILON, SIDE_EPSILON,
};
pub use region::{PropertyValue, Region};
pub use sides::{classify_point, point_side_list, Classification, LineSide, PointSides};
pub use split::Clipped;
