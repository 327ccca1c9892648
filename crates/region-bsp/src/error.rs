//! Error types for region validation, tree operations and pathfinding.

use thiserror::Error;

use crate::bsp::RegionId;

/// Reasons a polygon fails [`Region::optimize`](crate::Region::optimize).
///
/// Recoverable: the caller must discard or repair the input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRegion {
    #[error("region needs at least 3 distinct vertices, found {count}")]
    TooFewVertices { count: usize },

    #[error("region edges {first_edge} and {second_edge} cross each other")]
    SelfIntersecting { first_edge: usize, second_edge: usize },

    #[error("region encloses no area ({area})")]
    Degenerate { area: f64 },
}

/// Reasons a split or clip did not produce the expected fragments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitFailure {
    #[error("region lies on one side of the line")]
    NotStraddling,

    #[error("line met the boundary in {0} points, expected 2")]
    Intersections(usize),

    #[error("fragment is invalid: {0}")]
    Invalid(#[source] InvalidRegion),
}

/// Errors raised by [`BspTree`](crate::BspTree) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BspError {
    #[error("invalid region: {0}")]
    Invalid(#[from] InvalidRegion),

    #[error("no region contains point ({x}, {y})")]
    PointNotFound { x: f64, y: f64 },

    #[error("point lies in {count} regions, expected exactly one")]
    AmbiguousLocation { count: usize },

    #[error("region {0} is not stored in the tree")]
    UnknownRegion(RegionId),

    /// A straddling region could not be split into exactly two fragments.
    #[error("splitting region {region} produced {intersections} boundary intersections, expected 2")]
    SplitInvariant { region: RegionId, intersections: usize },

    /// No region edge separates the residents of a leaf.
    #[error("no partition line separates region {region} from its leaf neighbours")]
    NoPartition { region: RegionId },

    #[error("insertion did not settle within {limit} work items")]
    InsertionDivergence { limit: usize },
}

/// Result type for tree operations.
pub type BspResult<T> = Result<T, BspError>;

/// Errors raised by the pathfinder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    /// Every route was explored and backtracked.
    #[error("no route between start and destination")]
    NoRouteFound,

    /// The iteration ceiling was hit. Indicates a cost function or topology
    /// defect; callers must not retry.
    #[error("pathfinding exceeded {iterations} iterations")]
    PathfindingDivergence { iterations: usize },

    #[error(transparent)]
    Location(#[from] BspError),
}
