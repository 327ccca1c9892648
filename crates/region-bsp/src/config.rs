//! Runtime limits for tree construction and pathfinding.

/// Limits applied by [`BspTree`](crate::BspTree) structural operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of queued placement or overlap steps a single
    /// `insert`/`resolve_overlaps` call may process.
    pub max_work_items: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_work_items: 10_000,
        }
    }
}

impl TreeConfig {
    pub fn with_max_work_items(mut self, max_work_items: usize) -> Self {
        self.max_work_items = max_work_items;
        self
    }
}

/// Limits applied by the [`Pathfinder`](crate::Pathfinder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathfinderConfig {
    /// Search steps allowed before giving up with
    /// [`PathError::PathfindingDivergence`](crate::PathError::PathfindingDivergence).
    pub max_iterations: usize,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

impl PathfinderConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builders() {
        assert_eq!(TreeConfig::default().max_work_items, 10_000);
        assert_eq!(PathfinderConfig::default().max_iterations, 100);
        assert_eq!(TreeConfig::default().with_max_work_items(5).max_work_items, 5);
        assert_eq!(
            PathfinderConfig::default().with_max_iterations(7).max_iterations,
            7
        );
    }
}
