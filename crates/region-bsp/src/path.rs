//! Cost-weighted pathfinding across the region graph.
//!
//! The graph is implicit: nodes are the regions stored in a [`BspTree`] and
//! edges are their shared borders. The search is greedy with backtracking.
//! At each step it moves to the unvisited neighbor minimizing
//!
//! ```text
//! |position -> border| * cost(current) + |border -> destination| * cost(neighbor)
//! ```
//!
//! where `border` is the point of the shared border nearest the current
//! position. Dead ends are popped off the stack and never revisited.

use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::bsp::{BspTree, EdgeSelector, RegionId};
use crate::config::PathfinderConfig;
use crate::{nearest_point_on_segment, BspError, PathError, Point, Region};

/// Scores how expensive it is for `mover` to travel one unit inside a region.
///
/// Implemented for every `Fn(&Region, &M) -> f64`.
pub trait CostEvaluator<M: ?Sized> {
    fn cost(&self, region: &Region, mover: &M) -> f64;
}

impl<M: ?Sized, F> CostEvaluator<M> for F
where
    F: Fn(&Region, &M) -> f64,
{
    #[inline]
    fn cost(&self, region: &Region, mover: &M) -> f64 {
        self(region, mover)
    }
}

/// A route from start to destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Start point, one border crossing per region change, destination.
    pub waypoints: Vec<Point>,
    /// Regions crossed; leg `i` (between waypoints `i` and `i + 1`) lies in
    /// `regions[i]`.
    pub regions: Vec<RegionId>,
    /// Sum of leg length times the cost of the leg's region.
    pub cost: f64,
}

impl Path {
    /// Straight-line length of all legs, ignoring region costs.
    pub fn length(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|leg| leg[0].distance(&leg[1]))
            .sum()
    }
}

/// Greedy backtracking search over a tree's region graph.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'t, S> {
    tree: &'t BspTree<S>,
    config: PathfinderConfig,
}

impl<'t, S: EdgeSelector> Pathfinder<'t, S> {
    pub fn new(tree: &'t BspTree<S>) -> Self {
        Self {
            tree,
            config: PathfinderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PathfinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Finds a route from `start` to `destination` for `mover`.
    ///
    /// A start point on a shared border starts in the lowest region id; a
    /// destination on a shared border is reached through any of its regions.
    ///
    /// # Errors
    ///
    /// - [`PathError::Location`] if either point lies outside every region.
    /// - [`PathError::NoRouteFound`] once every branch has been backtracked.
    /// - [`PathError::PathfindingDivergence`] when the iteration ceiling is
    ///   hit. Do not retry.
    #[instrument(level = "debug", skip_all, fields(start = %start, destination = %destination))]
    pub fn find_path<M, C>(
        &self,
        start: &Point,
        destination: &Point,
        mover: &M,
        cost_fn: &C,
    ) -> Result<Path, PathError>
    where
        M: ?Sized,
        C: CostEvaluator<M>,
    {
        let targets = self.tree.locate(destination)?;
        let origin = self
            .tree
            .locate(start)?
            .into_iter()
            .next()
            .ok_or(PathError::NoRouteFound)?;

        let mut stack = vec![origin];
        let mut waypoints = vec![start.clone()];
        let mut used: HashSet<RegionId> = HashSet::new();
        let mut iterations = 0;

        loop {
            let Some(&current) = stack.last() else {
                debug!(iterations, "search exhausted");
                return Err(PathError::NoRouteFound);
            };
            if targets.contains(&current) {
                waypoints.push(destination.clone());
                let cost = self.route_cost(&waypoints, &stack, mover, cost_fn)?;
                debug!(iterations, regions = stack.len(), cost, "path found");
                return Ok(Path {
                    waypoints,
                    regions: stack,
                    cost,
                });
            }

            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(PathError::PathfindingDivergence {
                    iterations: self.config.max_iterations,
                });
            }

            let region = self.stored(current)?;
            let position = waypoints.last().ok_or(PathError::NoRouteFound)?;
            let here = cost_fn.cost(region, mover);

            let mut best: Option<(f64, RegionId, Point)> = None;
            for &next in self.tree.neighbors(current)? {
                if used.contains(&next) || stack.contains(&next) {
                    continue;
                }
                let neighbor = self.stored(next)?;
                let Some(border) = nearest_border_point(region, neighbor, position) else {
                    continue;
                };
                let total = position.distance(&border) * here
                    + border.distance(destination) * cost_fn.cost(neighbor, mover);
                trace!(from = %current, to = %next, total, "candidate");
                if best.as_ref().is_none_or(|(lowest, ..)| total < *lowest) {
                    best = Some((total, next, border));
                }
            }

            used.insert(current);
            match best {
                Some((total, next, border)) => {
                    trace!(from = %current, to = %next, total, %border, "advance");
                    stack.push(next);
                    waypoints.push(border);
                }
                None => {
                    trace!(region = %current, "backtrack");
                    stack.pop();
                    waypoints.pop();
                }
            }
        }
    }

    fn stored(&self, id: RegionId) -> Result<&'t Region, PathError> {
        self.tree
            .region(id)
            .ok_or(PathError::Location(BspError::UnknownRegion(id)))
    }

    fn route_cost<M, C>(
        &self,
        waypoints: &[Point],
        regions: &[RegionId],
        mover: &M,
        cost_fn: &C,
    ) -> Result<f64, PathError>
    where
        M: ?Sized,
        C: CostEvaluator<M>,
    {
        let mut cost = 0.0;
        for (leg, &id) in waypoints.windows(2).zip(regions) {
            cost += leg[0].distance(&leg[1]) * cost_fn.cost(self.stored(id)?, mover);
        }
        Ok(cost)
    }
}

/// Finds a route with the default [`PathfinderConfig`].
pub fn find_path<S, M, C>(
    tree: &BspTree<S>,
    start: &Point,
    destination: &Point,
    mover: &M,
    cost_fn: &C,
) -> Result<Path, PathError>
where
    S: EdgeSelector,
    M: ?Sized,
    C: CostEvaluator<M>,
{
    Pathfinder::new(tree).find_path(start, destination, mover, cost_fn)
}

/// Point on the border shared by `from` and `to` nearest `position`.
fn nearest_border_point(from: &Region, to: &Region, position: &Point) -> Option<Point> {
    from.shared_borders(to)
        .iter()
        .map(|(a, b)| {
            let candidate = nearest_point_on_segment(position, a, b);
            (candidate.distance(position), candidate)
        })
        .min_by(|x, y| x.0.total_cmp(&y.0))
        .map(|(_, point)| point)
}
