//! Visitor pattern for BSP tree traversal.
//!
//! Visitors let rendering or query code process leaf cells in a
//! deterministic order without depending on the tree's internals.

use crate::Region;

use super::RegionId;

/// Visitor for processing regions during BSP tree traversal.
pub trait RegionVisitor {
    /// Called once per non-empty leaf cell with the regions stored there.
    fn visit(&mut self, regions: &[(RegionId, &Region)]);
}

/// A simple visitor that collects the ids of all visited regions.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<RegionId>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected ids in visiting order.
    pub fn into_ids(self) -> Vec<RegionId> {
        self.collected
    }

    pub fn ids(&self) -> &[RegionId] {
        &self.collected
    }
}

impl RegionVisitor for CollectingVisitor {
    fn visit(&mut self, regions: &[(RegionId, &Region)]) {
        self.collected.extend(regions.iter().map(|(id, _)| *id));
    }
}

/// A visitor that calls a closure for each leaf cell.
pub struct FnVisitor<F>
where
    F: FnMut(&[(RegionId, &Region)]),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(&[(RegionId, &Region)]),
{
    /// Creates a new visitor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> RegionVisitor for FnVisitor<F>
where
    F: FnMut(&[(RegionId, &Region)]),
{
    fn visit(&mut self, regions: &[(RegionId, &Region)]) {
        (self.func)(regions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_triangle() -> Region {
        Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)])
    }

    #[test]
    fn collecting_visitor_empty() {
        let visitor = CollectingVisitor::new();
        assert!(visitor.ids().is_empty());
    }

    #[test]
    fn collecting_visitor_collects() {
        let mut visitor = CollectingVisitor::new();
        let triangle = make_triangle();

        visitor.visit(&[(RegionId(4), &triangle)]);
        visitor.visit(&[(RegionId(1), &triangle), (RegionId(2), &triangle)]);

        assert_eq!(
            visitor.into_ids(),
            vec![RegionId(4), RegionId(1), RegionId(2)]
        );
    }

    #[test]
    fn fn_visitor_calls_closure() {
        let mut area = 0.0;
        {
            let mut visitor = FnVisitor::new(|regions: &[(RegionId, &Region)]| {
                area += regions.iter().map(|(_, r)| r.area()).sum::<f64>();
            });
            let triangle = make_triangle();
            visitor.visit(&[(RegionId(0), &triangle), (RegionId(1), &triangle)]);
        }
        assert!((area - 1.0).abs() < 1e-12);
    }
}
