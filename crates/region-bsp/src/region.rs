//! Region (simple polygon) representation.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::Vector2;

use crate::{
    colinear, distance_to_segment, segment_intersection, Extents, IntersectionResult, Point,
    POINT_EPSILON,
};

/// Opaque value stored in a region's property bag.
pub type PropertyValue = Arc<dyn Any + Send + Sync>;

/// An implicitly closed polygon with an attached property bag.
///
/// Vertices are stored in order; the last vertex connects back to the first.
/// Once [`Region::is_optimized`] returns `true` the polygon is simple, has at
/// least three distinct vertices and is wound counter-clockwise (interior on
/// the left of every edge). Any geometric mutation clears that flag.
///
/// The property bag belongs to whoever attaches game data to the region.
/// Geometry code copies it onto split fragments but never reads it.
#[derive(Clone)]
pub struct Region {
    points: Vec<Point>,
    properties: HashMap<String, PropertyValue>,
    optimized: bool,
    extents: Option<Extents>,
}

impl Region {
    /// Creates an unoptimized region from its vertices.
    pub fn new(points: Vec<Point>) -> Self {
        let extents = Extents::from_points(&points);
        Self {
            points,
            properties: HashMap::new(),
            optimized: false,
            extents,
        }
    }

    /// Creates an unoptimized region from `(x, y)` pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&c| Point::from(c)).collect())
    }

    /// Returns the vertices in winding order.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    /// Cached bounding extents. `None` only for a region without vertices.
    #[inline]
    pub fn extents(&self) -> Option<Extents> {
        self.extents
    }

    /// Replaces the vertices. The region must be optimized again afterwards.
    pub fn set_points(&mut self, points: Vec<Point>) {
        self.extents = Extents::from_points(&points);
        self.points = points;
        self.optimized = false;
    }

    pub(crate) fn mark_optimized(&mut self) {
        self.optimized = true;
    }

    /// Builds a region with the same property bag and new vertices.
    pub(crate) fn with_same_properties(&self, points: Vec<Point>) -> Region {
        let mut region = Region::new(points);
        region.properties = self.properties.clone();
        region
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Typed view of a property. Returns `None` when absent or of another type.
    pub fn property<T: Any>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)?.downcast_ref::<T>()
    }

    /// Stores a property, returning the previous value for that key.
    pub fn set_property<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Option<PropertyValue> {
        self.properties.insert(key.into(), Arc::new(value))
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Iterates the edges as `(index, start, end)`, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (usize, &Point, &Point)> {
        let n = self.points.len();
        (0..n).map(move |i| (i, &self.points[i], &self.points[(i + 1) % n]))
    }

    /// Shoelace area: positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(_, a, b)| a.x() * b.y() - b.x() * a.y())
            .sum();
        twice * 0.5
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Average of the vertices. Inside the region when it is convex.
    pub fn centroid(&self) -> Point {
        let n = self.points.len().max(1) as f64;
        let sum: Vector2<f64> = self.points.iter().map(|p| p.xy().coords).sum();
        Point::new(sum.x / n, sum.y / n)
    }

    /// Returns `true` if `point` lies within [`POINT_EPSILON`] of an edge.
    pub fn on_boundary(&self, point: &Point) -> bool {
        self.edges()
            .any(|(_, a, b)| distance_to_segment(point, a, b) <= POINT_EPSILON)
    }

    /// Point-in-polygon test. Points on the boundary count as inside.
    pub fn contains_point(&self, point: &Point) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        if let Some(extents) = self.extents {
            if !extents.contains(point) {
                return false;
            }
        }
        self.on_boundary(point) || self.odd_crossings(point)
    }

    /// Point-in-polygon test excluding the boundary.
    pub fn contains_point_strictly(&self, point: &Point) -> bool {
        self.points.len() >= 3 && !self.on_boundary(point) && self.odd_crossings(point)
    }

    fn odd_crossings(&self, point: &Point) -> bool {
        let (px, py) = (point.x(), point.y());
        let mut inside = false;
        for (_, a, b) in self.edges() {
            if (a.y() > py) != (b.y() > py) {
                let x_cross = (b.x() - a.x()) * (py - a.y()) / (b.y() - a.y()) + a.x();
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Intersections of the segment `a-b` with the boundary, each tagged with
    /// the edge that produced it.
    pub fn segment_hits(&self, a: &Point, b: &Point) -> Vec<IntersectionResult> {
        self.edges()
            .filter_map(|(i, c, d)| {
                segment_intersection(a, b, c, d).map(|hit| IntersectionResult {
                    edge_index: Some(i),
                    ..hit
                })
            })
            .collect()
    }

    /// Tests whether the chord between vertices `i` and `j` runs through the
    /// interior: it must not cross any edge, must not pass through another
    /// vertex, and its midpoint must be strictly inside.
    pub fn is_interior_line(&self, i: usize, j: usize) -> bool {
        let n = self.points.len();
        if i >= n || j >= n || i == j {
            return false;
        }
        let (a, b) = (&self.points[i], &self.points[j]);
        if a.approx_eq(b) {
            return false;
        }

        for hit in self.segment_hits(a, b) {
            if !hit.is_tangent {
                return false;
            }
        }

        let passes_vertex = self
            .points
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != i && k != j)
            .any(|(_, v)| distance_to_segment(v, a, b) <= POINT_EPSILON);
        if passes_vertex {
            return false;
        }

        let mid = Point::from(nalgebra::center(&a.xy(), &b.xy()));
        self.contains_point_strictly(&mid)
    }

    /// Border segments shared with `other`: colinear edges that overlap over a
    /// positive length.
    pub fn shared_borders(&self, other: &Region) -> Vec<(Point, Point)> {
        let mut borders = Vec::new();
        for (_, p, q) in self.edges() {
            let dir = q.xy() - p.xy();
            let len = dir.norm();
            if len < POINT_EPSILON {
                continue;
            }
            let unit = dir / len;
            for (_, r, s) in other.edges() {
                if !colinear(p, q, r) || !colinear(p, q, s) {
                    continue;
                }
                let tr = (r.xy() - p.xy()).dot(&unit);
                let ts = (s.xy() - p.xy()).dot(&unit);
                let lo = tr.min(ts).max(0.0);
                let hi = tr.max(ts).min(len);
                if hi - lo > POINT_EPSILON {
                    borders.push((
                        Point::from(p.xy() + unit * lo),
                        Point::from(p.xy() + unit * hi),
                    ));
                }
            }
        }
        borders
    }

    /// Returns `true` if the two regions share a border of positive length.
    #[inline]
    pub fn borders(&self, other: &Region) -> bool {
        !self.shared_borders(other).is_empty()
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.property_keys().collect();
        keys.sort_unstable();
        f.debug_struct("Region")
            .field("points", &self.points)
            .field("properties", &keys)
            .field("optimized", &self.optimized)
            .finish()
    }
}
