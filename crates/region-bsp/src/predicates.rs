//! Stateless geometric predicates on points, lines and segments.

use nalgebra::Vector2;

use crate::Point;

/// Points closer than this on both axes are considered the same location.
/// Also the tolerance for colinearity and segment endpoint contact.
pub const POINT_EPSILON: f64 = 1e-5;

/// Accumulated side weight below which a side of a [`PointSides`](crate::PointSides)
/// is treated as floating-point noise.
pub const SIDE_EPSILON: f64 = 1e-6;

/// Polygons with less area than this are degenerate.
pub const AREA_EPSILON: f64 = 1e-9;

/// Signed side of `point` relative to the directed line `a -> b`.
///
/// - Negative: point is to the left
/// - Positive: point is to the right
/// - Zero: point is on the line
///
/// The magnitude is the perpendicular distance scaled by `|b - a|`.
#[inline]
pub fn side_of_line(point: &Point, a: &Point, b: &Point) -> f64 {
    let ap = point.xy() - a.xy();
    let ab = b.xy() - a.xy();
    ap.perp(&ab)
}

/// Slope of the line through `a` and `b`, or `None` for a vertical line.
#[inline]
pub fn slope(a: &Point, b: &Point) -> Option<f64> {
    let dx = b.x() - a.x();
    if dx.abs() < POINT_EPSILON {
        None
    } else {
        Some((b.y() - a.y()) / dx)
    }
}

/// Tests whether `test` lies on the infinite line through `a` and `b`.
///
/// Compares the point's `y` against the line's point-slope value; vertical
/// lines compare `x` instead.
pub fn colinear(a: &Point, b: &Point, test: &Point) -> bool {
    match slope(a, b) {
        Some(m) => {
            let expected = a.y() + m * (test.x() - a.x());
            (test.y() - expected).abs() < POINT_EPSILON
        }
        None => (test.x() - a.x()).abs() < POINT_EPSILON,
    }
}

/// Axis-aligned bounding extents of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Extents {
    /// Computes the extents of a point set. Returns `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extents = Self {
            left: first.x(),
            right: first.x(),
            bottom: first.y(),
            top: first.y(),
        };
        for p in iter {
            extents.left = extents.left.min(p.x());
            extents.right = extents.right.max(p.x());
            extents.bottom = extents.bottom.min(p.y());
            extents.top = extents.top.max(p.y());
        }
        Some(extents)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Inclusive overlap test: boxes that merely touch overlap.
    pub fn overlaps(&self, other: &Extents) -> bool {
        self.left <= other.right + POINT_EPSILON
            && other.left <= self.right + POINT_EPSILON
            && self.bottom <= other.top + POINT_EPSILON
            && other.bottom <= self.top + POINT_EPSILON
    }

    /// Strict overlap test: the boxes share a region of positive area.
    pub fn overlaps_interior(&self, other: &Extents) -> bool {
        self.left < other.right - POINT_EPSILON
            && other.left < self.right - POINT_EPSILON
            && self.bottom < other.top - POINT_EPSILON
            && other.bottom < self.top - POINT_EPSILON
    }

    /// Inclusive containment test for a point.
    pub fn contains(&self, point: &Point) -> bool {
        point.x() >= self.left - POINT_EPSILON
            && point.x() <= self.right + POINT_EPSILON
            && point.y() >= self.bottom - POINT_EPSILON
            && point.y() <= self.top + POINT_EPSILON
    }

    /// The four corners, counter-clockwise from bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.bottom),
            Point::new(self.right, self.bottom),
            Point::new(self.right, self.top),
            Point::new(self.left, self.top),
        ]
    }
}

/// Bounding-box overlap test for two segments (inclusive).
#[inline]
pub fn bounds_overlap(a: &Point, b: &Point, c: &Point, d: &Point) -> bool {
    match (Extents::from_points([a, b]), Extents::from_points([c, d])) {
        (Some(first), Some(second)) => first.overlaps(&second),
        _ => false,
    }
}

/// Result of intersecting two segments.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionResult {
    /// The intersection point.
    pub point: Point,
    /// `true` when the segments only touch at an endpoint instead of crossing.
    pub is_tangent: bool,
    /// Index of the polygon edge that produced the hit, when intersecting
    /// against a region boundary.
    pub edge_index: Option<usize>,
}

/// Intersects segment `a-b` with segment `c-d`.
///
/// Returns `None` for degenerate (zero-length), parallel, colinear and
/// non-intersecting segments. A hit at (or within [`POINT_EPSILON`] of) an
/// endpoint of either segment is reported with `is_tangent = true`.
pub fn segment_intersection(
    a: &Point,
    b: &Point,
    c: &Point,
    d: &Point,
) -> Option<IntersectionResult> {
    let r: Vector2<f64> = b.xy() - a.xy();
    let s: Vector2<f64> = d.xy() - c.xy();
    let r_len = r.norm();
    let s_len = s.norm();

    if r_len < POINT_EPSILON || s_len < POINT_EPSILON {
        return None;
    }

    if !bounds_overlap(a, b, c, d) {
        return None;
    }

    // Parallel or colinear (identical segments included)
    let denom = r.perp(&s);
    if (denom / (r_len * s_len)).abs() < f64::EPSILON * 16.0 {
        return None;
    }

    let ac = c.xy() - a.xy();
    let t = ac.perp(&s) / denom;
    let u = ac.perp(&r) / denom;

    let t_tol = POINT_EPSILON / r_len;
    let u_tol = POINT_EPSILON / s_len;
    if t < -t_tol || t > 1.0 + t_tol || u < -u_tol || u > 1.0 + u_tol {
        return None;
    }

    let at_extreme = |v: f64, tol: f64| v.abs() <= tol || (v - 1.0).abs() <= tol;
    let is_tangent = at_extreme(t, t_tol) || at_extreme(u, u_tol);

    let hit = a.xy() + r * t.clamp(0.0, 1.0);
    Some(IntersectionResult {
        point: Point::new(hit.x, hit.y),
        is_tangent,
        edge_index: None,
    })
}

/// Closest point to `point` on the segment `a-b`.
pub fn nearest_point_on_segment(point: &Point, a: &Point, b: &Point) -> Point {
    let ab = b.xy() - a.xy();
    let len_sq = ab.norm_squared();
    if len_sq < POINT_EPSILON * POINT_EPSILON {
        return a.clone();
    }
    let t = ((point.xy() - a.xy()).dot(&ab) / len_sq).clamp(0.0, 1.0);
    Point::from(a.xy() + ab * t)
}

/// Distance from `point` to the segment `a-b`.
#[inline]
pub fn distance_to_segment(point: &Point, a: &Point, b: &Point) -> f64 {
    point.distance(&nearest_point_on_segment(point, a, b))
}
