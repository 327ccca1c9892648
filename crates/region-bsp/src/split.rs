//! Region splitting along a line and clipping against another region.
//!
//! Splitting walks the boundary once, inserting the two points where the
//! (possibly extended) line meets it, and cuts the vertex ring there. Both
//! fragments keep the original winding and share the two cut points.

use tracing::warn;

use crate::{Classification, IntersectionResult, Point, PointSides, Region, SplitFailure};

/// Result of clipping a region against another one.
#[derive(Debug, Clone, Default)]
pub struct Clipped {
    /// Fragments inside the clip region.
    pub inside: Vec<Region>,
    /// Fragments outside the clip region.
    pub outside: Vec<Region>,
}

impl Clipped {
    /// Total area of the inside fragments.
    pub fn inside_area(&self) -> f64 {
        self.inside.iter().map(Region::area).sum()
    }

    /// Total area of the outside fragments.
    pub fn outside_area(&self) -> f64 {
        self.outside.iter().map(Region::area).sum()
    }
}

impl Region {
    /// Splits the region along the line through `a` and `b`.
    ///
    /// With `allow_hyperplane` the segment is extended across the region's
    /// extents, so any straddling line splits it; otherwise only the segment
    /// itself is used. The boundary must be met in exactly two points.
    ///
    /// On success `self` becomes the fragment left of `a -> b` and the
    /// fragment on the right is returned. Both are optimized and carry the
    /// original property bag. On failure `self` is unchanged.
    pub fn split_along_edge(&mut self, a: &Point, b: &Point, allow_hyperplane: bool) -> Option<Region> {
        match self.split_fragments(a, b, allow_hyperplane) {
            Ok((left, right)) => {
                *self = left;
                Some(right)
            }
            Err(_) => None,
        }
    }

    /// Returns the `(left, right)` fragments without touching `self`.
    pub(crate) fn split_fragments(
        &self,
        a: &Point,
        b: &Point,
        allow_hyperplane: bool,
    ) -> Result<(Region, Region), SplitFailure> {
        let Some(extents) = self.extents() else {
            return Err(SplitFailure::Intersections(0));
        };
        if a.approx_eq(b) {
            return Err(SplitFailure::Intersections(0));
        }

        let (start, end) = if allow_hyperplane {
            extend_across(a, b, &extents.corners())
        } else {
            (a.clone(), b.clone())
        };

        let cuts = distinct_hits(self.segment_hits(&start, &end));
        if PointSides::of_region(a, b, self).classification() != Classification::Straddling {
            return Err(SplitFailure::NotStraddling);
        }
        if cuts.len() != 2 {
            return Err(SplitFailure::Intersections(cuts.len()));
        }

        // Vertex ring with the cut points spliced in, each flagged as a cut.
        let mut ring: Vec<(Point, bool)> = Vec::with_capacity(self.len() + 2);
        let vertex_cut = |k: usize| cuts.iter().any(|c| c.point.approx_eq(&self.points()[k]));
        for (k, vertex, _) in self.edges() {
            ring.push((vertex.clone(), vertex_cut(k)));
            for cut in &cuts {
                let on_vertex = self.points().iter().any(|v| v.approx_eq(&cut.point));
                if !on_vertex && cut.edge_index == Some(k) {
                    ring.push((cut.point.clone(), true));
                }
            }
        }

        let positions: Vec<usize> = ring
            .iter()
            .enumerate()
            .filter_map(|(i, (_, is_cut))| is_cut.then_some(i))
            .collect();
        let &[p, q] = positions.as_slice() else {
            return Err(SplitFailure::Intersections(positions.len()));
        };

        let first: Vec<Point> = ring[p..=q].iter().map(|(pt, _)| pt.clone()).collect();
        let second: Vec<Point> = ring[q..]
            .iter()
            .chain(ring[..=p].iter())
            .map(|(pt, _)| pt.clone())
            .collect();

        let first_is_left =
            PointSides::classify(a, b, &first).classification() == Classification::Left;
        let (left, right) = if first_is_left {
            (first, second)
        } else {
            (second, first)
        };

        let left = self
            .with_same_properties(left)
            .optimized()
            .map_err(SplitFailure::Invalid)?;
        let right = self
            .with_same_properties(right)
            .optimized()
            .map_err(SplitFailure::Invalid)?;
        Ok((left, right))
    }

    /// Clips this region against `clip_region`.
    ///
    /// Returns `Ok(None)` when the bounding extents do not meet. Non-convex
    /// inputs are decomposed into convex parts first, so the returned
    /// fragments are convex. Fails if either region does not optimize or a
    /// clip edge that crosses a fragment cannot split it.
    pub fn clip(&self, clip_region: &Region) -> Result<Option<Clipped>, SplitFailure> {
        let (Some(mine), Some(theirs)) = (self.extents(), clip_region.extents()) else {
            return Ok(None);
        };
        if !mine.overlaps(&theirs) {
            return Ok(None);
        }

        let subject = self.clone().optimized().map_err(SplitFailure::Invalid)?;
        let clip = clip_region.clone().optimized().map_err(SplitFailure::Invalid)?;

        let mut remaining = subject.convex_decompose().map_err(SplitFailure::Invalid)?;
        let mut clipped = Clipped::default();
        for part in clip.convex_decompose().map_err(SplitFailure::Invalid)? {
            let mut still_outside = Vec::new();
            for piece in remaining {
                let (inside, outside) = clip_convex(piece, &part)?;
                clipped.inside.extend(inside);
                still_outside.extend(outside);
            }
            remaining = still_outside;
        }
        clipped.outside = remaining;
        Ok(Some(clipped))
    }
}

/// Clips a convex piece against a convex, counter-clockwise clip polygon.
fn clip_convex(piece: Region, clip: &Region) -> Result<(Option<Region>, Vec<Region>), SplitFailure> {
    let mut remaining = piece;
    let mut outside = Vec::new();
    for (edge, a, b) in clip.edges() {
        match PointSides::of_region(a, b, &remaining).classification() {
            Classification::Left | Classification::Colinear => {}
            Classification::Right => {
                outside.push(remaining);
                return Ok((None, outside));
            }
            Classification::Straddling => {
                let (left, right) = remaining.split_fragments(a, b, true).inspect_err(|failure| {
                    warn!(edge, %failure, "clip edge could not split fragment");
                })?;
                outside.push(right);
                remaining = left;
            }
        }
    }
    Ok((Some(remaining), outside))
}

/// Extends `a-b` so it spans every point in `bounds`, with some margin.
fn extend_across(a: &Point, b: &Point, bounds: &[Point]) -> (Point, Point) {
    let origin = a.xy();
    let dir = (b.xy() - origin).normalize();
    let (mut lo, mut hi) = (0.0_f64, (b.xy() - origin).norm());
    for corner in bounds {
        let t = (corner.xy() - origin).dot(&dir);
        lo = lo.min(t);
        hi = hi.max(t);
    }
    (
        Point::from(origin + dir * (lo - 1.0)),
        Point::from(origin + dir * (hi + 1.0)),
    )
}

/// Collapses hits that land on the same location (a vertex reported by both
/// of its edges).
fn distinct_hits(hits: Vec<IntersectionResult>) -> Vec<IntersectionResult> {
    let mut distinct: Vec<IntersectionResult> = Vec::with_capacity(hits.len());
    for hit in hits {
        if !distinct.iter().any(|d| d.point.approx_eq(&hit.point)) {
            distinct.push(hit);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Region {
        Region::from_coords(&[
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ])
        .optimized()
        .unwrap()
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn hyperplane_split_of_square() {
        let mut region = square(0.0, 0.0, 2.0);
        region.set_property("id", 7_u32);

        // Short segment inside the square, extended across it
        let right = region
            .split_along_edge(&p(1.0, 0.5), &p(1.0, 1.5), true)
            .expect("vertical line splits the square");

        // Direction is +y, so left means x < 1
        assert!((region.area() - 2.0).abs() < 1e-9);
        assert!((right.area() - 2.0).abs() < 1e-9);
        assert!(region.points().iter().all(|v| v.x() <= 1.0 + 1e-9));
        assert!(right.points().iter().all(|v| v.x() >= 1.0 - 1e-9));
        assert!(region.is_optimized() && right.is_optimized());
        assert!(region.signed_area() > 0.0 && right.signed_area() > 0.0);
        assert_eq!(right.property::<u32>("id"), Some(&7));
        assert!(region.borders(&right));
    }

    #[test]
    fn split_through_vertices() {
        let mut region = square(0.0, 0.0, 1.0);
        let other = region
            .split_along_edge(&p(0.0, 0.0), &p(1.0, 1.0), true)
            .expect("diagonal splits the square");
        assert_eq!(region.len(), 3);
        assert_eq!(other.len(), 3);
        assert!((region.area() - 0.5).abs() < 1e-9);
        assert!((other.area() - 0.5).abs() < 1e-9);
        // Left of (0,0)->(1,1) is the upper-left triangle
        assert!(region.contains_point(&p(0.1, 0.9)));
    }

    #[test]
    fn line_outside_extents_leaves_region_unchanged() {
        let mut region = square(0.0, 0.0, 1.0);
        let before: Vec<Point> = region.points().to_vec();
        assert!(region.split_along_edge(&p(5.0, -1.0), &p(5.0, 1.0), true).is_none());
        assert_eq!(region.points(), &before[..]);
    }

    #[test]
    fn segment_split_requires_reaching_the_boundary() {
        let mut region = square(0.0, 0.0, 2.0);
        // Without extension the segment only reaches one edge
        assert!(region.split_along_edge(&p(1.0, -1.0), &p(1.0, 1.0), false).is_none());
        // A segment spanning the region splits it
        assert!(region.split_along_edge(&p(1.0, -1.0), &p(1.0, 3.0), false).is_some());
    }

    #[test]
    fn concave_split_with_four_crossings_fails() {
        let u = Region::from_coords(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ])
        .optimized()
        .unwrap();
        let err = u
            .split_fragments(&p(0.0, 2.0), &p(3.0, 2.0), true)
            .unwrap_err();
        assert_eq!(err, SplitFailure::Intersections(4));

        // Below the notch the line crosses twice
        let (left, right) = u.split_fragments(&p(0.0, 0.5), &p(3.0, 0.5), true).unwrap();
        assert!((left.area() - 5.5).abs() < 1e-9);
        assert!((right.area() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn clip_overlapping_squares() {
        let subject = square(0.0, 0.0, 2.0);
        let clip = square(1.0, 1.0, 2.0);
        let clipped = subject.clip(&clip).unwrap().expect("extents overlap");
        assert!((clipped.inside_area() - 1.0).abs() < 1e-9);
        assert!((clipped.outside_area() - 3.0).abs() < 1e-9);
        for piece in &clipped.inside {
            assert!(piece.points().iter().all(|v| v.x() >= 1.0 - 1e-9 && v.y() >= 1.0 - 1e-9));
        }
    }

    #[test]
    fn clip_touching_and_disjoint() {
        let subject = square(0.0, 0.0, 1.0);
        let touching = square(1.0, 0.0, 1.0);
        let clipped = subject.clip(&touching).unwrap().expect("touching extents overlap");
        assert!(clipped.inside.is_empty());
        assert!((clipped.outside_area() - 1.0).abs() < 1e-9);

        assert!(subject.clip(&square(5.0, 5.0, 1.0)).unwrap().is_none());
    }

    #[test]
    fn clip_reports_edges_that_cannot_split() {
        // The bottom vertex dips below y = 0, but both crossings of the
        // axis collapse into one point
        let kite = Region::from_coords(&[(-1.0, 5.0), (0.0, -2e-5), (1.0, 5.0), (0.0, 10.0)])
            .optimized()
            .unwrap();
        let cover = square(-5.0, 0.0, 20.0);
        assert_eq!(kite.clip(&cover).unwrap_err(), SplitFailure::Intersections(1));
    }

    #[test]
    fn clip_contained_region() {
        let small = square(1.0, 1.0, 1.0);
        let big = square(0.0, 0.0, 3.0);
        let clipped = small.clip(&big).unwrap().unwrap();
        assert_eq!(clipped.inside.len(), 1);
        assert!(clipped.outside.is_empty());
        assert!((clipped.inside_area() - 1.0).abs() < 1e-9);
    }
}
