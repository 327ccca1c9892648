//! Region cleanup: deduplication, colinear vertex removal, self-intersection
//! rejection and counter-clockwise normalization.

use crate::{colinear, segment_intersection, InvalidRegion, Point, Region, AREA_EPSILON};

impl Region {
    /// Normalizes the region in place.
    ///
    /// Does nothing if the region is already optimized. Otherwise:
    /// 1. drops duplicate vertices,
    /// 2. rejects polygons with fewer than three vertices,
    /// 3. rejects polygons whose edges cross each other (touching is allowed),
    /// 4. drops vertices that sit on the straight chord between their
    ///    neighbours, unless that chord would cross another edge,
    /// 5. rejects zero-area leftovers,
    /// 6. reverses clockwise polygons.
    ///
    /// On error the region is left untouched.
    pub fn optimize(&mut self) -> Result<(), InvalidRegion> {
        if self.is_optimized() {
            return Ok(());
        }

        let mut points = dedup_points(self.points());
        if points.len() < 3 {
            return Err(InvalidRegion::TooFewVertices { count: points.len() });
        }

        if let Some((first_edge, second_edge)) = find_self_intersection(&points) {
            return Err(InvalidRegion::SelfIntersecting {
                first_edge,
                second_edge,
            });
        }

        remove_colinear(&mut points);
        if points.len() < 3 {
            return Err(InvalidRegion::TooFewVertices { count: points.len() });
        }

        self.set_points(points);
        let signed = self.signed_area();
        if signed.abs() < AREA_EPSILON {
            return Err(InvalidRegion::Degenerate { area: signed.abs() });
        }
        if signed < 0.0 {
            let mut reversed = self.points().to_vec();
            reversed.reverse();
            self.set_points(reversed);
        }

        self.mark_optimized();
        Ok(())
    }

    /// Consuming variant of [`Region::optimize`].
    pub fn optimized(mut self) -> Result<Region, InvalidRegion> {
        self.optimize()?;
        Ok(self)
    }
}

/// Keeps the first occurrence of every location.
fn dedup_points(points: &[Point]) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if !kept.iter().any(|k| k.approx_eq(p)) {
            kept.push(p.clone());
        }
    }
    kept
}

/// Returns the first pair of edges that properly cross.
fn find_self_intersection(points: &[Point]) -> Option<(usize, usize)> {
    let n = points.len();
    for i in 0..n {
        let (a, b) = (&points[i], &points[(i + 1) % n]);
        for j in (i + 1)..n {
            let (c, d) = (&points[j], &points[(j + 1) % n]);
            if let Some(hit) = segment_intersection(a, b, c, d) {
                if !hit.is_tangent {
                    return Some((i, j));
                }
            }
        }
    }
    None
}

/// Repeatedly removes vertices that lie on the line through their
/// neighbours, as long as the replacement chord crosses no other edge.
fn remove_colinear(points: &mut Vec<Point>) {
    let mut i = 0;
    while points.len() >= 3 && i < points.len() {
        let n = points.len();
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        if colinear(&points[prev], &points[next], &points[i])
            && chord_is_clear(points, prev, next)
        {
            points.remove(i);
            // The previous vertex may have become colinear in turn.
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
}

/// The chord `prev-next` must not properly cross any edge of the polygon.
fn chord_is_clear(points: &[Point], prev: usize, next: usize) -> bool {
    let n = points.len();
    let (a, b) = (&points[prev], &points[next]);
    (0..n).all(|k| {
        let (c, d) = (&points[k], &points[(k + 1) % n]);
        segment_intersection(a, b, c, d).is_none_or(|hit| hit.is_tangent)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coords(region: &Region) -> Vec<(f64, f64)> {
        region.points().iter().map(|p| (p.x(), p.y())).collect()
    }

    #[test]
    fn removes_colinear_midpoint() {
        let mut square =
            Region::from_coords(&[(0.0, 0.0), (0.5, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        square.optimize().unwrap();
        assert!(square.is_optimized());
        assert_eq!(
            coords(&square),
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
        );
    }

    #[test]
    fn removes_duplicates() {
        let region = Region::from_coords(&[(0.0, 0.0), (2.0, 0.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)])
            .optimized()
            .unwrap();
        assert_eq!(region.len(), 3);
    }

    #[test]
    fn bowtie_is_invalid() {
        let mut bowtie = Region::from_coords(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]);
        let err = bowtie.optimize().unwrap_err();
        assert!(matches!(err, InvalidRegion::SelfIntersecting { .. }));
        assert!(!bowtie.is_optimized());
        assert_eq!(bowtie.len(), 4);
    }

    #[test]
    fn too_few_vertices() {
        let err = Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0)])
            .optimized()
            .unwrap_err();
        assert_eq!(err, InvalidRegion::TooFewVertices { count: 2 });
    }

    #[test]
    fn all_colinear_collapses() {
        let err = Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])
            .optimized()
            .unwrap_err();
        assert!(matches!(err, InvalidRegion::TooFewVertices { .. }));
    }

    #[test]
    fn clockwise_is_reversed() {
        let region = Region::from_coords(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])
            .optimized()
            .unwrap();
        assert!(region.signed_area() > 0.0);
        assert!((region.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn concave_notch_survives() {
        let mut u = Region::from_coords(&[
            (0.0, 0.0),
            (3.0, 0.0),
            (3.0, 3.0),
            (2.0, 3.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 3.0),
            (0.0, 3.0),
        ]);
        u.optimize().unwrap();
        assert_eq!(u.len(), 8);
        assert!((u.area() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn optimize_is_idempotent() {
        let mut region = Region::from_coords(&[(0.0, 0.0), (4.0, 0.0), (0.0, 3.0)]);
        region.optimize().unwrap();
        let before = coords(&region);
        region.optimize().unwrap();
        assert_eq!(coords(&region), before);
    }

    /// Star-shaped polygons around the origin are always simple.
    fn star_polygon() -> impl Strategy<Value = (Vec<(f64, f64)>, bool)> {
        (4usize..12)
            .prop_flat_map(|n| {
                (
                    prop::collection::vec((0.0f64..1.0, 1.0f64..10.0), n),
                    any::<bool>(),
                )
            })
            .prop_map(|(samples, reverse)| {
                let n = samples.len() as f64;
                let step = std::f64::consts::TAU / n;
                let mut pts: Vec<(f64, f64)> = samples
                    .iter()
                    .enumerate()
                    .map(|(i, &(jitter, radius))| {
                        let angle = (i as f64 + jitter * 0.8) * step;
                        (radius * angle.cos(), radius * angle.sin())
                    })
                    .collect();
                if reverse {
                    pts.reverse();
                }
                (pts, reverse)
            })
    }

    proptest! {
        #[test]
        fn optimize_preserves_area_and_winds_ccw((pts, _reversed) in star_polygon()) {
            let original = Region::from_coords(&pts);
            let expected = original.area();
            let region = original.optimized().unwrap();
            prop_assert!(region.signed_area() > 0.0);
            prop_assert!((region.area() - expected).abs() <= 1e-6 * expected.max(1.0));
            prop_assert!(region.len() >= 3);
        }
    }
}
