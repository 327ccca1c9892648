//! Convexity test, convex decomposition and convex joining.

use nalgebra::Vector2;
use tracing::warn;

use crate::{InvalidRegion, Point, Region, AREA_EPSILON};

/// Turn direction at `b` for the path `a -> b -> c`: positive for a left
/// (counter-clockwise) turn.
#[inline]
fn turn(a: &Point, b: &Point, c: &Point) -> f64 {
    let ab: Vector2<f64> = b.xy() - a.xy();
    let bc: Vector2<f64> = c.xy() - b.xy();
    ab.perp(&bc)
}

impl Region {
    /// Returns `true` if every vertex turns the same way. Straight vertices
    /// are ignored.
    pub fn is_convex(&self) -> bool {
        let pts = self.points();
        let n = pts.len();
        if n < 3 {
            return false;
        }
        let (mut left, mut right) = (false, false);
        for i in 0..n {
            let t = turn(&pts[i], &pts[(i + 1) % n], &pts[(i + 2) % n]);
            if t > AREA_EPSILON {
                left = true;
            } else if t < -AREA_EPSILON {
                right = true;
            }
        }
        !(left && right)
    }

    /// Splits the region into convex pieces by repeatedly clipping ears.
    ///
    /// A convex region comes back as a single piece. Every piece is
    /// optimized and carries the original property bag.
    pub fn convex_decompose(self) -> Result<Vec<Region>, InvalidRegion> {
        let mut remainder = self.optimized()?;
        let mut pieces = Vec::new();

        loop {
            if remainder.is_convex() {
                pieces.push(remainder);
                return Ok(pieces);
            }

            let pts = remainder.points();
            let n = pts.len();
            let ear = (0..n).find(|&i| {
                let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
                turn(&pts[prev], &pts[i], &pts[next]) > AREA_EPSILON
                    && remainder.is_interior_line(prev, next)
            });

            let Some(i) = ear else {
                warn!(vertices = n, "no ear found, keeping non-convex remainder");
                pieces.push(remainder);
                return Ok(pieces);
            };

            let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
            let triangle = remainder
                .with_same_properties(vec![pts[prev].clone(), pts[i].clone(), pts[next].clone()])
                .optimized()?;
            let mut rest = pts.to_vec();
            rest.remove(i);
            remainder = remainder.with_same_properties(rest).optimized()?;
            pieces.push(triangle);
        }
    }
}

/// Merges regions that share a full edge whenever the union stays convex,
/// until no merge applies.
pub fn join_convex(mut regions: Vec<Region>) -> Vec<Region> {
    'scan: loop {
        for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                let Some(merged) = merge_along_shared_edge(&regions[i], &regions[j]) else {
                    continue;
                };
                if merged.is_convex() {
                    regions[i] = merged;
                    regions.remove(j);
                    continue 'scan;
                }
            }
        }
        return regions;
    }
}

/// Unites two counter-clockwise regions across an edge that one walks
/// `p -> q` and the other `q -> p`.
fn merge_along_shared_edge(a: &Region, b: &Region) -> Option<Region> {
    let (pa, pb) = (a.points(), b.points());
    let (n, m) = (pa.len(), pb.len());
    for k in 0..n {
        let (p, q) = (&pa[k], &pa[(k + 1) % n]);
        let Some(mi) = (0..m).find(|&mi| pb[mi].approx_eq(q) && pb[(mi + 1) % m].approx_eq(p))
        else {
            continue;
        };

        // Walk `a` from q round to p, then `b` past p round to just before q.
        let mut merged = Vec::with_capacity(n + m - 2);
        merged.extend((0..n).map(|s| pa[(k + 1 + s) % n].clone()));
        merged.extend((0..m - 2).map(|s| pb[(mi + 2 + s) % m].clone()));
        return a.with_same_properties(merged).optimized().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> Region {
        Region::from_coords(&[
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (1.0, 2.0),
            (0.0, 2.0),
        ])
    }

    #[test]
    fn convexity() {
        let square = Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(square.is_convex());
        // Clockwise squares are convex too
        let cw = Region::from_coords(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        assert!(cw.is_convex());
        assert!(!l_shape().is_convex());
    }

    #[test]
    fn convex_region_is_its_own_decomposition() {
        let triangle = Region::from_coords(&[(0.0, 0.0), (3.0, 0.0), (0.0, 3.0)]);
        let pieces = triangle.convex_decompose().unwrap();
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn l_shape_decomposes_into_convex_pieces() {
        let mut l = l_shape();
        l.set_property("kind", "floor");
        let pieces = l.convex_decompose().unwrap();

        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(Region::is_convex));
        assert!(pieces.iter().all(|p| p.signed_area() > 0.0));
        assert!(pieces.iter().all(|p| p.property::<&str>("kind") == Some(&"floor")));
        let total: f64 = pieces.iter().map(Region::area).sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn join_merges_back_to_fewer_convex_pieces() {
        let pieces = l_shape().convex_decompose().unwrap();
        let joined = join_convex(pieces.clone());

        assert!(joined.len() < pieces.len());
        assert!(joined.iter().all(Region::is_convex));
        let total: f64 = joined.iter().map(Region::area).sum();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn join_adjacent_squares_into_rectangle() {
        let a = Region::from_coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let b = Region::from_coords(&[(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)]);
        let joined = join_convex(vec![a, b]);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].len(), 4);
        assert!((joined[0].area() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn join_keeps_non_convex_unions_apart() {
        let a = Region::from_coords(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]);
        let b = Region::from_coords(&[(0.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)]);
        // They share only part of an edge, and the union is an L
        let joined = join_convex(vec![a, b]);
        assert_eq!(joined.len(), 2);
    }
}
