//! Classification of point sets against a partition line.

use crate::{colinear, side_of_line, Point, Region, SIDE_EPSILON};

/// Which side of a line a single point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSide {
    /// Left of the directed line (negative side value)
    Left,
    /// Right of the directed line (positive side value)
    Right,
    /// On the line (colinear within tolerance)
    On,
}

/// Classifies a single point against the directed line `a -> b`.
pub fn classify_point(point: &Point, a: &Point, b: &Point) -> LineSide {
    if colinear(a, b, point) {
        return LineSide::On;
    }
    if side_of_line(point, a, b) < 0.0 {
        LineSide::Left
    } else {
        LineSide::Right
    }
}

/// Classification of a whole point set (usually a region) relative to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// All significant points are left of the line
    Left,
    /// All significant points are right of the line
    Right,
    /// Every point is on the line
    Colinear,
    /// Points lie on both sides
    Straddling,
}

/// Points bucketed into left, right and indeterminate (on-line) sets.
///
/// Each side accumulates the magnitude of [`side_of_line`] for its points.
/// A side whose total weight stays below [`SIDE_EPSILON`] is folded into the
/// indeterminate bucket by [`PointSides::validate`], so near-colinear noise
/// never turns a touching region into a straddling one.
#[derive(Debug, Clone, Default)]
pub struct PointSides {
    left: Vec<Point>,
    right: Vec<Point>,
    indeterminate: Vec<Point>,
    left_weight: f64,
    right_weight: f64,
}

impl PointSides {
    /// Buckets `points` against the directed line `a -> b` and validates.
    pub fn classify<'a>(a: &Point, b: &Point, points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut sides = Self::default();
        for point in points {
            if colinear(a, b, point) {
                sides.indeterminate.push(point.clone());
                continue;
            }
            let value = side_of_line(point, a, b);
            if value < 0.0 {
                sides.left.push(point.clone());
                sides.left_weight += value.abs();
            } else if value > 0.0 {
                sides.right.push(point.clone());
                sides.right_weight += value;
            } else {
                sides.indeterminate.push(point.clone());
            }
        }
        sides.validate();
        sides
    }

    /// Buckets every vertex of `region` against the directed line `a -> b`.
    #[inline]
    pub fn of_region(a: &Point, b: &Point, region: &Region) -> Self {
        Self::classify(a, b, region.points())
    }

    /// Folds a side whose weight is below [`SIDE_EPSILON`] into the
    /// indeterminate bucket.
    pub fn validate(&mut self) {
        if !self.left.is_empty() && self.left_weight < SIDE_EPSILON {
            self.indeterminate.append(&mut self.left);
            self.left_weight = 0.0;
        }
        if !self.right.is_empty() && self.right_weight < SIDE_EPSILON {
            self.indeterminate.append(&mut self.right);
            self.right_weight = 0.0;
        }
    }

    #[inline]
    pub fn left(&self) -> &[Point] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Point] {
        &self.right
    }

    #[inline]
    pub fn indeterminate(&self) -> &[Point] {
        &self.indeterminate
    }

    #[inline]
    pub fn left_weight(&self) -> f64 {
        self.left_weight
    }

    #[inline]
    pub fn right_weight(&self) -> f64 {
        self.right_weight
    }

    /// Returns `true` if some points lie on the line.
    #[inline]
    pub fn touches_line(&self) -> bool {
        !self.indeterminate.is_empty()
    }

    pub fn classification(&self) -> Classification {
        match (self.left.is_empty(), self.right.is_empty()) {
            (false, false) => Classification::Straddling,
            (false, true) => Classification::Left,
            (true, false) => Classification::Right,
            (true, true) => Classification::Colinear,
        }
    }
}

/// Classifies `points` against the line `a -> b`. See [`PointSides::classify`].
#[inline]
pub fn point_side_list<'a>(
    a: &Point,
    b: &Point,
    points: impl IntoIterator<Item = &'a Point>,
) -> PointSides {
    PointSides::classify(a, b, points)
}
