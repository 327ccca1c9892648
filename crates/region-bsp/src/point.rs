//! Point representation for region geometry.

use std::fmt;

use nalgebra::{Point2, Point3};

use crate::POINT_EPSILON;

/// Coordinate space a point is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoordinateSystem {
    /// World (map) coordinates. All tree operations work in this space.
    #[default]
    World,
    /// Screen coordinates, as handed over by a rendering layer.
    Screen,
}

/// A 2D coordinate with an optional height and an optional name.
///
/// `PartialEq` is exact (structural) equality and is what bookkeeping uses.
/// Geometric comparisons go through [`Point::approx_eq`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    position: Point3<f64>,
    name: Option<String>,
    system: CoordinateSystem,
}

impl Point {
    /// Creates an unnamed world-space point with `z = 0`.
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_z(x, y, 0.0)
    }

    /// Creates an unnamed world-space point with an explicit height.
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
            name: None,
            system: CoordinateSystem::World,
        }
    }

    /// Creates a named world-space point.
    pub fn named(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(x, y)
        }
    }

    /// Returns the same point tagged with another coordinate system.
    pub fn in_system(mut self, system: CoordinateSystem) -> Self {
        self.system = system;
        self
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.system
    }

    /// Projection onto the XY plane, used by every 2D predicate.
    #[inline]
    pub fn xy(&self) -> Point2<f64> {
        self.position.xy()
    }

    /// Returns the full 3D position.
    #[inline]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Planar (XY) distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        nalgebra::distance(&self.xy(), &other.xy())
    }

    /// Geometric equality within [`POINT_EPSILON`] on both axes.
    #[inline]
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x() - other.x()).abs() < POINT_EPSILON && (self.y() - other.y()).abs() < POINT_EPSILON
    }
}

impl From<Point2<f64>> for Point {
    fn from(p: Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}({}, {})", self.x(), self.y()),
            None => write!(f, "({}, {})", self.x(), self.y()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_planar() {
        let a = Point::with_z(0.0, 0.0, 5.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn approx_eq_tolerates_noise_but_eq_is_exact() {
        let a = Point::new(1.0, 1.0);
        let b = Point::new(1.0 + 1e-7, 1.0 - 1e-7);
        assert!(a.approx_eq(&b));
        assert_ne!(a, b);
        assert!(!a.approx_eq(&Point::new(1.001, 1.0)));
    }

    #[test]
    fn names_and_systems_take_part_in_exact_equality() {
        let plain = Point::new(2.0, 3.0);
        let named = Point::named("gate", 2.0, 3.0);
        assert_eq!(named.name(), Some("gate"));
        assert_ne!(plain, named);
        assert!(plain.approx_eq(&named));

        let screen = plain.clone().in_system(CoordinateSystem::Screen);
        assert_eq!(screen.coordinate_system(), CoordinateSystem::Screen);
        assert_ne!(plain, screen);
    }

    #[test]
    fn display_includes_name() {
        assert_eq!(Point::named("a", 1.0, 2.0).to_string(), "a(1, 2)");
        assert_eq!(Point::new(1.5, -2.0).to_string(), "(1.5, -2)");
    }
}
