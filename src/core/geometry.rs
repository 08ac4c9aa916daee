//! Grid vectors for positions and move directions.

use serde::Deserialize;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A 2D vector in map-cell units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    /// True when `other` lies within `radius` (inclusive).
    pub fn is_within(self, other: Vec2, radius: f64) -> bool {
        (self - other).length_squared() <= radius * radius
    }

    /// Component-wise closeness, the "same cell" test.
    pub fn approx_eq(self, other: Vec2, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Swaps the components: reflection about the line `y = x`.
    pub fn swapped(self) -> Self {
        Self::new(self.y, self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_check_is_inclusive() {
        let a = Vec2::new(0.0, 0.0);
        assert!(a.is_within(Vec2::new(3.0, 4.0), 5.0));
        assert!(!a.is_within(Vec2::new(3.0, 4.1), 5.0));
    }

    #[test]
    fn approx_eq_uses_component_tolerance() {
        let a = Vec2::new(2.0, 3.0);
        assert!(a.approx_eq(Vec2::new(2.005, 2.995), 1e-2));
        assert!(!a.approx_eq(Vec2::new(2.02, 3.0), 1e-2));
    }

    #[test]
    fn swap_and_negate() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(v.swapped(), Vec2::new(0.0, 1.0));
        assert_eq!(-v.swapped(), Vec2::new(0.0, -1.0));
    }
}
