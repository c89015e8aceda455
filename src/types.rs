//! Common types and traits for 3D geometry.
//!
//! The layout engine works in a Y-up coordinate frame: X is the warehouse
//! length, Y the height and Z the width (depth) axis.

use std::ops::{Add, Mul, Sub};

use serde::Serialize;

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in space.
///
/// Used for centers, extents and corner positions.
///
/// # Examples
/// ```
/// use warehouse_layout::types::Vec3;
///
/// let min = Vec3::new(1.0, 2.0, 3.0);
/// let extent = Vec3::new(10.0, 20.0, 30.0);
/// let center = min + extent * 0.5;
/// assert_eq!(center, Vec3::new(6.0, 12.0, 18.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Creates a vector with the same value in every component.
    #[inline]
    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Product of all components. Useful for extent vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Smallest of the three components.
    #[inline]
    pub fn min_component(&self) -> f64 {
        self.x.min(self.y).min(self.z)
    }

    /// Checks if all components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    #[inline]
    pub fn fits_within(&self, container: &Self, tolerance: f64) -> bool {
        self.x <= container.x + tolerance
            && self.y <= container.y + tolerance
            && self.z <= container.z + tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

impl From<Vec3> for (f64, f64, f64) {
    #[inline]
    fn from(vec: Vec3) -> Self {
        vec.as_tuple()
    }
}

/// Trait for anything occupying an axis-aligned box in space.
pub trait Extended {
    /// Returns the axis-aligned box occupied by the object.
    fn bounding_box(&self) -> BoundingBox;

    /// Volume of the occupied box.
    fn volume(&self) -> f64 {
        self.bounding_box().extent().volume()
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from its minimum corner and full extent.
    #[inline]
    pub fn from_min_and_extent(min: Vec3, extent: Vec3) -> Self {
        Self {
            min,
            max: min + extent,
        }
    }

    /// Creates a bounding box from its center and full extent.
    #[inline]
    pub fn from_center_and_extent(center: Vec3, extent: Vec3) -> Self {
        let half = extent * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Separating Axis Theorem for AABBs; boxes that only share a face do
    /// not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if `other` lies completely inside this box.
    #[inline]
    pub fn contains(&self, other: &Self, tolerance: f64) -> bool {
        other.min.x >= self.min.x - tolerance
            && other.min.y >= self.min.y - tolerance
            && other.min.z >= self.min.z - tolerance
            && other.max.x <= self.max.x + tolerance
            && other.max.y <= self.max.y + tolerance
            && other.max.z <= self.max.z + tolerance
    }

    /// Largest separation between the two boxes along any single axis.
    ///
    /// Negative when the boxes overlap on every axis.
    pub fn gap_to(&self, other: &Self) -> f64 {
        let gap_x = (other.min.x - self.max.x).max(self.min.x - other.max.x);
        let gap_y = (other.min.y - self.max.y).max(self.min.y - other.max.y);
        let gap_z = (other.min.z - self.max.z).max(self.min.z - other.max.z);
        gap_x.max(gap_y).max(gap_z)
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the full extent along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}
