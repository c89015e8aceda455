//! Data models for the warehouse occupancy layout.
//!
//! This module defines the records flowing into and out of the layout engine:
//! - `CategoryVolume`: one material category and the volume it holds
//! - `WarehouseBounds`: interior dimensions of the warehouse
//! - `Placement`: a computed box for one category
//!
//! Output records borrow the category name from the input slice, so a layout
//! never outlives the snapshot it was computed from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Extended, Vec3};

/// Validation error for layout input data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
    #[error("Duplicate category: '{0}'")]
    DuplicateCategory(String),
    #[error("Category '{0}' needs either a volume or a mass")]
    MissingQuantity(String),
    #[error("Category '{0}' must not specify both volume and mass")]
    AmbiguousQuantity(String),
}

fn validate_bound(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidBounds(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// One material category and the volume it currently occupies.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryVolume {
    pub name: String,
    pub volume: f64,
}

impl CategoryVolume {
    pub fn new(name: impl Into<String>, volume: f64) -> Self {
        Self {
            name: name.into(),
            volume,
        }
    }
}

/// A category recorded by mass, as reported by inventory records.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryMass {
    pub name: String,
    pub mass_kg: f64,
}

impl CategoryMass {
    /// Converts the stored mass into a volume using a fixed bulk density.
    ///
    /// # Examples
    /// ```
    /// use warehouse_layout::model::CategoryMass;
    ///
    /// let steel = CategoryMass { name: "steel".into(), mass_kg: 2000.0 };
    /// let record = steel.into_volume(1000.0);
    /// assert_eq!(record.volume, 2.0);
    /// ```
    pub fn into_volume(self, kg_per_cubic_meter: f64) -> CategoryVolume {
        CategoryVolume {
            name: self.name,
            volume: self.mass_kg / kg_per_cubic_meter,
        }
    }
}

/// Checks that a category snapshot has unique names and finite volumes.
///
/// The layout engine itself accepts anything; this is for input boundaries.
pub fn validate_categories(categories: &[CategoryVolume]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(categories.len());
    for category in categories {
        if !category.volume.is_finite() {
            return Err(ValidationError::InvalidVolume(format!(
                "volume of '{}' must be finite, got: {}",
                category.name, category.volume
            )));
        }
        if !seen.insert(category.name.as_str()) {
            return Err(ValidationError::DuplicateCategory(category.name.clone()));
        }
    }
    Ok(())
}

/// Interior dimensions of a warehouse.
///
/// The warehouse is an axis-aligned box centered at the origin on the X/Z
/// plane, resting on Y = 0. `length` runs along X, `width` along Z and
/// `height` along Y.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "length": 40.0, "width": 25.0, "height": 8.0 }))]
pub struct WarehouseBounds {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl WarehouseBounds {
    /// Creates validated bounds.
    ///
    /// # Examples
    /// ```
    /// use warehouse_layout::model::WarehouseBounds;
    ///
    /// assert!(WarehouseBounds::new(10.0, 10.0, 2.0).is_ok());
    /// assert!(WarehouseBounds::new(10.0, 0.0, 2.0).is_err());
    /// ```
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        let bounds = Self {
            length,
            width,
            height,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Re-checks bounds that were built without `new` (e.g. deserialized).
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_bound(self.length, "Length")?;
        validate_bound(self.width, "Width")?;
        validate_bound(self.height, "Height")?;
        Ok(())
    }

    /// Gross volume of the warehouse.
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Dimensions as (x, y, z) = (length, height, width).
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.length, self.height, self.width)
    }
}

/// A computed box for one category.
///
/// # Fields
/// * `category` - Name of the source category, borrowed from the input
/// * `center` - Geometric center of the box
/// * `extent` - Full size as (length, height, width)
/// * `volume` - The input volume, carried through unchanged
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Placement<'a> {
    pub category: &'a str,
    pub center: Vec3,
    pub extent: Vec3,
    pub volume: f64,
}

impl Placement<'_> {
    /// Lower corner of the box (smallest x, y and z).
    #[inline]
    pub fn min_corner(&self) -> Vec3 {
        self.center - self.extent * 0.5
    }

    /// Converts into an owned record for serialization.
    pub fn to_owned_view(&self) -> PlacementView {
        PlacementView {
            category: self.category.to_string(),
            center: self.center.as_tuple(),
            extent: self.extent.as_tuple(),
            volume: self.volume,
        }
    }
}

impl Extended for Placement<'_> {
    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center_and_extent(self.center, self.extent)
    }
}

/// Owned copy of a placement, as returned over HTTP.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PlacementView {
    pub category: String,
    #[schema(value_type = [f64; 3], example = json!([-3.2, 0.9, -2.1]))]
    pub center: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([2.2, 1.6, 2.2]))]
    pub extent: (f64, f64, f64),
    pub volume: f64,
}
