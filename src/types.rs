//! Common dimension types shared by boxes, blocks and pool regions.
//!
//! Every record in the packing run is an axis-aligned cuboid described by
//! length, width and height. Blocks are never rotated, so the three axes are
//! always compared component-wise.

use std::cmp::Ordering;
use std::ops::Sub;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Extent of a cuboid along its three axes.
///
/// Field names match the wire format of the box and block data sets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dims {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dims {
    #[inline]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Calculates the volume (length × width × height).
    #[allow(dead_code)]
    #[inline]
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Returns `true` when at least one extent is zero, negative or NaN.
    ///
    /// Such a region can never house a block under the strict fit rule.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.length > 0.0 && self.width > 0.0 && self.height > 0.0)
    }

    /// Checks that every component is strictly smaller than the matching
    /// component of `container`. Touching a wall does not count as fitting.
    #[inline]
    pub fn strictly_within(&self, container: &Self) -> bool {
        self.length < container.length
            && self.width < container.width
            && self.height < container.height
    }
}

impl Sub for Dims {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(
            self.length - rhs.length,
            self.width - rhs.width,
            self.height - rhs.height,
        )
    }
}

impl From<(f64, f64, f64)> for Dims {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }
}

/// Trait for objects with a cuboid extent.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dims(&self) -> Dims;

    fn height(&self) -> f64 {
        self.dims().height
    }
}

impl Dimensional for Dims {
    fn dims(&self) -> Dims {
        *self
    }
}

/// Orders records by descending height.
///
/// This is the single ordering used for the block sequence and for the box
/// pool. It is a total order: a positive NaN height sorts before every number
/// and a negative NaN after every number.
pub fn by_height_desc<T: Dimensional>(a: &T, b: &T) -> Ordering {
    b.height().total_cmp(&a.height())
}

/// Validation functions used by the loader and the API layer.
pub mod validation {
    use super::Dims;

    /// Validates a single extent.
    ///
    /// # Returns
    /// `Ok(())` for finite, non-negative values, otherwise error text
    pub fn validate_extent(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value < 0.0 {
            return Err(format!("{} must not be negative, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates all three extents of a cuboid.
    pub fn validate_dims(dims: &Dims) -> Result<(), String> {
        validate_extent(dims.length, "Length")?;
        validate_extent(dims.width, "Width")?;
        validate_extent(dims.height, "Height")?;
        Ok(())
    }
}
