//! Data models for the block-to-box assignment.
//!
//! This module defines the records that flow through a packing run:
//! - `BoxRecord`: A physical container as loaded from the box data set
//! - `BlockRecord`: An item to be housed, as loaded from the block data set
//! - `Region`: A free sub-space of a container, kept in the candidate pool
//! - `Block`: A block together with its placement state during a run

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dims, validation};

/// Validation error for loaded records.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDimension(String),
    MissingIdentifier(String),
    DuplicateIdentifier(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::MissingIdentifier(msg) => write!(f, "Missing identifier: {}", msg),
            ValidationError::DuplicateIdentifier(msg) => {
                write!(f, "Duplicate identifier: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A record with a category-unique identifier and a cuboid extent.
pub trait Record: Dimensional {
    /// Human-readable category name used in error messages.
    const CATEGORY: &'static str;

    fn id(&self) -> &str;
}

/// A container from the box data set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "boxid": "B1", "length": 10.0, "width": 10.0, "height": 10.0 }))]
pub struct BoxRecord {
    #[serde(rename = "boxid")]
    pub id: String,
    #[serde(flatten)]
    pub dims: Dims,
}

impl BoxRecord {
    /// Creates a new box after validating its dimensions.
    #[allow(dead_code)]
    pub fn new(id: impl Into<String>, dims: Dims) -> Result<Self, ValidationError> {
        let record = Self {
            id: id.into(),
            dims,
        };
        validate_record(&record)?;
        Ok(record)
    }
}

impl Dimensional for BoxRecord {
    fn dims(&self) -> Dims {
        self.dims
    }
}

impl Record for BoxRecord {
    const CATEGORY: &'static str = "box";

    fn id(&self) -> &str {
        &self.id
    }
}

/// An item from the block data set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "blockid": "b1", "length": 5.0, "width": 5.0, "height": 5.0 }))]
pub struct BlockRecord {
    #[serde(rename = "blockid")]
    pub id: String,
    #[serde(flatten)]
    pub dims: Dims,
}

impl BlockRecord {
    /// Creates a new block after validating its dimensions.
    #[allow(dead_code)]
    pub fn new(id: impl Into<String>, dims: Dims) -> Result<Self, ValidationError> {
        let record = Self {
            id: id.into(),
            dims,
        };
        validate_record(&record)?;
        Ok(record)
    }
}

impl Dimensional for BlockRecord {
    fn dims(&self) -> Dims {
        self.dims
    }
}

impl Record for BlockRecord {
    const CATEGORY: &'static str = "block";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Checks a single record: non-empty identifier, finite non-negative extents.
pub fn validate_record<R: Record>(record: &R) -> Result<(), ValidationError> {
    if record.id().trim().is_empty() {
        return Err(ValidationError::MissingIdentifier(format!(
            "every {} needs a non-empty id",
            R::CATEGORY
        )));
    }
    validation::validate_dims(&record.dims()).map_err(|msg| {
        ValidationError::InvalidDimension(format!("{} '{}': {}", R::CATEGORY, record.id(), msg))
    })
}

/// Validates every record and checks identifier uniqueness within the category.
pub fn validate_records<R: Record>(records: &[R]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        validate_record(record)?;
        if !seen.insert(record.id()) {
            return Err(ValidationError::DuplicateIdentifier(format!(
                "{} id '{}' occurs more than once",
                R::CATEGORY,
                record.id()
            )));
        }
    }
    Ok(())
}

/// Non-owning reference to a container in the run's container table.
///
/// All regions carved out of the same physical box share one `ContainerRef`,
/// so they resolve to the same box identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerRef(usize);

impl ContainerRef {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// A free sub-space of a container.
///
/// The original boxes enter the pool as regions covering the whole container;
/// every placement adds up to three leftover regions of the same container.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub container: ContainerRef,
    pub dims: Dims,
    /// Blocks placed directly into this region, in placement order.
    pub assigned: Vec<String>,
}

impl Region {
    pub fn new(container: ContainerRef, dims: Dims) -> Self {
        Self {
            container,
            dims,
            assigned: Vec::new(),
        }
    }

    /// A region that already houses a block is not offered again; its free
    /// space lives on in the leftover regions.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        !self.assigned.is_empty()
    }
}

impl Dimensional for Region {
    fn dims(&self) -> Dims {
        self.dims
    }
}

/// A block together with its placement state.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub record: BlockRecord,
    /// Box ids this block was assigned to. Holds at most one entry.
    pub assigned: Vec<String>,
    pub placed: bool,
}

impl Block {
    pub fn new(record: BlockRecord) -> Self {
        Self {
            record,
            assigned: Vec::new(),
            placed: false,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Box the block was placed into, if any.
    pub fn box_id(&self) -> Option<&str> {
        self.assigned.first().map(String::as_str)
    }
}

impl Dimensional for Block {
    fn dims(&self) -> Dims {
        self.record.dims
    }
}
