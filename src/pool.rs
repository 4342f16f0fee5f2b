//! Candidate pool of free regions, kept sorted by descending height.
//!
//! The placement loop stops scanning as soon as a block is taller than the
//! current region. That early exit is only sound while the pool is sorted, so
//! the ordering and the insertion routine live together in this module and
//! the underlying vector is never exposed mutably.

use crate::model::Region;
use crate::types::{Dimensional, by_height_desc};

/// Height comparison shared by the scan cut-off, the insertion search and the
/// sort in `by_height_desc`.
///
/// Uses the IEEE total order, so NaN heights have a fixed position and the
/// pool stays sorted even when malformed regions are present.
#[inline]
pub fn is_taller(a: f64, b: f64) -> bool {
    a.total_cmp(&b).is_gt()
}

/// Ordered container of regions (tallest first).
#[derive(Clone, Debug, Default)]
pub struct SortedPool {
    regions: Vec<Region>,
}

impl SortedPool {
    /// Builds a pool from regions in arbitrary order.
    ///
    /// The sort is stable, so regions of equal height keep their input order.
    /// `capacity` is reserved up front because every placement grows the pool.
    pub fn from_unsorted(mut regions: Vec<Region>, capacity: usize) -> Self {
        regions.sort_by(by_height_desc);
        regions.reserve(capacity.saturating_sub(regions.len()));
        Self { regions }
    }

    /// Index at which a region of the given height must be inserted.
    ///
    /// This is the first position whose region is strictly lower than
    /// `height`, so a new region lands behind all regions of equal height.
    pub fn insertion_index(&self, height: f64) -> usize {
        self.regions.partition_point(|r| !is_taller(height, r.height()))
    }

    /// Inserts a region at its sorted position and returns that position.
    pub fn insert(&mut self, region: Region) -> usize {
        let pos = self.insertion_index(region.height());
        self.regions.insert(pos, region);
        debug_assert!(self.is_sorted(), "pool lost its height ordering");
        pos
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Mutable access for recording placements.
    ///
    /// Only the assignment list may be touched through this reference; the
    /// dimensions of a region are fixed once it is in the pool.
    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Region> {
        self.regions.get_mut(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[allow(dead_code)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Checks the descending-height invariant.
    pub fn is_sorted(&self) -> bool {
        self.regions
            .windows(2)
            .all(|pair| !is_taller(pair[1].height(), pair[0].height()))
    }

    pub fn into_vec(self) -> Vec<Region> {
        self.regions
    }
}

impl<'a> IntoIterator for &'a SortedPool {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
