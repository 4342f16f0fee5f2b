//! Fit predicate and subdivision geometry.
//!
//! A block is always placed at the origin corner of its region. The free space
//! that remains is described by three slabs:
//!
//! ```text
//!  length-leftover: (b.length,            B.width - b.width, b.height)
//!  width-leftover:  (B.length - b.length, b.width,           b.height)
//!  height-leftover: (B.length,            B.width,           B.height - b.height)
//! ```
//!
//! The first two slabs sit beside the block on the floor of the region, the
//! third spans the whole region above the block. They never overlap.

use std::cmp::Ordering;

use crate::types::Dims;

/// Checks whether `block` fits into `region`.
///
/// Every extent of the block must be strictly smaller than the matching extent
/// of the region. Equal extents are rejected, so a placement never produces a
/// leftover with a zero extent through the fit itself.
#[inline]
pub fn fits(block: &Dims, region: &Dims) -> bool {
    block.strictly_within(region)
}

/// The three leftover slabs of a region after a block was placed in it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leftovers {
    pub length: Dims,
    pub width: Dims,
    pub height: Dims,
    /// Whether the length-leftover is offered before the width-leftover.
    pub length_first: bool,
}

impl Leftovers {
    /// Returns the slabs in the order they are inserted into the pool.
    ///
    /// The floor slab with the larger footprint comes first; the slab above
    /// the block always comes last.
    pub fn in_insertion_order(&self) -> [Dims; 3] {
        if self.length_first {
            [self.length, self.width, self.height]
        } else {
            [self.width, self.length, self.height]
        }
    }

    /// Sum of the three slab volumes.
    #[cfg(test)]
    pub fn total_volume(&self) -> f64 {
        self.length.volume() + self.width.volume() + self.height.volume()
    }
}

/// Splits `region` into the three leftover slabs around `block`.
pub fn subdivide(block: &Dims, region: &Dims) -> Leftovers {
    let gap = *region - *block;

    let length = Dims::new(block.length, gap.width, block.height);
    let width = Dims::new(gap.length, block.width, block.height);
    let height = Dims::new(region.length, region.width, gap.height);

    // Compares the footprints of the full-length strip along the width gap
    // and the full-width strip along the length gap.
    let length_strip = gap.width * region.length;
    let width_strip = gap.length * region.width;
    let length_first = !matches!(
        length_strip.partial_cmp(&width_strip),
        Some(Ordering::Less)
    );

    Leftovers {
        length,
        width,
        height,
        length_first,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn fit_requires_strict_inequality_on_every_axis() {
        let region = Dims::new(10.0, 10.0, 10.0);
        assert!(fits(&Dims::new(9.9, 9.9, 9.9), &region));
        assert!(!fits(&Dims::new(10.0, 10.0, 10.0), &region));
        assert!(!fits(&Dims::new(10.0, 5.0, 5.0), &region));
        assert!(!fits(&Dims::new(5.0, 10.0, 5.0), &region));
        assert!(!fits(&Dims::new(5.0, 5.0, 10.0), &region));
        assert!(!fits(&Dims::new(11.0, 1.0, 1.0), &region));
    }

    #[test]
    fn fit_never_matches_degenerate_regions() {
        let block = Dims::new(0.0, 0.0, 0.0);
        assert!(!fits(&block, &Dims::new(0.0, 5.0, 5.0)));
        assert!(!fits(&block, &Dims::new(5.0, -1.0, 5.0)));
    }

    #[test]
    fn subdivide_cube_in_cube() {
        let leftovers = subdivide(&Dims::new(5.0, 5.0, 5.0), &Dims::new(10.0, 10.0, 10.0));
        assert_eq!(leftovers.length, Dims::new(5.0, 5.0, 5.0));
        assert_eq!(leftovers.width, Dims::new(5.0, 5.0, 5.0));
        assert_eq!(leftovers.height, Dims::new(10.0, 10.0, 5.0));
        assert!(leftovers.length_first, "equal footprints keep length first");
    }

    #[test]
    fn subdivide_never_exceeds_parent_volume() {
        let cases = [
            (Dims::new(3.0, 4.0, 5.0), Dims::new(10.0, 9.0, 8.0)),
            (Dims::new(1.0, 1.0, 1.0), Dims::new(2.0, 3.0, 4.0)),
            (Dims::new(7.5, 0.5, 2.25), Dims::new(8.0, 12.0, 3.0)),
            (Dims::new(9.0, 9.0, 9.0), Dims::new(9.5, 9.5, 9.5)),
            (Dims::new(5.0, 5.0, 5.0), Dims::new(10.0, 10.0, 10.0)),
        ];
        for (block, region) in cases {
            let leftovers = subdivide(&block, &region);
            let total = leftovers.total_volume() + block.volume();
            let tolerance = EPSILON * region.volume().max(1.0);
            assert!(
                total <= region.volume() + tolerance,
                "leftovers exceed parent for block {:?} in {:?}: {} vs {}",
                block,
                region,
                total,
                region.volume()
            );

            // The floor corner diagonal to the block is not part of any slab.
            let gap = region - block;
            let uncovered = gap.length * gap.width * block.height;
            assert!(
                (region.volume() - total - uncovered).abs() < tolerance,
                "unexpected uncovered volume for block {:?} in {:?}",
                block,
                region
            );
        }
    }

    #[test]
    fn cube_in_cube_leaves_corner_uncovered() {
        let block = Dims::new(5.0, 5.0, 5.0);
        let region = Dims::new(10.0, 10.0, 10.0);
        let total = subdivide(&block, &region).total_volume() + block.volume();
        assert!((total - 875.0).abs() < EPSILON);
        assert!(total <= region.volume());
    }

    #[test]
    fn larger_floor_slab_is_offered_first() {
        // Width gap 8 along length 10 = 80, length gap 2 along width 10 = 20.
        let leftovers = subdivide(&Dims::new(8.0, 2.0, 1.0), &Dims::new(10.0, 10.0, 10.0));
        assert!(leftovers.length_first);
        let order = leftovers.in_insertion_order();
        assert_eq!(order[0], Dims::new(8.0, 8.0, 1.0));
        assert_eq!(order[1], Dims::new(2.0, 2.0, 1.0));
        assert_eq!(order[2], Dims::new(10.0, 10.0, 9.0));

        // Width gap 2 along length 10 = 20, length gap 8 along width 10 = 80.
        let leftovers = subdivide(&Dims::new(2.0, 8.0, 1.0), &Dims::new(10.0, 10.0, 10.0));
        assert!(!leftovers.length_first);
        let order = leftovers.in_insertion_order();
        assert_eq!(order[0], Dims::new(8.0, 8.0, 1.0));
        assert_eq!(order[1], Dims::new(2.0, 2.0, 1.0));
    }

    #[test]
    fn exact_width_produces_zero_width_leftover() {
        let leftovers = subdivide(&Dims::new(2.0, 10.0, 2.0), &Dims::new(5.0, 10.0, 5.0));
        assert!(leftovers.length.is_degenerate());
        assert!(!leftovers.width.is_degenerate());
        assert!(!leftovers.height.is_degenerate());
    }
}
