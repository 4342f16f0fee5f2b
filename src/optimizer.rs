//! First-Fit-Decreasing placement engine with recursive space subdivision.
//!
//! Blocks are processed tallest first. Each block goes into the first region of
//! the candidate pool that strictly contains it. The remaining free space of
//! that region is split into three leftover regions which are inserted back
//! into the pool at their sorted positions, so later (smaller) blocks can use
//! them. The engine is single-threaded and keeps no state between runs.

use serde::Serialize;

use crate::geometry::{fits, subdivide};
use crate::model::{Block, BlockRecord, BoxRecord, ContainerRef, Region};
use crate::pool::{SortedPool, is_taller};
use crate::types::{Dimensional, Dims, by_height_desc};

/// Configuration for the packing engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Drop leftovers with a zero or negative extent instead of inserting them.
    pub prune_degenerate_leftovers: bool,
    /// Initial pool capacity as a multiple of the number of boxes.
    pub pool_capacity_factor: usize,
}

impl PackingConfig {
    pub const DEFAULT_PRUNE_DEGENERATE_LEFTOVERS: bool = false;
    pub const DEFAULT_POOL_CAPACITY_FACTOR: usize = 3;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            prune_degenerate_leftovers: Self::DEFAULT_PRUNE_DEGENERATE_LEFTOVERS,
            pool_capacity_factor: Self::DEFAULT_POOL_CAPACITY_FACTOR,
        }
    }
}

/// Builder for `PackingConfig`.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    pub fn prune_degenerate_leftovers(mut self, prune: bool) -> Self {
        self.config.prune_degenerate_leftovers = prune;
        self
    }

    pub fn pool_capacity_factor(mut self, factor: usize) -> Self {
        self.config.pool_capacity_factor = factor;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Outcome of a packing run.
///
/// `containers` is the container table that every `ContainerRef` indexes,
/// `pool` holds all regions (original boxes and leftovers) in final pool order
/// and `blocks` holds every block in processing order.
#[derive(Clone, Debug)]
pub struct PackingResult {
    pub containers: Vec<BoxRecord>,
    pub pool: Vec<Region>,
    pub blocks: Vec<Block>,
}

impl PackingResult {
    /// Resolves a container reference to its box identifier.
    pub fn container_id(&self, container: ContainerRef) -> &str {
        self.containers
            .get(container.index())
            .map(|record| record.id.as_str())
            .unwrap_or_default()
    }

    /// Box identifier of a pool region.
    pub fn region_id(&self, region: &Region) -> &str {
        self.container_id(region.container)
    }

    /// Blocks that could not be placed.
    pub fn missed(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|block| !block.placed)
    }

    pub fn placed_count(&self) -> usize {
        self.blocks.iter().filter(|block| block.placed).count()
    }

    pub fn missed_count(&self) -> usize {
        self.blocks.len() - self.placed_count()
    }

    /// Indicates whether all blocks were placed.
    pub fn is_complete(&self) -> bool {
        self.blocks.iter().all(|block| block.placed)
    }

    /// Number of containers that received at least one block.
    pub fn used_container_count(&self) -> usize {
        let mut used = vec![false; self.containers.len()];
        for region in self.pool.iter().filter(|r| r.is_consumed()) {
            if let Some(flag) = used.get_mut(region.container.index()) {
                *flag = true;
            }
        }
        used.into_iter().filter(|flag| *flag).count()
    }

    /// Share of placed blocks in percent (0.0 to 100.0).
    pub fn placement_rate_percent(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        (self.placed_count() as f64 / self.blocks.len() as f64) * 100.0
    }
}

/// Events emitted during a run, for live progress reporting.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A block was placed and its region subdivided.
    BlockPlaced {
        block_id: String,
        box_id: String,
        block_dims: Dims,
        region_dims: Dims,
        leftovers_inserted: usize,
        pool_size: usize,
    },
    /// No region in the pool could house the block.
    BlockMissed { block_id: String, dims: Dims },
    /// The run is complete.
    Finished {
        placed: usize,
        missed: usize,
        pool_size: usize,
    },
}

/// Packs blocks into boxes with the default configuration.
pub fn pack_blocks(boxes: Vec<BoxRecord>, blocks: Vec<BlockRecord>) -> PackingResult {
    pack_blocks_with_config(boxes, blocks, PackingConfig::default())
}

/// Packs blocks into boxes with a custom configuration.
pub fn pack_blocks_with_config(
    boxes: Vec<BoxRecord>,
    blocks: Vec<BlockRecord>,
    config: PackingConfig,
) -> PackingResult {
    pack_blocks_with_progress(boxes, blocks, config, |_| {})
}

/// Packs blocks into boxes and reports every step through `on_event`.
///
/// The input records are not validated. A block with a NaN extent never fits
/// anywhere; NaN heights sort to a fixed end of the pool, so they never break
/// its ordering.
pub fn pack_blocks_with_progress(
    boxes: Vec<BoxRecord>,
    blocks: Vec<BlockRecord>,
    config: PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let capacity = boxes
        .len()
        .saturating_mul(config.pool_capacity_factor.max(1));
    let regions = boxes
        .iter()
        .enumerate()
        .map(|(idx, record)| Region::new(ContainerRef::new(idx), record.dims))
        .collect();
    let mut pool = SortedPool::from_unsorted(regions, capacity);

    // Stable sort: blocks of equal height keep their input order.
    let mut blocks: Vec<Block> = blocks.into_iter().map(Block::new).collect();
    blocks.sort_by(by_height_desc);

    let mut placed = 0;
    for block in blocks.iter_mut() {
        match place_block(block, &mut pool, &boxes, &config) {
            Some(placement) => {
                placed += 1;
                on_event(&PackEvent::BlockPlaced {
                    block_id: block.id().to_string(),
                    box_id: boxes[placement.container.index()].id.clone(),
                    block_dims: block.dims(),
                    region_dims: placement.region_dims,
                    leftovers_inserted: placement.leftovers_inserted,
                    pool_size: pool.len(),
                });
            }
            None => on_event(&PackEvent::BlockMissed {
                block_id: block.id().to_string(),
                dims: block.dims(),
            }),
        }
    }

    on_event(&PackEvent::Finished {
        placed,
        missed: blocks.len() - placed,
        pool_size: pool.len(),
    });

    PackingResult {
        containers: boxes,
        pool: pool.into_vec(),
        blocks,
    }
}

#[derive(Clone, Copy, Debug)]
struct Placement {
    container: ContainerRef,
    region_dims: Dims,
    leftovers_inserted: usize,
}

/// Finds the first region that houses `block`, records the assignment on both
/// sides and inserts the leftovers.
fn place_block(
    block: &mut Block,
    pool: &mut SortedPool,
    containers: &[BoxRecord],
    config: &PackingConfig,
) -> Option<Placement> {
    let dims = block.dims();
    let index = find_first_fit(&dims, pool)?;

    let region = pool.get_mut(index)?;
    region.assigned.push(block.id().to_string());
    let container = region.container;
    let region_dims = region.dims;

    block.assigned.push(containers[container.index()].id.clone());
    block.placed = true;

    // The consumed region stays in the pool so its assignment is reported,
    // but only its leftovers are offered to later blocks.
    let mut leftovers_inserted = 0;
    for leftover in subdivide(&dims, &region_dims).in_insertion_order() {
        if config.prune_degenerate_leftovers && leftover.is_degenerate() {
            continue;
        }
        pool.insert(Region::new(container, leftover));
        leftovers_inserted += 1;
    }

    Some(Placement {
        container,
        region_dims,
        leftovers_inserted,
    })
}

/// Scans the pool in order and returns the index of the first fitting region.
///
/// Regions are sorted by descending height, so once the block is taller than
/// the current region no later region can house it. Consumed regions are
/// skipped.
fn find_first_fit(block: &Dims, pool: &SortedPool) -> Option<usize> {
    for (index, region) in pool.iter().enumerate() {
        if is_taller(block.height, region.dims.height) {
            return None;
        }
        if !region.is_consumed() && fits(block, &region.dims) {
            return Some(index);
        }
    }
    None
}
