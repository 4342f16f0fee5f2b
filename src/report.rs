//! Aggregation of a packing run into output mappings and console reports.
//!
//! The engine leaves its results on the individual records. This module
//! reduces them into plain owned maps once the run is finished:
//! - box id → ids of all blocks housed in the box or any of its leftovers
//! - block id → id of the box that houses it

use std::collections::BTreeMap;

use serde::Serialize;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::model::BlockRecord;
use crate::optimizer::PackingResult;

/// Box and block assignments of a run.
///
/// Every box appears in `box_mapping`, boxes without blocks map to an empty
/// list. Only placed blocks appear in `block_mapping`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "Boxmapping": { "B1": ["b1"], "B2": [] },
    "Blockmapping": { "b1": "B1" }
}))]
pub struct Mappings {
    #[serde(rename = "Boxmapping")]
    pub box_mapping: BTreeMap<String, Vec<String>>,
    #[serde(rename = "Blockmapping")]
    pub block_mapping: BTreeMap<String, String>,
}

impl Mappings {
    /// Builds both mappings from the final record set of a run.
    pub fn from_result(result: &PackingResult) -> Self {
        let mut box_mapping: BTreeMap<String, Vec<String>> = result
            .containers
            .iter()
            .map(|record| (record.id.clone(), Vec::new()))
            .collect();

        // Regions of one container share its id, so their lists are merged.
        for region in &result.pool {
            if let Some(blocks) = box_mapping.get_mut(result.region_id(region)) {
                blocks.extend(region.assigned.iter().cloned());
            }
        }

        let block_mapping = result
            .blocks
            .iter()
            .filter_map(|block| {
                block
                    .box_id()
                    .map(|box_id| (block.id().to_string(), box_id.to_string()))
            })
            .collect();

        Self {
            box_mapping,
            block_mapping,
        }
    }
}

/// Key/value report of all blocks that did not fit, keyed by a headline such
/// as `"3 blocks did not fit"`.
pub fn missed_report(result: &PackingResult) -> BTreeMap<String, Vec<BlockRecord>> {
    let missed: Vec<BlockRecord> = result.missed().map(|block| block.record.clone()).collect();
    let mut report = BTreeMap::new();
    report.insert(format!("{} blocks did not fit", missed.len()), missed);
    report
}

/// Key figures of a run.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct RunSummary {
    pub boxes: usize,
    pub used_boxes: usize,
    pub blocks: usize,
    pub placed: usize,
    pub missed: usize,
    /// Number of regions in the pool after the run (boxes plus leftovers).
    pub pool_size: usize,
    pub placement_rate_percent: f64,
}

impl RunSummary {
    pub fn from_result(result: &PackingResult) -> Self {
        Self {
            boxes: result.containers.len(),
            used_boxes: result.used_container_count(),
            blocks: result.blocks.len(),
            placed: result.placed_count(),
            missed: result.missed_count(),
            pool_size: result.pool.len(),
            placement_rate_percent: result.placement_rate_percent(),
        }
    }
}

/// Renders the missed report followed by the mappings as pretty JSON.
pub fn render_report(result: &PackingResult) -> Result<String, serde_json::Error> {
    let missed = serde_json::to_string_pretty(&missed_report(result))?;
    let mappings = serde_json::to_string_pretty(&Mappings::from_result(result))?;
    Ok(format!("{missed}\n{mappings}"))
}

/// Renders the report and prints it unless `hide_output` is set.
///
/// Rendering happens either way, so timing a hidden run still covers the
/// aggregation work.
pub fn print_report(result: &PackingResult, hide_output: bool) -> Result<(), serde_json::Error> {
    let rendered = render_report(result)?;
    if !hide_output {
        println!("{rendered}");
    }
    Ok(())
}
