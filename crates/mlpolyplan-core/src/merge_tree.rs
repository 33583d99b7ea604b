//! Merge levels between the root and the leaves.
//!
//! Every leaf output is already sorted, and each merge keeps its output sorted,
//! so a merge is a single `sort` pass over the concatenated inputs rather than
//! an independent resort of the whole range.

use serde::Serialize;
use tracing::debug;

use crate::addressing::SegmentAddresser;
use crate::error::{PlanError, Result};
use crate::graph::{Rule, RuleGraph};
use crate::types::{RuleId, SegmentId, SplitParams};

/// One generation of merge rules, from `curr_depth` targets to `next_depth` inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Level {
    pub curr_depth: u32,
    pub next_depth: u32,
    /// Inputs consumed by each rule of this level.
    pub fan_in: usize,
    pub rules: Vec<RuleId>,
}

/// Depth transitions from the root down to `segments_order`.
pub fn level_steps(segments_order: u32, incr_per_level: u32) -> Vec<(u32, u32)> {
    let mut steps = Vec::new();
    let mut curr = 0;
    while curr < segments_order {
        let next = (curr + incr_per_level).min(segments_order);
        steps.push((curr, next));
        curr = next;
    }
    steps
}

/// Splits `inputs` into `targets.len()` contiguous groups of equal size.
pub fn partition_inputs<'a>(
    targets: &[SegmentId],
    inputs: &'a [SegmentId],
) -> Result<impl Iterator<Item = &'a [SegmentId]>> {
    if targets.is_empty() || inputs.len() < targets.len() || inputs.len() % targets.len() != 0 {
        return Err(PlanError::FanInNotDivisible {
            inputs: inputs.len(),
            targets: targets.len(),
        });
    }
    Ok(inputs.chunks(inputs.len() / targets.len()))
}

/// Adds the merge rules of every level to `graph`, coarsest first, and returns
/// the levels together with the leaf identifiers they bottom out in.
pub fn build_merge_levels(
    params: &SplitParams,
    addresser: &SegmentAddresser<'_>,
    graph: &mut RuleGraph,
) -> Result<(Vec<Level>, Vec<SegmentId>)> {
    let mut levels = Vec::new();
    let mut curr_targets = addresser.level(0)?;

    for (curr_depth, next_depth) in level_steps(params.segments_order, params.incr_per_level) {
        let next_targets = addresser.level(next_depth)?;
        let groups = partition_inputs(&curr_targets, &next_targets)?;
        let fan_in = next_targets.len() / curr_targets.len();

        let mut rules = Vec::with_capacity(curr_targets.len());
        for (target, inputs) in curr_targets.iter().zip(groups) {
            rules.push(graph.add(Rule::merge(target.clone(), inputs.to_vec()))?);
        }
        debug!(
            curr_depth,
            next_depth,
            rules = rules.len(),
            fan_in,
            "merge level built"
        );

        levels.push(Level {
            curr_depth,
            next_depth,
            fan_in,
            rules,
        });
        curr_targets = next_targets;
    }

    Ok((levels, curr_targets))
}
