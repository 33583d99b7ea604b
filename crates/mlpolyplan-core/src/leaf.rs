//! Generation rules at the finest split level.

use tracing::debug;

use crate::error::{PlanError, Result};
use crate::graph::{Rule, RuleGraph};
use crate::types::{LeafRange, RuleId, SegmentId, MAX_ORDER};

/// Splits `[2^(order-1), 2^order - 1]` into `num_leaves` equal contiguous ranges.
pub fn leaf_ranges(order: u32, num_leaves: usize) -> Result<Vec<LeafRange>> {
    if order == 0 || order > MAX_ORDER {
        return Err(PlanError::OrderOutOfRange {
            order,
            max: MAX_ORDER,
        });
    }
    let total_end: u128 = 1 << order;
    let total_start = total_end / 2;
    let span = total_end - total_start;

    let segments = num_leaves as u128;
    if segments == 0 || span % segments != 0 {
        return Err(PlanError::RangeNotDivisible {
            half_order: order - 1,
            segments: num_leaves,
        });
    }
    let incr = span / segments;

    Ok((0..segments)
        .map(|s| {
            let start = total_start + s * incr;
            LeafRange {
                start,
                end: start + incr - 1,
            }
        })
        .collect())
}

/// Adds one generator rule per leaf to `graph`.
///
/// A single leaf is the root itself and runs the generator over its default
/// full range, so it carries no explicit bounds.
pub fn build_leaf_rules(
    order: u32,
    leaves: &[SegmentId],
    graph: &mut RuleGraph,
) -> Result<Vec<RuleId>> {
    if let [only] = leaves {
        return Ok(vec![graph.add(Rule::generate(only.clone(), order, None))?]);
    }

    let ranges = leaf_ranges(order, leaves.len())?;
    debug!(
        order,
        leaves = leaves.len(),
        keys_per_leaf = %ranges.first().map(|r| r.key_count()).unwrap_or(0),
        "leaf ranges computed"
    );

    leaves
        .iter()
        .zip(ranges)
        .map(|(target, range)| graph.add(Rule::generate(target.clone(), order, Some(range))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::segment_targets;
    use crate::graph::Recipe;

    #[test]
    fn sixteen_way_split_of_order_24() {
        let ranges = leaf_ranges(24, 16).unwrap();
        assert_eq!(ranges.len(), 16);
        assert_eq!(
            ranges[0],
            LeafRange {
                start: 0x80_0000,
                end: 0x87_ffff
            }
        );
        assert_eq!(
            ranges[15],
            LeafRange {
                start: 0xf8_0000,
                end: 0xff_ffff
            }
        );
    }

    #[test]
    fn single_range_is_upper_half() {
        let ranges = leaf_ranges(5, 1).unwrap();
        assert_eq!(ranges, vec![LeafRange { start: 16, end: 31 }]);
    }

    #[test]
    fn one_key_per_leaf() {
        let ranges = leaf_ranges(4, 8).unwrap();
        assert!(ranges.iter().all(|r| r.key_count() == 1));
        assert_eq!(ranges[7].end, 15);
    }

    #[test]
    fn too_many_leaves_rejected() {
        assert!(matches!(
            leaf_ranges(4, 16),
            Err(PlanError::RangeNotDivisible { .. })
        ));
        assert!(leaf_ranges(4, 3).is_err());
        assert!(leaf_ranges(4, 0).is_err());
    }

    #[test]
    fn largest_order_fits() {
        let ranges = leaf_ranges(127, 4).unwrap();
        assert_eq!(ranges[3].end, u128::MAX >> 1);
    }

    #[test]
    fn single_leaf_rule_has_no_range() {
        let leaves = segment_targets(16, 0, 0).unwrap();
        let mut graph = RuleGraph::new();
        build_leaf_rules(16, &leaves, &mut graph).unwrap();
        let rule = graph.find("mlpoly16.txt.gz").unwrap();
        assert_eq!(
            rule.recipe,
            Recipe::Generate {
                order: 16,
                range: None
            }
        );
    }

    #[test]
    fn split_leaf_rules_carry_ranges() {
        let leaves = segment_targets(22, 4, 4).unwrap();
        let mut graph = RuleGraph::new();
        let ids = build_leaf_rules(22, &leaves, &mut graph).unwrap();
        assert_eq!(ids.len(), 16);
        match &graph.get(ids[2]).unwrap().recipe {
            Recipe::Generate {
                range: Some(range), ..
            } => assert_eq!(range.start, 0x20_0000 + 2 * 0x2_0000),
            other => panic!("unexpected recipe {:?}", other),
        }
    }
}
