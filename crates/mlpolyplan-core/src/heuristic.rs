//! Chooses how deep to split a keyspace and how many split bits each merge
//! level resolves.
//!
//! The thresholds are empirically tuned and kept as configurable policy. The
//! defaults reproduce the historical makefile generator exactly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::types::{SplitParams, MAX_ORDER, MAX_SEGMENTS_ORDER};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPolicy {
    /// Orders up to this value are generated by a single leaf.
    #[serde(default = "default_no_split_max_order")]
    pub no_split_max_order: u32,

    /// Orders up to this value use `shallow_split_depth`.
    #[serde(default = "default_shallow_split_max_order")]
    pub shallow_split_max_order: u32,

    #[serde(default = "default_shallow_split_depth")]
    pub shallow_split_depth: u32,

    /// Branching used whenever the deep formula does not apply.
    #[serde(default = "default_incr_per_level")]
    pub default_incr_per_level: u32,

    /// Deep splits use `order - deep_split_base` bits...
    #[serde(default = "default_deep_split_base")]
    pub deep_split_base: u32,

    /// ...capped at this many.
    #[serde(default = "default_max_heuristic_depth")]
    pub max_heuristic_depth: u32,

    /// One extra merge level is added per this many split bits.
    #[serde(default = "default_level_span")]
    pub level_span: u32,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            no_split_max_order: default_no_split_max_order(),
            shallow_split_max_order: default_shallow_split_max_order(),
            shallow_split_depth: default_shallow_split_depth(),
            default_incr_per_level: default_incr_per_level(),
            deep_split_base: default_deep_split_base(),
            max_heuristic_depth: default_max_heuristic_depth(),
            level_span: default_level_span(),
        }
    }
}

impl SplitPolicy {
    /// Picks the split for `order` when the caller gave no explicit depth.
    pub fn choose_split(&self, order: u32) -> Result<SplitParams> {
        check_order(order)?;

        let params = if order <= self.no_split_max_order {
            SplitParams {
                order,
                segments_order: 0,
                incr_per_level: self.default_incr_per_level,
                num_levels: None,
            }
        } else if order <= self.shallow_split_max_order {
            SplitParams {
                order,
                segments_order: self.shallow_split_depth,
                incr_per_level: self.default_incr_per_level,
                num_levels: None,
            }
        } else {
            let segments_order = order
                .saturating_sub(self.deep_split_base)
                .min(self.max_heuristic_depth);
            let num_levels = segments_order / self.level_span + 1;
            SplitParams {
                order,
                segments_order,
                incr_per_level: segments_order / num_levels + 1,
                num_levels: Some(num_levels),
            }
        };

        debug!(
            order,
            segments_order = params.segments_order,
            incr_per_level = params.incr_per_level,
            "heuristic split chosen"
        );
        check_params(&params)?;
        Ok(params)
    }

    /// Params for a caller-supplied split depth.
    pub fn explicit(
        &self,
        order: u32,
        segments_order: u32,
        incr_per_level: Option<u32>,
    ) -> Result<SplitParams> {
        check_order(order)?;
        let params = SplitParams {
            order,
            segments_order,
            incr_per_level: incr_per_level.unwrap_or(self.default_incr_per_level),
            num_levels: None,
        };
        check_params(&params)?;
        Ok(params)
    }

    /// Explicit depth when given, the heuristic otherwise. A branching
    /// override replaces whatever the heuristic picked.
    pub fn resolve(
        &self,
        order: u32,
        segments_order: Option<u32>,
        incr_per_level: Option<u32>,
    ) -> Result<SplitParams> {
        match segments_order {
            Some(depth) => self.explicit(order, depth, incr_per_level),
            None => {
                let mut params = self.choose_split(order)?;
                if let Some(incr) = incr_per_level {
                    params.incr_per_level = incr;
                    check_params(&params)?;
                    if params.num_levels.is_some() {
                        params.num_levels = Some(params.segments_order.div_ceil(incr));
                    }
                }
                Ok(params)
            }
        }
    }
}

fn check_order(order: u32) -> Result<()> {
    if order == 0 || order > MAX_ORDER {
        return Err(PlanError::OrderOutOfRange {
            order,
            max: MAX_ORDER,
        });
    }
    Ok(())
}

fn check_params(params: &SplitParams) -> Result<()> {
    if params.incr_per_level == 0 {
        return Err(PlanError::InvalidBranching(params.incr_per_level));
    }
    // Each leaf must cover at least one key of [2^(order-1), 2^order).
    let max = (params.order - 1).min(MAX_SEGMENTS_ORDER);
    if params.segments_order > max {
        return Err(PlanError::SplitTooDeep {
            order: params.order,
            segments_order: params.segments_order,
            max,
        });
    }
    Ok(())
}

fn default_no_split_max_order() -> u32 {
    20
}
fn default_shallow_split_max_order() -> u32 {
    24
}
fn default_shallow_split_depth() -> u32 {
    4
}
fn default_incr_per_level() -> u32 {
    8
}
fn default_deep_split_base() -> u32 {
    20
}
fn default_max_heuristic_depth() -> u32 {
    16
}
fn default_level_span() -> u32 {
    9
}
