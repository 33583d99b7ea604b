use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest polynomial order whose keyspace `[2^(order-1), 2^order)` fits in `u128`.
pub const MAX_ORDER: u32 = 127;

/// Deepest split that is still materialised as individual rules.
pub const MAX_SEGMENTS_ORDER: u32 = 24;

/// Index of a rule inside a [`crate::RuleGraph`].
pub type RuleId = usize;

/// How a keyspace of a given order is split and merged back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitParams {
    /// Polynomial order.
    pub order: u32,
    /// Number of keyspace bits used to partition the enumeration.
    pub segments_order: u32,
    /// Split bits resolved per merge level; caps fan-in at `2^incr_per_level`.
    pub incr_per_level: u32,
    /// Set when the deep heuristic picked the split.
    pub num_levels: Option<u32>,
}

impl fmt::Display for SplitParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} split {} step {}",
            self.order, self.segments_order, self.incr_per_level
        )
    }
}

/// Inclusive range of candidate polynomials assigned to one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafRange {
    pub start: u128,
    pub end: u128,
}

impl LeafRange {
    /// Number of candidate polynomials in the range.
    pub fn key_count(&self) -> u128 {
        self.end - self.start + 1
    }
}

/// A make target naming one segment of the output at some split depth.
///
/// The root (depth 0) is `mlpoly<order>.txt.gz`; every other level lives under
/// the files directory with its resolved hex digits followed by `x` wildcards
/// for the split bits that are still open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    /// Split depth this identifier belongs to.
    pub depth: u32,
    /// Position of this segment among the `2^depth` segments of its level.
    pub index: u64,
    /// Rendered target path.
    pub path: String,
}

impl SegmentId {
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// True when `finer` is one of the segments merged into `self`.
    pub fn covers(&self, finer: &SegmentId) -> bool {
        finer.depth > self.depth && finer.index >> (finer.depth - self.depth) == self.index
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<str> for SegmentId {
    fn as_ref(&self) -> &str {
        &self.path
    }
}
