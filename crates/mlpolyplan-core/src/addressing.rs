//! Stable target names for every segment of a split keyspace.
//!
//! A keyspace split `total_depth` bits deep is named with
//! `ceil((total_depth + 3) / 4)` hex digit characters. At a coarser level the
//! trailing digits that are not resolved yet are written as literal `x`, so
//! `files/mlpoly30-1fx.txt.gz` is the merge of `files/mlpoly30-1f0.txt.gz`
//! through `files/mlpoly30-1ff.txt.gz`.

use crate::error::{PlanError, Result};
use crate::types::SegmentId;

pub const DEFAULT_FILES_DIR: &str = "files";

/// Name of the fully merged output for `order`.
pub fn root_target(order: u32) -> String {
    format!("mlpoly{}.txt.gz", order)
}

/// Produces the identifiers of each level of one split.
#[derive(Debug, Clone, Copy)]
pub struct SegmentAddresser<'a> {
    order: u32,
    total_depth: u32,
    files_dir: &'a str,
}

impl<'a> SegmentAddresser<'a> {
    pub fn new(order: u32, total_depth: u32, files_dir: &'a str) -> Self {
        Self {
            order,
            total_depth,
            files_dir,
        }
    }

    pub fn total_digits(&self) -> u32 {
        (self.total_depth + 3) / 4
    }

    /// Identifiers of all `2^level_depth` segments at `level_depth`.
    pub fn level(&self, level_depth: u32) -> Result<Vec<SegmentId>> {
        if level_depth == 0 {
            return Ok(vec![SegmentId {
                depth: 0,
                index: 0,
                path: root_target(self.order),
            }]);
        }

        if level_depth > self.total_depth {
            return Err(self.precondition(level_depth));
        }
        let open = self.total_depth - level_depth;
        if open != 0 && open < 4 {
            return Err(self.precondition(level_depth));
        }

        let placeholders = open / 4;
        let width = (self.total_digits() - placeholders) as usize;
        let scale = 1u64 << (open % 4);
        let wildcard = "x".repeat(placeholders as usize);

        let ids = (0..1u64 << level_depth)
            .map(|index| SegmentId {
                depth: level_depth,
                index,
                path: format!(
                    "{}/mlpoly{}-{:0width$x}{}.txt.gz",
                    self.files_dir,
                    self.order,
                    index * scale,
                    wildcard,
                    width = width
                ),
            })
            .collect();
        Ok(ids)
    }

    fn precondition(&self, level_depth: u32) -> PlanError {
        PlanError::AddressPrecondition {
            total_depth: self.total_depth,
            level_depth,
        }
    }
}

/// Identifiers at `level_depth` of a `total_depth` split, under the default files directory.
pub fn segment_targets(order: u32, total_depth: u32, level_depth: u32) -> Result<Vec<SegmentId>> {
    SegmentAddresser::new(order, total_depth, DEFAULT_FILES_DIR).level(level_depth)
}
