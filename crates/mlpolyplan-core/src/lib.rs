//! Task-graph planning for parallel generation of maximal-length LFSR polynomials.
//!
//! The keyspace of an order is split into independently generated segments,
//! and the sorted segment outputs are merged back through a tree of `sort`
//! passes. The result is emitted as a Makefile so `make -j` provides the
//! parallelism and the restart-after-interruption behaviour.

pub mod addressing;
pub mod config_manager;
pub mod document;
pub mod error;
pub mod graph;
pub mod heuristic;
pub mod leaf;
pub mod merge_tree;
pub mod types;

pub use addressing::*;
pub use config_manager::*;
pub use document::*;
pub use error::*;
pub use graph::*;
pub use heuristic::*;
pub use leaf::*;
pub use merge_tree::*;
pub use types::*;
