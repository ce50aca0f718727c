//! Partitioned data-parallel execution for the similarity join engine.
//!
//! This crate is the in-process stand-in for a distributed collection runtime. Work
//! is expressed over [`dataset::Dataset`]s, which are split into partitions and
//! processed by the worker pool of an [`context::ExecutionContext`].
//!
//! # Key Components
//!
//! - [`context::ExecutionContext`] - Owns the worker pool, the partitioning policy and
//!   the memory budget for published state. Falls back to sequential execution when
//!   the degree of parallelism is 1.
//! - [`dataset::Dataset`] - Immutable partitioned collection with per-partition
//!   `map`/`filter`/`flat_map`, keyed aggregation, cartesian products and globally
//!   unique id assignment.
//! - [`broadcast::Broadcast`] - Read-only snapshot published once to every worker,
//!   charged against the context's memory budget for as long as it is alive.
//!
//! Operations that need all partitions (counts, keyed aggregation merges) block until
//! every partition has been processed. Everything else runs independently per
//! partition.

pub mod broadcast;
pub mod context;
pub mod dataset;

pub use broadcast::{Broadcast, EstimateSize};
pub use context::{ExecutionContext, ExecutionParams};
pub use dataset::Dataset;
