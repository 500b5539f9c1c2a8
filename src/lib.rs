#![cfg_attr(docsrs, feature(doc_cfg))]
//! # amg-aggregate
//!
//! amg-aggregate builds the aggregates (coarse-grid degrees of freedom) of an
//! algebraic multigrid hierarchy from a distributed adjacency graph. Each rank
//! holds its own vertices plus ghost copies of boundary neighbors; vertices
//! shared across ranks are settled by a deterministic ownership arbitration so
//! that every copy agrees on its aggregate.
//!
//! ## Features
//! - Uncoupled (UC) aggregation: greedy phase 1 plus leftover phases 1b–6
//! - Claim/verdict arbitration of shared vertices through their owning rank
//! - Pluggable communication backends (serial, in-process, MPI)
//! - Serial, multi-rank in-process, and property-based testing
//!
//! ## Determinism
//!
//! Randomized orderings draw from `SmallRng` generators seeded from
//! [`AggregationOptions::rng_seed`](aggregation::AggregationOptions) and the
//! rank, so repeated runs on the same partition give identical aggregates.
//!
//! ## Usage
//!
//! ```
//! use amg_aggregate::prelude::*;
//!
//! // 4-vertex path on a single rank
//! let adj = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
//! let graph = distribute_graph(&adj, &[0; 4], NoComm)?;
//! let (aggs, summary) = build_aggregates(&graph, &AggregationOptions::default())?;
//! assert!(aggs.is_complete());
//! assert_eq!(summary.global_aggregates, aggs.aggregate_count() as u64);
//! # Ok::<(), amg_aggregate::aggregation_error::AggregationError>(())
//! ```
//!
//! Enable the `mpi-support` feature for [`MpiComm`](algs::communicator::MpiComm).

pub mod aggregation;
pub mod aggregation_error;
pub mod algs;
pub mod graph;

pub use aggregation::{AggregationSummary, build_aggregates};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::aggregation::{
        Aggregates, AggregationOptions, AggregationSummary, Ordering, Verbosity,
        build_aggregates,
    };
    pub use crate::aggregation_error::AggregationError;
    pub use crate::algs::arbitration::{Arbiter, ClaimWeights};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    pub use crate::graph::{AggregationGraph, DistributedGraph, distribute_graph};
}
