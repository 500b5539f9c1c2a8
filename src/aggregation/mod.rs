//! Uncoupled aggregation pipeline.
//!
//! [`build_aggregates`] runs phase 1 ([`phase1::coarsen_uncoupled`]) and then
//! the leftover phases ([`leftover::aggregate_leftovers`]). Both are
//! collective: every rank of the graph's communicator must call them with the
//! same options.

pub mod aggregates;
pub mod leftover;
pub mod options;
pub mod phase1;
pub mod phase4;
pub mod phase5;
pub mod report;
pub mod state;

pub use aggregates::Aggregates;
pub use options::{AggregationOptions, Ordering, Verbosity};
pub use report::{Phase, PhaseLog};

use crate::aggregation_error::AggregationError;
use crate::algs::communicator::Communicator;
use crate::graph::AggregationGraph;

/// Label used in log lines of the uncoupled scheme.
pub const LABEL: &str = "UC";

/// Global counters of one aggregation run, identical on every rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    pub phase1_aggregated: u64,
    pub phase1_aggregates: u64,
    pub phase1_ready_left: u64,
    pub phase3_new_aggregates: u64,
    pub phase4_ran: bool,
    pub phase5_swept: u64,
    pub phase6_leftovers: u64,
    pub phase6_singletons: u64,
    pub global_aggregates: u64,
}

/// Aggregate every local and ghost vertex of `graph`.
pub fn build_aggregates<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
) -> Result<(Aggregates, AggregationSummary), AggregationError> {
    let log = PhaseLog::new(LABEL, graph.communicator().rank(), options.verbosity);
    let (mut aggs, p1) = phase1::coarsen_uncoupled(graph, options, &log)?;
    let rest = leftover::aggregate_leftovers(graph, options, &mut aggs, &log)?;
    let summary = AggregationSummary {
        phase1_aggregated: p1.aggregated,
        phase1_aggregates: p1.aggregates,
        phase1_ready_left: p1.ready_left,
        phase3_new_aggregates: rest.phase3_new_aggregates,
        phase4_ran: rest.phase4_ran,
        phase5_swept: rest.phase5_swept,
        phase6_leftovers: rest.phase6_leftovers,
        phase6_singletons: rest.phase6_singletons,
        global_aggregates: rest.total_aggregates,
    };
    Ok((aggs, summary))
}
