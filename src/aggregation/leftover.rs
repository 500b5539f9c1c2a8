//! Leftover assignment: phases 1b through 6.
//!
//! Takes the tentative local aggregation from phase 1 and turns it into a
//! complete, globally consistent one. Every phase ends in exactly one
//! arbitration round (phase 4 and phase 5 run several), so at the start of
//! each phase all copies of a shared vertex agree.

use super::aggregates::Aggregates;
use super::options::AggregationOptions;
use super::report::{Phase, PhaseLog};
use super::{phase4, phase5};
use crate::aggregation_error::AggregationError;
use crate::algs::arbitration::{Arbiter, ClaimWeights};
use crate::algs::collective::sum_all;
use crate::algs::communicator::Communicator;
use crate::graph::AggregationGraph;

/// Claim weight of a root on itself or a local member of a fresh aggregate.
pub const ROOT_WEIGHT: u64 = 2;
/// Claim weight of ordinary propagation.
pub const MEMBER_WEIGHT: u64 = 1;

/// Global counters gathered while completing the aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeftoverStats {
    /// Local vertices aggregated before phase 3 ran.
    pub aggregated_before_phase3: u64,
    pub phase3_new_aggregates: u64,
    pub phase4_ran: bool,
    pub phase5_swept: u64,
    pub phase6_leftovers: u64,
    pub phase6_singletons: u64,
    pub total_aggregates: u64,
}

/// Arbitrate the current claims, log the round and withdraw every claim.
pub(crate) fn arbitrate_round<C: Communicator>(
    arbiter: &Arbiter<'_, C>,
    weights: &mut ClaimWeights,
    aggs: &mut Aggregates,
    log: &PhaseLog,
    phase: Phase,
) -> Result<(), AggregationError> {
    let stats = arbiter.arbitrate(weights, aggs, phase)?;
    log.detail(
        phase,
        format_args!(
            "arbitration decided {} owned vertices, {} won elsewhere",
            stats.decided, stats.lost
        ),
    );
    weights.reset();
    Ok(())
}

/// Dissolve this rank's aggregates with fewer than `min_size` won members and
/// renumber the survivors contiguously. Collective; returns the number of
/// aggregates removed on this rank.
pub fn remove_small_aggregates<C: Communicator>(
    arbiter: &Arbiter<'_, C>,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
    min_size: usize,
    log: &PhaseLog,
    phase: Phase,
) -> Result<usize, AggregationError> {
    let me = aggs.rank();
    let sizes = aggs.aggregate_sizes();
    let mut renumbered = Vec::with_capacity(sizes.len());
    let mut survivors = 0;
    for &size in &sizes {
        if size < min_size {
            renumbered.push(None);
        } else {
            renumbered.push(Some(survivors));
            survivors += 1;
        }
    }

    for v in 0..aggs.len() {
        if aggs.proc_winner(v) != Some(me) {
            continue;
        }
        if let Some(a) = aggs.vertex_to_aggregate(v) {
            aggs.assign(v, renumbered.get(a).copied().flatten());
            weights.set(v, MEMBER_WEIGHT);
        }
        if aggs.vertex_to_aggregate(v).is_none() {
            aggs.set_root(v, false);
        }
    }
    aggs.set_aggregate_count(survivors);

    arbitrate_round(arbiter, weights, aggs, log, phase)?;

    for v in 0..aggs.len() {
        if aggs.vertex_to_aggregate(v).is_none() {
            aggs.set_proc_winner(v, None);
            aggs.set_root(v, false);
        }
    }
    Ok(sizes.len() - survivors)
}

/// Complete the aggregation started by phase 1.
///
/// Collective: every rank must call this with its piece of the same graph and
/// identical options. On return every local and ghost vertex is aggregated and
/// has a winning rank.
pub fn aggregate_leftovers<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
    aggs: &mut Aggregates,
    log: &PhaseLog,
) -> Result<LeftoverStats, AggregationError> {
    let comm = graph.communicator();
    let arbiter = Arbiter::new(graph)?;
    let mut weights = ClaimWeights::new(aggs.len());
    let mut stats = LeftoverStats::default();

    claim_tentative(aggs, &mut weights);
    arbitrate_round(&arbiter, &mut weights, aggs, log, Phase::OneB)?;

    claim_root_neighbors(graph, aggs, &mut weights);
    arbitrate_round(&arbiter, &mut weights, aggs, log, Phase::Two)?;

    let n_local = graph.local_vertex_count();
    let aggregated = (0..n_local)
        .filter(|&v| aggs.vertex_to_aggregate(v).is_some())
        .count() as u64;
    stats.aggregated_before_phase3 = sum_all(comm, aggregated)?;
    let total_vertices = sum_all(comm, n_local as u64)?;
    let before = aggs.aggregate_count();
    grow_dense_regions(
        graph,
        options,
        aggs,
        &mut weights,
        stats.aggregated_before_phase3,
        total_vertices,
    );
    arbitrate_round(&arbiter, &mut weights, aggs, log, Phase::Three)?;
    stats.phase3_new_aggregates = sum_all(comm, (aggs.aggregate_count() - before) as u64)?;
    log.summary(
        Phase::Three,
        format_args!("additional aggregates = {}", stats.phase3_new_aggregates),
    );

    stats.phase4_ran =
        phase4::emergency_buckets(graph, options, &arbiter, aggs, &mut weights, log)?;

    let swept = phase5::score_sweep(graph, &arbiter, aggs, &mut weights, log)?;
    stats.phase5_swept = sum_all(comm, swept)?;

    let (leftovers, singletons) = force_completion(graph, options, aggs, &mut weights);
    arbitrate_round(&arbiter, &mut weights, aggs, log, Phase::Six)?;

    stats.phase6_leftovers = sum_all(comm, leftovers)?;
    stats.phase6_singletons = sum_all(comm, singletons)?;
    stats.total_aggregates = sum_all(comm, aggs.aggregate_count() as u64)?;
    log.summary(
        Phase::Six,
        format_args!(
            "leftovers = {} and singletons = {}, total aggregates = {}",
            stats.phase6_leftovers, stats.phase6_singletons, stats.total_aggregates
        ),
    );
    Ok(stats)
}

/// Phase 1b: put every tentatively aggregated vertex up for arbitration,
/// roots with the stronger claim.
fn claim_tentative(aggs: &Aggregates, weights: &mut ClaimWeights) {
    for v in 0..aggs.len() {
        if aggs.proc_winner(v).is_none() && aggs.vertex_to_aggregate(v).is_some() {
            let w = if aggs.is_root(v) {
                ROOT_WEIGHT
            } else {
                MEMBER_WEIGHT
            };
            weights.set(v, w);
        }
    }
}

/// Phase 2: unaggregated neighbors (local or ghost) of roots this rank won
/// join the root's aggregate.
fn claim_root_neighbors<G: AggregationGraph>(
    graph: &G,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
) {
    let me = aggs.rank();
    for v in 0..graph.local_vertex_count() {
        if !aggs.is_root(v) || aggs.proc_winner(v) != Some(me) {
            continue;
        }
        let agg = aggs.vertex_to_aggregate(v);
        for &u in graph.neighbors(v) {
            if aggs.vertex_to_aggregate(u).is_none() {
                aggs.assign(u, agg);
                weights.set(u, MEMBER_WEIGHT);
            }
        }
    }
}

/// Phase 3: start new aggregates where the unaggregated neighborhood is
/// dense compared to how much of the graph is already aggregated.
fn grow_dense_regions<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
    aggregated: u64,
    total_vertices: u64,
) {
    let factor =
        (aggregated as f64 / (total_vertices as f64 + 1.0)).powf(options.phase3_agg_creation);
    for v in 0..graph.local_vertex_count() {
        if aggs.vertex_to_aggregate(v).is_some() {
            continue;
        }
        let neighbors = graph.neighbors(v);
        if neighbors.is_empty() {
            continue;
        }
        let free_local = neighbors
            .iter()
            .filter(|&&u| graph.is_local(u) && aggs.vertex_to_aggregate(u).is_none())
            .count();
        if free_local <= options.min_nodes_per_aggregate
            || free_local as f64 / neighbors.len() as f64 <= factor
        {
            continue;
        }
        let agg = Some(aggs.allocate());
        aggs.assign(v, agg);
        aggs.set_root(v, true);
        weights.set(v, ROOT_WEIGHT);
        for &u in neighbors {
            if aggs.vertex_to_aggregate(u).is_none() {
                aggs.assign(u, agg);
                let w = if graph.is_local(u) {
                    ROOT_WEIGHT
                } else {
                    MEMBER_WEIGHT
                };
                weights.set(u, w);
            }
        }
    }
}

/// Phase 6: every remaining local vertex founds an aggregate with its
/// unaggregated local neighbors. Undersized ones are folded into this rank's
/// aggregate 0 when it exists. Returns `(leftovers, singletons)`.
fn force_completion<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
) -> (u64, u64) {
    let mut leftovers = 0;
    let mut singletons = 0;
    let mut members = Vec::new();
    for v in 0..graph.local_vertex_count() {
        if aggs.vertex_to_aggregate(v).is_some() {
            continue;
        }
        leftovers += 1;
        members.clear();
        members.push(v);
        members.extend(
            graph
                .neighbors(v)
                .iter()
                .copied()
                .filter(|&u| u != v && graph.is_local(u) && aggs.vertex_to_aggregate(u).is_none()),
        );

        let merge = members.len() < options.min_nodes_per_aggregate && aggs.aggregate_count() > 0;
        let target = if merge {
            0
        } else {
            if members.len() == 1 {
                singletons += 1;
            }
            aggs.allocate()
        };
        for &u in &members {
            aggs.assign(u, Some(target));
            aggs.set_root(u, !merge && u == v);
            weights.set(u, MEMBER_WEIGHT);
        }
    }
    (leftovers, singletons)
}
