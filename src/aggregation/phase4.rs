//! Phase 4: emergency bucket creation.
//!
//! Only runs when phases 1 through 3 produced almost nothing, typically a
//! graph spread so thin over the ranks that no rank could form an aggregate
//! from its local vertices alone.

use super::aggregates::Aggregates;
use super::leftover::{MEMBER_WEIGHT, ROOT_WEIGHT, arbitrate_round, remove_small_aggregates};
use super::options::AggregationOptions;
use super::report::{Phase, PhaseLog};
use crate::aggregation_error::AggregationError;
use crate::algs::arbitration::{Arbiter, ClaimWeights};
use crate::algs::collective::{max_all, min_all, sum_all};
use crate::algs::communicator::Communicator;
use crate::graph::AggregationGraph;
use rand::Rng;

/// Number of threshold buckets swept.
pub const BUCKETS: usize = 6;

/// Local vertices that are unaggregated and have no aggregated neighbor.
pub fn root_candidates<G: AggregationGraph>(graph: &G, aggs: &Aggregates) -> Vec<usize> {
    (0..graph.local_vertex_count())
        .filter(|&v| {
            aggs.vertex_to_aggregate(v).is_none()
                && graph
                    .neighbors(v)
                    .iter()
                    .all(|&u| aggs.vertex_to_aggregate(u).is_none())
        })
        .collect()
}

/// Run the bucket sweep if the aggregation so far is pathologically coarse.
/// Collective; returns whether the sweep ran (identically on every rank).
pub fn emergency_buckets<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
    arbiter: &Arbiter<'_, G::Comm>,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
    log: &PhaseLog,
) -> Result<bool, AggregationError> {
    let comm = graph.communicator();
    let n_global = sum_all(comm, graph.local_vertex_count() as u64)? as f64;
    let local_aggs = aggs.aggregate_count() as u64;
    let mut global_aggs = sum_all(comm, local_aggs)?;
    let min_aggs = min_all(comm, local_aggs)?;
    let max_aggs = max_all(comm, local_aggs)?;

    let edges = graph.global_edge_count();
    if edges == 0 {
        return Ok(false);
    }
    let target = n_global * (n_global / edges as f64);
    let triggered = global_aggs < comm.size() as u64
        && 2.5 * (global_aggs as f64) < target
        && min_aggs == 0
        && max_aggs <= 1;
    if !triggered {
        return Ok(false);
    }
    log.warn(
        Phase::Four,
        format_args!("only {global_aggs} aggregates for a target of {target:.1}, sweeping buckets"),
    );

    let mut rng = options.rank_rng(comm.rank(), 4);
    let draw: Vec<f64> = (0..graph.local_vertex_count())
        .map(|_| rng.r#gen::<f64>())
        .collect();
    let min = options.min_nodes_per_aggregate;

    let mut prior = 0.0;
    let mut claimed = Vec::new();
    for k in 0..BUCKETS {
        let candidates = root_candidates(graph, aggs);
        let global_candidates = sum_all(comm, candidates.len() as u64)?;

        let wanted = target - global_aggs as f64;
        let mut threshold =
            prior + (1.0 - prior) * wanted / (global_candidates as f64 + 0.001);
        threshold = threshold * (k + 1) as f64 / BUCKETS as f64;
        prior = threshold;

        for &v in &candidates {
            if aggs.vertex_to_aggregate(v).is_some() || draw[v] >= threshold {
                continue;
            }
            let neighbors = graph.neighbors(v);
            if neighbors.len() <= min {
                continue;
            }
            let next = Some(aggs.aggregate_count());
            claimed.clear();
            for &u in neighbors {
                if aggs.vertex_to_aggregate(u).is_none() {
                    aggs.assign(u, next);
                    weights.set(u, MEMBER_WEIGHT);
                    claimed.push(u);
                }
            }
            if claimed.len() >= min {
                aggs.allocate();
                aggs.assign(v, next);
                aggs.set_root(v, true);
                weights.set(v, ROOT_WEIGHT);
            } else {
                for &u in &claimed {
                    aggs.assign(u, None);
                    weights.set(u, 0);
                }
            }
        }

        arbitrate_round(arbiter, weights, aggs, log, Phase::Four)?;
        global_aggs = sum_all(comm, aggs.aggregate_count() as u64)?;
        remove_small_aggregates(arbiter, aggs, weights, min, log, Phase::Four)?;
        log.detail(
            Phase::Four,
            format_args!(
                "bucket {k}: threshold {threshold:.4}, {} local aggregates",
                aggs.aggregate_count()
            ),
        );
    }
    let total = sum_all(comm, aggs.aggregate_count() as u64)?;
    log.summary(Phase::Four, format_args!("total aggregates = {total}"));
    Ok(true)
}
