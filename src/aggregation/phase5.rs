//! Phase 5: sweep remaining vertices into existing aggregates by score.
//!
//! A vertex is scored against each aggregate it touches: the sum of the marks
//! of its neighbors in that aggregate, minus a penalty for aggregates that
//! already grew during this phase. Marks decay with distance from the
//! original aggregates (`DISTONE_WEIGHT`, then half the best mark at each
//! step), so growth stays compact. Passes run with descending score cutoffs.

use super::aggregates::Aggregates;
use super::leftover::arbitrate_round;
use super::report::{Phase, PhaseLog};
use crate::aggregation_error::AggregationError;
use crate::algs::arbitration::{Arbiter, ClaimWeights};
use crate::graph::AggregationGraph;
use hashbrown::HashMap;

pub const DISTONE_WEIGHT: u64 = 100;
pub const SCORE_THRESHOLDS: [u64; 5] = [300, 100, 25, 7, 2];
pub const INCR_SCALING: u64 = 3;
pub const PENALTY_FACTOR: f64 = 0.30;

#[derive(Clone, Copy)]
struct Best {
    agg: usize,
    score: u64,
    mark: u64,
    /// At least one contributing neighbor is already settled or unshared.
    anchored: bool,
}

/// Local transpose of the local rows, restricted to unaggregated ghosts:
/// `rows[g - n_local]` lists the local vertices adjacent to ghost `g`.
fn ghost_rows<G: AggregationGraph>(graph: &G, aggs: &Aggregates) -> Vec<Vec<usize>> {
    let n_local = graph.local_vertex_count();
    let mut rows = vec![Vec::new(); graph.ghost_vertex_count()];
    for v in 0..n_local {
        for &u in graph.neighbors(v) {
            if u >= n_local && aggs.vertex_to_aggregate(u).is_none() {
                rows[u - n_local].push(v);
            }
        }
    }
    rows
}

fn penalized(sum: u64, incremented: u64) -> u64 {
    let penalty = ((INCR_SCALING * incremented) as f64).min(PENALTY_FACTOR * sum as f64);
    sum - penalty.floor() as u64
}

/// Run every cutoff pass, arbitrating after each. Collective; returns the
/// number of vertex copies this rank tentatively assigned.
pub fn score_sweep<G: AggregationGraph>(
    graph: &G,
    arbiter: &Arbiter<'_, G::Comm>,
    aggs: &mut Aggregates,
    weights: &mut ClaimWeights,
    log: &PhaseLog,
) -> Result<u64, AggregationError> {
    let me = aggs.rank();
    let n_local = graph.local_vertex_count();
    let rows = ghost_rows(graph, aggs);
    let mut mark = vec![DISTONE_WEIGHT; aggs.len()];
    let mut incremented = vec![0u64; aggs.aggregate_count()];
    let mut sums: HashMap<usize, u64> = HashMap::new();
    let mut swept = 0;

    // Only aggregates this rank holds or may still win are worth joining.
    let joinable = |aggs: &Aggregates, u: usize| {
        aggs.vertex_to_aggregate(u)
            .filter(|_| aggs.proc_winner(u).is_none_or(|w| w == me))
    };

    for cutoff in SCORE_THRESHOLDS {
        let mut assigned = 0u64;
        for v in 0..aggs.len() {
            if aggs.vertex_to_aggregate(v).is_some() {
                continue;
            }
            let neighbors = if v < n_local {
                graph.neighbors(v)
            } else {
                rows[v - n_local].as_slice()
            };

            sums.clear();
            for &u in neighbors {
                if let Some(a) = joinable(aggs, u) {
                    *sums.entry(a).or_default() += mark[u];
                }
            }

            let mut best: Option<Best> = None;
            for &u in neighbors {
                let Some(a) = joinable(aggs, u) else { continue };
                let sum = sums.get(&a).copied().unwrap_or(0);
                if sum == 0 {
                    continue;
                }
                let anchored = weights.get(u) == 0 || !arbiter.is_shared(u);
                let score = penalized(sum, incremented.get(a).copied().unwrap_or(0));
                match &mut best {
                    Some(b) if b.agg == a => {
                        b.anchored |= anchored;
                        b.mark = b.mark.max(mark[u]);
                    }
                    Some(b) if score <= b.score => {}
                    _ => {
                        best = Some(Best {
                            agg: a,
                            score,
                            mark: mark[u],
                            anchored,
                        })
                    }
                }
            }

            if let Some(b) = best.filter(|b| b.score >= cutoff && b.anchored) {
                aggs.assign(v, Some(b.agg));
                weights.set(v, b.score);
                if let Some(n) = incremented.get_mut(b.agg) {
                    *n += 1;
                }
                mark[v] = b.mark.div_ceil(2);
                assigned += 1;
            }
        }
        swept += assigned;
        log.detail(
            Phase::Five,
            format_args!("cutoff {cutoff}: {assigned} vertices tentatively assigned"),
        );
        arbitrate_round(arbiter, weights, aggs, log, Phase::Five)?;
    }
    Ok(swept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::options::Verbosity;
    use crate::algs::communicator::NoComm;
    use crate::graph::distribute_graph;

    #[test]
    fn penalty_is_capped_by_factor() {
        assert_eq!(penalized(100, 0), 100);
        assert_eq!(penalized(100, 2), 94);
        assert_eq!(penalized(10, 50), 7);
    }

    #[test]
    fn path_tail_is_swept_toward_aggregate() {
        // 0-1-2-3 with {0,1} aggregated and settled
        let adj = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
        let g = distribute_graph(&adj, &[0; 4], NoComm).unwrap();
        let arbiter = Arbiter::new(&g).unwrap();
        let mut aggs = Aggregates::new(&g);
        let mut w = ClaimWeights::new(aggs.len());
        let a = aggs.allocate();
        for v in 0..2 {
            aggs.assign(v, Some(a));
            w.set(v, 1);
        }
        aggs.set_root(0, true);
        arbiter.arbitrate(&w, &mut aggs, Phase::OneB).unwrap();
        w.reset();

        let log = PhaseLog::new("test", 0, Verbosity::None);
        let swept = score_sweep(&g, &arbiter, &mut aggs, &mut w, &log).unwrap();
        assert_eq!(swept, 2);
        assert!(aggs.is_complete());
        assert_eq!(aggs.vertex_to_aggregate(3), Some(a));
        assert_eq!(aggs.proc_winner(3), Some(0));
    }

    #[test]
    fn vertices_without_aggregated_neighbors_stay_put() {
        let adj = vec![vec![1], vec![0], vec![]];
        let g = distribute_graph(&adj, &[0; 3], NoComm).unwrap();
        let arbiter = Arbiter::new(&g).unwrap();
        let mut aggs = Aggregates::new(&g);
        let mut w = ClaimWeights::new(aggs.len());
        let log = PhaseLog::new("test", 0, Verbosity::None);
        assert_eq!(score_sweep(&g, &arbiter, &mut aggs, &mut w, &log).unwrap(), 0);
        assert!(!aggs.is_complete());
    }
}
