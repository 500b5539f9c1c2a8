//! Phase 1: greedy uncoupled clustering of local vertices.
//!
//! Each rank works on its own vertices only; ghost neighbors are ignored and
//! no communication happens until the statistics are reduced at the end.
//! A visited `Ready` vertex becomes a root when
//!
//! * at most `max_neigh_already_selected` of its local neighbors are already
//!   `Selected`, and
//! * the candidate (the vertex plus its `Ready`/`NotSelected` local neighbors)
//!   has more than `min_nodes_per_aggregate` members.
//!
//! Otherwise it is marked `NotSelected` and may still be swept into a later
//! neighbor's aggregate.

use super::aggregates::Aggregates;
use super::options::{AggregationOptions, Ordering};
use super::report::{Phase, PhaseLog};
use super::state::{SupernodeArena, VertexState, try_reserve};
use crate::aggregation_error::AggregationError;
use crate::algs::collective::sum_all;
use crate::algs::communicator::Communicator;
use crate::graph::AggregationGraph;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Global phase-1 counters, identical on every rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Phase1Stats {
    pub ready_left: u64,
    pub aggregated: u64,
    pub vertices: u64,
    pub aggregates: u64,
}

/// Visiting order for phase 1.
enum Visit {
    Sequence { order: Vec<usize>, next: usize },
    Queue(VecDeque<usize>),
}

impl Visit {
    fn new(n: usize, options: &AggregationOptions, rank: usize) -> Self {
        match options.ordering {
            Ordering::Natural => Visit::Sequence {
                order: (0..n).collect(),
                next: 0,
            },
            Ordering::Random => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut options.rank_rng(rank, 1));
                Visit::Sequence { order, next: 0 }
            }
            Ordering::Graph => Visit::Queue(VecDeque::new()),
        }
    }

    fn next(&mut self, state: &[VertexState]) -> Option<usize> {
        match self {
            Visit::Sequence { order, next } => {
                let v = order.get(*next).copied();
                *next += 1;
                v
            }
            Visit::Queue(queue) => {
                if queue.is_empty() {
                    // restart from the lowest remaining Ready vertex
                    let seed = state.iter().position(|&s| s == VertexState::Ready)?;
                    queue.push_back(seed);
                }
                queue.pop_front()
            }
        }
    }

    /// Queue the `Ready` local neighbors of `v` (graph ordering only).
    fn touch<G: AggregationGraph>(&mut self, graph: &G, v: usize, state: &[VertexState]) {
        if let Visit::Queue(queue) = self {
            queue.extend(
                graph
                    .neighbors(v)
                    .iter()
                    .copied()
                    .filter(|&u| graph.is_local(u) && state[u] == VertexState::Ready),
            );
        }
    }
}

/// Form phase-1 aggregates on this rank.
///
/// The result has tentative aggregate ids and root flags on local vertices;
/// every `proc_winner` is still unassigned. Collective only through the final
/// statistics reduction.
pub fn coarsen_uncoupled<G: AggregationGraph>(
    graph: &G,
    options: &AggregationOptions,
    log: &PhaseLog,
) -> Result<(Aggregates, Phase1Stats), AggregationError> {
    options.validate()?;
    let comm = graph.communicator();
    let n = graph.local_vertex_count();
    let mut aggs = Aggregates::new(graph);
    let mut state = vec![VertexState::Ready; n];
    let mut arena = SupernodeArena::new();
    let mut visit = Visit::new(n, options, comm.rank());
    let mut candidate: Vec<usize> = Vec::new();

    while let Some(v) = visit.next(&state) {
        if state[v] != VertexState::Ready {
            continue;
        }
        let neighbors = graph.neighbors(v);
        candidate.clear();
        try_reserve(&mut candidate, neighbors.len() + 1, Phase::One)?;
        candidate.push(v);

        let mut already_selected = 0usize;
        for &u in neighbors {
            if u == v || !graph.is_local(u) {
                continue;
            }
            if state[u].is_claimable() {
                candidate.push(u);
            } else {
                already_selected += 1;
            }
        }

        if already_selected > options.max_neigh_already_selected
            || candidate.len() <= options.min_nodes_per_aggregate
        {
            state[v].reject();
            visit.touch(graph, v, &state);
            continue;
        }

        let agg = arena.push(&candidate)?;
        aggs.set_root(v, true);
        for &u in arena.get(agg) {
            state[u].select();
            aggs.assign(u, Some(agg));
        }
        for &u in arena.get(agg) {
            visit.touch(graph, u, &state);
        }
    }

    aggs.set_aggregate_count(arena.len());
    let count = |s: VertexState| state.iter().filter(|&&x| x == s).count() as u64;
    let stats = Phase1Stats {
        ready_left: sum_all(comm, count(VertexState::Ready))?,
        aggregated: sum_all(comm, count(VertexState::Selected))?,
        vertices: sum_all(comm, n as u64)?,
        aggregates: sum_all(comm, arena.len() as u64)?,
    };
    if stats.ready_left > 0 {
        log.warn(
            Phase::One,
            format_args!("{} READY nodes left", stats.ready_left),
        );
    }
    log.summary(
        Phase::One,
        format_args!(
            "nodes aggregated = {} ({})",
            stats.aggregated, stats.vertices
        ),
    );
    log.summary(
        Phase::One,
        format_args!("total aggregates = {}", stats.aggregates),
    );
    Ok((aggs, stats))
}
