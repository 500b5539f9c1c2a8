//! CSR implementation of [`AggregationGraph`] for one rank of a distributed graph.

use super::AggregationGraph;
use crate::aggregation_error::AggregationError;
use crate::algs::communicator::Communicator;
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;
use std::collections::BTreeSet;

/// Rank-local piece of a distributed graph in compressed sparse row form.
///
/// Only local rows are stored; ghost vertices have empty neighbor lists, as
/// the rows of a distributed matrix live on their owner.
#[derive(Debug, Clone)]
pub struct DistributedGraph<C> {
    offsets: Vec<usize>,
    adjacency: Vec<usize>,
    global_ids: Vec<u64>,
    ghost_owners: Vec<usize>,
    global_edge_count: u64,
    comm: C,
}

impl<C: Communicator> DistributedGraph<C> {
    /// Build from CSR parts.
    ///
    /// `offsets` has length `n_local + 1`; `global_ids` covers local then ghost
    /// vertices; `ghost_owners[k]` is the rank owning ghost `n_local + k`.
    pub fn new(
        offsets: Vec<usize>,
        adjacency: Vec<usize>,
        global_ids: Vec<u64>,
        ghost_owners: Vec<usize>,
        global_edge_count: u64,
        comm: C,
    ) -> Result<Self, AggregationError> {
        let Some(n_local) = offsets.len().checked_sub(1) else {
            return Err(AggregationError::InvalidGraph(
                "offsets must have length n_local + 1".into(),
            ));
        };
        if offsets[0] != 0 || offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(AggregationError::InvalidGraph(
                "offsets must start at 0 and be monotone".into(),
            ));
        }
        if offsets[n_local] != adjacency.len() {
            return Err(AggregationError::InvalidGraph(format!(
                "offsets end at {} but adjacency has {} entries",
                offsets[n_local],
                adjacency.len()
            )));
        }
        let n_total = n_local + ghost_owners.len();
        if global_ids.len() != n_total {
            return Err(AggregationError::InvalidGraph(format!(
                "expected {n_total} global ids, got {}",
                global_ids.len()
            )));
        }
        if let Some(&bad) = adjacency.iter().find(|&&u| u >= n_total) {
            return Err(AggregationError::InvalidGraph(format!(
                "neighbor index {bad} out of range for {n_total} vertices"
            )));
        }
        let me = comm.rank();
        if let Some(k) = ghost_owners
            .iter()
            .position(|&o| o == me || o >= comm.size())
        {
            return Err(AggregationError::InvalidGraph(format!(
                "ghost {} has invalid owner {}",
                global_ids[n_local + k],
                ghost_owners[k]
            )));
        }
        let mut seen = HashSet::with_capacity(n_total);
        if let Some(dup) = global_ids.iter().find(|&&g| !seen.insert(g)) {
            return Err(AggregationError::InvalidGraph(format!(
                "global id {dup} appears twice"
            )));
        }
        Ok(Self {
            offsets,
            adjacency,
            global_ids,
            ghost_owners,
            global_edge_count,
            comm,
        })
    }

    /// Global ids of all local then ghost vertices.
    pub fn global_ids(&self) -> &[u64] {
        &self.global_ids
    }
}

impl<C: Communicator> AggregationGraph for DistributedGraph<C> {
    type Comm = C;

    fn local_vertex_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn ghost_vertex_count(&self) -> usize {
        self.ghost_owners.len()
    }

    fn neighbors(&self, v: usize) -> &[usize] {
        if v < self.local_vertex_count() {
            &self.adjacency[self.offsets[v]..self.offsets[v + 1]]
        } else {
            &[]
        }
    }

    fn global_id(&self, v: usize) -> u64 {
        self.global_ids[v]
    }

    fn owner(&self, v: usize) -> usize {
        let n_local = self.local_vertex_count();
        if v < n_local {
            self.comm.rank()
        } else {
            self.ghost_owners[v - n_local]
        }
    }

    fn global_edge_count(&self) -> u64 {
        self.global_edge_count
    }

    fn communicator(&self) -> &C {
        &self.comm
    }
}

/// Extract this rank's view of a global undirected graph.
///
/// `parts[g]` names the rank owning global vertex `g`. Locals are the owned
/// ids in increasing order, ghosts are off-rank neighbors of locals in
/// increasing id order. Self-loops are dropped and duplicate neighbors
/// collapsed.
pub fn distribute_graph<C: Communicator>(
    global_adjacency: &[Vec<usize>],
    parts: &[usize],
    comm: C,
) -> Result<DistributedGraph<C>, AggregationError> {
    let n = global_adjacency.len();
    if parts.len() != n {
        return Err(AggregationError::InvalidGraph(format!(
            "partition has {} entries for {n} vertices",
            parts.len()
        )));
    }
    if let Some(g) = parts.iter().position(|&p| p >= comm.size()) {
        return Err(AggregationError::InvalidGraph(format!(
            "vertex {g} assigned to rank {} of {}",
            parts[g],
            comm.size()
        )));
    }
    if let Some(&bad) = global_adjacency.iter().flatten().find(|&&u| u >= n) {
        return Err(AggregationError::InvalidGraph(format!(
            "neighbor {bad} out of range for {n} vertices"
        )));
    }

    let clean = |g: usize| -> Vec<usize> {
        global_adjacency[g]
            .iter()
            .copied()
            .filter(|&u| u != g)
            .sorted_unstable()
            .dedup()
            .collect()
    };

    let me = comm.rank();
    let locals: Vec<usize> = (0..n).filter(|&g| parts[g] == me).collect();
    let ghosts: BTreeSet<usize> = locals
        .iter()
        .flat_map(|&g| global_adjacency[g].iter().copied())
        .filter(|&u| parts[u] != me)
        .collect();

    let index: HashMap<usize, usize> = locals
        .iter()
        .chain(ghosts.iter())
        .enumerate()
        .map(|(i, &g)| (g, i))
        .collect();

    let mut offsets = Vec::with_capacity(locals.len() + 1);
    let mut adjacency = Vec::new();
    offsets.push(0);
    for &g in &locals {
        adjacency.extend(clean(g).into_iter().map(|u| index[&u]));
        offsets.push(adjacency.len());
    }

    let global_edge_count = (0..n).map(|g| clean(g).len() as u64).sum();
    let global_ids = locals.iter().chain(ghosts.iter()).map(|&g| g as u64).collect();
    let ghost_owners = ghosts.iter().map(|&g| parts[g]).collect();

    DistributedGraph::new(
        offsets,
        adjacency,
        global_ids,
        ghost_owners,
        global_edge_count,
        comm,
    )
}
