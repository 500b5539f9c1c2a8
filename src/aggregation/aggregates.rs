//! The aggregation result for one rank.
//!
//! Aggregate ids are numbered per winning process: a vertex belongs to the
//! aggregate identified by the pair `(proc_winner, vertex_to_aggregate)`.
//! Before a vertex has been through arbitration its winner is `None` and a
//! tentative id refers to this rank's numbering.

use crate::graph::AggregationGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregates {
    vertex_to_aggregate: Vec<Option<usize>>,
    is_root: Vec<bool>,
    proc_winner: Vec<Option<usize>>,
    global_ids: Vec<u64>,
    n_local: usize,
    rank: usize,
    aggregate_count: usize,
}

impl Aggregates {
    /// Empty aggregation covering every local and ghost vertex of `graph`.
    pub fn new<G: AggregationGraph>(graph: &G) -> Self {
        use crate::algs::communicator::Communicator;
        let n = graph.total_vertex_count();
        Self {
            vertex_to_aggregate: vec![None; n],
            is_root: vec![false; n],
            proc_winner: vec![None; n],
            global_ids: (0..n).map(|v| graph.global_id(v)).collect(),
            n_local: graph.local_vertex_count(),
            rank: graph.communicator().rank(),
            aggregate_count: 0,
        }
    }

    /// Aggregate id of `v`, `None` while unaggregated.
    pub fn vertex_to_aggregate(&self, v: usize) -> Option<usize> {
        self.vertex_to_aggregate[v]
    }

    pub fn is_root(&self, v: usize) -> bool {
        self.is_root[v]
    }

    /// Rank whose decision is authoritative for `v`, `None` while unassigned.
    pub fn proc_winner(&self, v: usize) -> Option<usize> {
        self.proc_winner[v]
    }

    /// Number of aggregates numbered by this rank.
    pub fn aggregate_count(&self) -> usize {
        self.aggregate_count
    }

    pub fn global_id(&self, v: usize) -> u64 {
        self.global_ids[v]
    }

    /// Vertex-id map of the aggregated graph (local then ghost).
    pub fn global_ids(&self) -> &[u64] {
        &self.global_ids
    }

    pub fn local_vertex_count(&self) -> usize {
        self.n_local
    }

    /// Local plus ghost vertices.
    pub fn len(&self) -> usize {
        self.vertex_to_aggregate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_to_aggregate.is_empty()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// True when `v` is counted in this rank's aggregate numbering: either this
    /// rank won it, or it has not been arbitrated yet.
    pub fn is_pending_or_won(&self, v: usize) -> bool {
        self.proc_winner[v].is_none_or(|w| w == self.rank)
    }

    /// Size of each of this rank's aggregates, counted over the copies this
    /// rank has won. Copies still awaiting arbitration are not counted, so
    /// between phase 1 and its first arbitration every size is zero.
    pub fn aggregate_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.aggregate_count];
        for v in 0..self.len() {
            if self.proc_winner[v] != Some(self.rank) {
                continue;
            }
            if let Some(size) = self.vertex_to_aggregate[v].and_then(|a| sizes.get_mut(a)) {
                *size += 1;
            }
        }
        sizes
    }

    /// Vertices (local or ghost) tentatively or definitively in this rank's
    /// aggregate `agg`. Unlike [`aggregate_sizes`](Self::aggregate_sizes) this
    /// includes copies that have not been arbitrated yet.
    pub fn members(&self, agg: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&v| self.vertex_to_aggregate[v] == Some(agg) && self.is_pending_or_won(v))
            .collect()
    }

    /// Root vertices, in index order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_root
            .iter()
            .enumerate()
            .filter_map(|(v, &r)| r.then_some(v))
    }

    /// True when every local and ghost vertex has an aggregate.
    pub fn is_complete(&self) -> bool {
        self.vertex_to_aggregate.iter().all(Option::is_some)
    }

    pub(crate) fn assign(&mut self, v: usize, agg: Option<usize>) {
        self.vertex_to_aggregate[v] = agg;
    }

    pub(crate) fn set_root(&mut self, v: usize, root: bool) {
        self.is_root[v] = root;
    }

    pub(crate) fn set_proc_winner(&mut self, v: usize, winner: Option<usize>) {
        self.proc_winner[v] = winner;
    }

    pub(crate) fn set_aggregate_count(&mut self, n: usize) {
        self.aggregate_count = n;
    }

    /// Reserve the next aggregate id of this rank.
    pub(crate) fn allocate(&mut self) -> usize {
        self.aggregate_count += 1;
        self.aggregate_count - 1
    }
}
