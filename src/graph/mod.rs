//! Read-only adjacency view consumed by the aggregation pipeline.
//!
//! Vertices live in one combined index space: `[0, n_local)` are owned by
//! this rank, `[n_local, n_local + n_ghost)` are ghost copies of vertices
//! owned elsewhere. Neighbor lists use the same space.

pub mod distributed;

pub use distributed::{DistributedGraph, distribute_graph};

use crate::algs::communicator::Communicator;

/// Graph abstraction for distributed aggregation.
///
/// All methods are read-only; the graph must not change while aggregation runs.
pub trait AggregationGraph {
    /// Communicator shared by every rank holding a piece of this graph.
    type Comm: Communicator;

    /// Number of vertices owned by this rank.
    fn local_vertex_count(&self) -> usize;

    /// Number of ghost (halo) vertices visible on this rank.
    fn ghost_vertex_count(&self) -> usize;

    /// Neighbors of `v` in the combined local+ghost index space.
    fn neighbors(&self, v: usize) -> &[usize];

    /// Global id of a local or ghost vertex.
    fn global_id(&self, v: usize) -> u64;

    /// Owning rank of `v`. Local vertices report this rank.
    fn owner(&self, v: usize) -> usize;

    /// Total number of directed adjacency entries across all ranks.
    fn global_edge_count(&self) -> u64;

    fn communicator(&self) -> &Self::Comm;

    /// Local plus ghost vertices.
    fn total_vertex_count(&self) -> usize {
        self.local_vertex_count() + self.ghost_vertex_count()
    }

    fn is_local(&self, v: usize) -> bool {
        v < self.local_vertex_count()
    }
}
