//! Ownership arbitration for vertices shared across ranks.
//!
//! Every shared vertex has exactly one owner (the rank holding it as a local
//! vertex) and any number of holders (ranks holding it as a ghost). A round
//! of arbitration is a claim/verdict exchange through the owner:
//!
//! 1. holders send `(gid, weight, aggregate)` for each ghost copy to its owner,
//! 2. the owner picks a winner among the nonzero claims, its own included:
//!    greatest weight wins, equal weights go to the lowest rank,
//! 3. the owner sends `(gid, winner, aggregate)` back to every holder.
//!
//! Vertices claimed by nobody are left untouched.

use crate::aggregation::aggregates::Aggregates;
use crate::aggregation::report::Phase;
use crate::aggregation_error::AggregationError;
use crate::algs::collective::{exchange_records, exchange_sizes_symmetric};
use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::wire::{WireClaim, WireGid, WireVerdict};
use crate::graph::AggregationGraph;
use hashbrown::HashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Base tag for the arbitration protocol: setup sizes, setup gids, claims, verdicts.
pub const ARBITRATION_TAG: CommTag = CommTag::new(0x7200);

const SETUP_SIZES: CommTag = ARBITRATION_TAG;
const SETUP_GIDS: CommTag = ARBITRATION_TAG.offset(1);
const CLAIMS: CommTag = ARBITRATION_TAG.offset(2);
const VERDICTS: CommTag = ARBITRATION_TAG.offset(3);

/// Claim strength per local and ghost vertex; `0` means no claim this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimWeights {
    weights: Vec<u64>,
}

impl ClaimWeights {
    pub fn new(len: usize) -> Self {
        Self {
            weights: vec![0; len],
        }
    }

    pub fn set(&mut self, v: usize, weight: u64) {
        self.weights[v] = weight;
    }

    pub fn get(&self, v: usize) -> u64 {
        self.weights[v]
    }

    /// Withdraw every claim.
    pub fn reset(&mut self) {
        self.weights.fill(0);
    }

    pub fn is_zero(&self) -> bool {
        self.weights.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Outcome of one arbitration round, seen from the owning side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArbitrationStats {
    /// Local vertices that received a winner this round.
    pub decided: usize,
    /// Of those, vertices won by another rank.
    pub lost: usize,
}

#[derive(Clone, Copy)]
struct Claim {
    weight: u64,
    rank: usize,
    agg: Option<usize>,
}

impl Claim {
    fn beats(&self, other: &Claim) -> bool {
        self.weight > other.weight || (self.weight == other.weight && self.rank < other.rank)
    }
}

/// Holds the claim/verdict routing of one graph; built once per aggregation run.
pub struct Arbiter<'g, C: Communicator> {
    comm: &'g C,
    n_local: usize,
    /// owner rank -> ghost vertices held here, in announcement order
    imports: BTreeMap<usize, Vec<usize>>,
    /// holder rank -> local vertices it holds copies of, in announcement order
    exports: BTreeMap<usize, Vec<usize>>,
    shared: Vec<bool>,
}

impl<'g, C: Communicator> Arbiter<'g, C> {
    /// Collective: every rank must call this with its piece of the same graph.
    pub fn new<G>(graph: &'g G) -> Result<Self, AggregationError>
    where
        G: AggregationGraph<Comm = C>,
    {
        let comm = graph.communicator();
        let me = comm.rank();
        let n_local = graph.local_vertex_count();
        let n_total = graph.total_vertex_count();

        let mut imports: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for v in n_local..n_total {
            imports.entry(graph.owner(v)).or_default().push(v);
        }

        let peers: BTreeSet<usize> = (0..comm.size()).filter(|&r| r != me).collect();
        let sizes = exchange_sizes_symmetric(&imports, comm, SETUP_SIZES, &peers)?;
        let counts: BTreeMap<usize, usize> = sizes.into_iter().filter(|&(_, n)| n > 0).collect();

        let announce: BTreeMap<usize, Vec<WireGid>> = imports
            .iter()
            .map(|(&owner, ghosts)| {
                let gids = ghosts.iter().map(|&v| WireGid::of(graph.global_id(v)));
                (owner, gids.collect())
            })
            .collect();
        let announced = exchange_records(&announce, &counts, comm, SETUP_GIDS)?;

        let local_index: HashMap<u64, usize> =
            (0..n_local).map(|v| (graph.global_id(v), v)).collect();
        let mut shared = vec![false; n_total];
        shared[n_local..].fill(true);

        let mut exports = BTreeMap::new();
        for (holder, gids) in announced {
            let mut locals = Vec::with_capacity(gids.len());
            for gid in gids.iter().map(WireGid::get) {
                let Some(&v) = local_index.get(&gid) else {
                    return Err(AggregationError::StructuralViolation {
                        phase: Phase::Setup,
                        vertex: gid,
                        detail: format!("rank {holder} holds a copy of a vertex rank {me} does not own"),
                    });
                };
                shared[v] = true;
                locals.push(v);
            }
            exports.insert(holder, locals);
        }

        Ok(Self {
            comm,
            n_local,
            imports,
            exports,
            shared,
        })
    }

    /// True when more than one rank holds a copy of `v`.
    pub fn is_shared(&self, v: usize) -> bool {
        self.shared[v]
    }

    /// One collective claim/verdict round.
    ///
    /// For every vertex claimed with a nonzero weight on some rank, writes the
    /// winning rank and the winner's aggregate id into every copy. A copy won by
    /// another rank loses its root flag.
    pub fn arbitrate(
        &self,
        weights: &ClaimWeights,
        aggs: &mut Aggregates,
        phase: Phase,
    ) -> Result<ArbitrationStats, AggregationError> {
        if weights.len() != self.shared.len() || aggs.len() != self.shared.len() {
            return Err(AggregationError::StructuralViolation {
                phase,
                vertex: weights.len() as u64,
                detail: format!(
                    "arbitration over {} vertices with {} weights and {} aggregate slots",
                    self.shared.len(),
                    weights.len(),
                    aggs.len()
                ),
            });
        }
        let me = self.comm.rank();

        let claims_out: BTreeMap<usize, Vec<WireClaim>> = self
            .imports
            .iter()
            .map(|(&owner, ghosts)| {
                let recs = ghosts.iter().map(|&v| {
                    WireClaim::new(aggs.global_id(v), weights.get(v), aggs.vertex_to_aggregate(v))
                });
                (owner, recs.collect())
            })
            .collect();
        let claim_counts = self.counts(&self.exports);
        let claims_in = exchange_records(&claims_out, &claim_counts, self.comm, CLAIMS)?;

        let mut best: Vec<Option<Claim>> = (0..self.n_local)
            .map(|v| {
                (weights.get(v) > 0).then(|| Claim {
                    weight: weights.get(v),
                    rank: me,
                    agg: aggs.vertex_to_aggregate(v),
                })
            })
            .collect();
        for (holder, recs) in &claims_in {
            let locals = self.route(&self.exports, *holder);
            for (&v, rec) in locals.iter().zip(recs) {
                check_gid(aggs, v, rec.gid(), *holder, phase)?;
                if rec.weight() == 0 {
                    continue;
                }
                let claim = Claim {
                    weight: rec.weight(),
                    rank: *holder,
                    agg: rec.agg(),
                };
                if best[v].is_none_or(|cur| claim.beats(&cur)) {
                    best[v] = Some(claim);
                }
            }
        }

        let mut stats = ArbitrationStats::default();
        for (v, winner) in best.iter().enumerate() {
            if let Some(w) = winner {
                stats.decided += 1;
                if w.rank != me {
                    stats.lost += 1;
                }
                settle(aggs, v, w.rank, w.agg, me);
            }
        }

        let verdicts_out: BTreeMap<usize, Vec<WireVerdict>> = self
            .exports
            .iter()
            .map(|(&holder, locals)| {
                let recs = locals.iter().map(|&v| match best[v] {
                    Some(w) => WireVerdict::new(aggs.global_id(v), Some(w.rank), w.agg),
                    None => WireVerdict::new(aggs.global_id(v), None, None),
                });
                (holder, recs.collect())
            })
            .collect();
        let verdict_counts = self.counts(&self.imports);
        let verdicts_in = exchange_records(&verdicts_out, &verdict_counts, self.comm, VERDICTS)?;

        for (owner, recs) in &verdicts_in {
            let ghosts = self.route(&self.imports, *owner);
            for (&v, rec) in ghosts.iter().zip(recs) {
                check_gid(aggs, v, rec.gid(), *owner, phase)?;
                if let Some(winner) = rec.winner() {
                    settle(aggs, v, winner, rec.agg(), me);
                }
            }
        }
        Ok(stats)
    }

    fn counts(&self, lists: &BTreeMap<usize, Vec<usize>>) -> BTreeMap<usize, usize> {
        lists.iter().map(|(&r, l)| (r, l.len())).collect()
    }

    fn route<'a>(&self, lists: &'a BTreeMap<usize, Vec<usize>>, rank: usize) -> &'a [usize] {
        lists.get(&rank).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn settle(aggs: &mut Aggregates, v: usize, winner: usize, agg: Option<usize>, me: usize) {
    aggs.set_proc_winner(v, Some(winner));
    aggs.assign(v, agg);
    if winner != me {
        aggs.set_root(v, false);
    }
}

fn check_gid(
    aggs: &Aggregates,
    v: usize,
    got: u64,
    peer: usize,
    phase: Phase,
) -> Result<(), AggregationError> {
    if aggs.global_id(v) == got {
        Ok(())
    } else {
        Err(AggregationError::StructuralViolation {
            phase,
            vertex: aggs.global_id(v),
            detail: format!("rank {peer} sent a record for vertex {got} out of order"),
        })
    }
}
