#![allow(dead_code)]
use amg_aggregate::prelude::*;
use std::collections::BTreeMap;

/// Path 0 - 1 - ... - (n-1).
pub fn path(n: usize) -> Vec<Vec<usize>> {
    (0..n)
        .map(|i| {
            [i.checked_sub(1), (i + 1 < n).then_some(i + 1)]
                .into_iter()
                .flatten()
                .collect()
        })
        .collect()
}

/// 5-point stencil on an `nx` by `ny` grid; `periodic` wraps both directions.
pub fn grid(nx: usize, ny: usize, periodic: bool) -> Vec<Vec<usize>> {
    let id = |x: usize, y: usize| y * nx + x;
    let mut adj = vec![Vec::new(); nx * ny];
    for y in 0..ny {
        for x in 0..nx {
            let v = id(x, y);
            let mut link = |u: usize| {
                if u != v && !adj[v].contains(&u) {
                    adj[v].push(u);
                    adj[u].push(v);
                }
            };
            if x + 1 < nx {
                link(id(x + 1, y));
            } else if periodic {
                link(id(0, y));
            }
            if y + 1 < ny {
                link(id(x, y + 1));
            } else if periodic {
                link(id(x, 0));
            }
        }
    }
    adj
}

pub fn clique(n: usize) -> Vec<Vec<usize>> {
    (0..n)
        .map(|i| (0..n).filter(|&j| j != i).collect())
        .collect()
}

pub fn isolated(n: usize) -> Vec<Vec<usize>> {
    vec![Vec::new(); n]
}

/// Contiguous blocks of roughly equal size.
pub fn blocks(n: usize, n_ranks: usize) -> Vec<usize> {
    (0..n).map(|g| g * n_ranks / n).collect()
}

/// Run `f` once per rank of a fresh in-process world, one thread per rank.
pub fn run_ranks<R, F>(n_ranks: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(LocalComm) -> R + Sync,
{
    let world = LocalComm::world(n_ranks);
    std::thread::scope(|s| {
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank panicked"))
            .collect()
    })
}

/// Full pipeline on every rank.
pub fn aggregate_on_ranks(
    adj: &[Vec<usize>],
    parts: &[usize],
    n_ranks: usize,
    options: &AggregationOptions,
) -> Vec<(Aggregates, AggregationSummary)> {
    run_ranks(n_ranks, |comm| {
        let g = distribute_graph(adj, parts, comm).expect("valid graph");
        build_aggregates(&g, options).expect("aggregation succeeds")
    })
}

/// `gid -> (winner, aggregate)` taken from each copy; panics when copies disagree.
pub fn assert_consistent(ranks: &[Aggregates]) -> BTreeMap<u64, (Option<usize>, Option<usize>)> {
    let mut seen = BTreeMap::new();
    for aggs in ranks {
        for v in 0..aggs.len() {
            let view = (aggs.proc_winner(v), aggs.vertex_to_aggregate(v));
            let gid = aggs.global_id(v);
            if let Some(prev) = seen.insert(gid, view) {
                assert_eq!(prev, view, "copies of vertex {gid} disagree");
            }
        }
    }
    seen
}

/// Global aggregate `(winner, id) -> owned members`, read from owner copies.
pub fn global_aggregates(ranks: &[Aggregates]) -> BTreeMap<(usize, usize), Vec<u64>> {
    let mut out: BTreeMap<(usize, usize), Vec<u64>> = BTreeMap::new();
    for aggs in ranks {
        for v in 0..aggs.local_vertex_count() {
            if let (Some(w), Some(a)) = (aggs.proc_winner(v), aggs.vertex_to_aggregate(v)) {
                out.entry((w, a)).or_default().push(aggs.global_id(v));
            }
        }
    }
    out
}
