mod util;

use amg_aggregate::prelude::*;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use util::*;

/// Random undirected graph with `n` vertices and edge probability `p`.
fn random_graph(n: usize, p: f64, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut adj = vec![Vec::new(); n];
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.r#gen::<f64>() < p {
                adj[u].push(v);
                adj[v].push(u);
            }
        }
    }
    adj
}

fn ordering_strategy() -> impl Strategy<Value = Ordering> {
    prop_oneof![
        Just(Ordering::Natural),
        Just(Ordering::Random),
        Just(Ordering::Graph),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_graphs_aggregate_completely_and_consistently(
        n in 1usize..40,
        p in 0.0f64..0.3,
        seed in any::<u64>(),
        n_ranks in 1usize..4,
        min in 1usize..4,
        ordering in ordering_strategy(),
    ) {
        let adj = random_graph(n, p, seed);
        let mut rng = SmallRng::seed_from_u64(seed ^ 0xA5A5);
        let parts: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n_ranks)).collect();
        let opts = AggregationOptions::default()
            .with_min_nodes_per_aggregate(min)
            .with_ordering(ordering)
            .with_rng_seed(seed);

        let results = aggregate_on_ranks(&adj, &parts, n_ranks, &opts);
        let ranks: Vec<Aggregates> = results.iter().map(|(a, _)| a.clone()).collect();
        for aggs in &ranks {
            prop_assert!(aggs.is_complete());
        }
        let view = assert_consistent(&ranks);
        prop_assert_eq!(view.len(), n);
        prop_assert!(view.values().all(|(w, a)| w.is_some() && a.is_some()));

        let total: usize = ranks.iter().map(Aggregates::aggregate_count).sum();
        prop_assert_eq!(results[0].1.global_aggregates, total as u64);
    }
}
