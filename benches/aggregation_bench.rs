use amg_aggregate::prelude::*;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn grid(n: usize) -> Vec<Vec<usize>> {
    (0..n * n)
        .map(|v| {
            let (x, y) = (v % n, v / n);
            let mut nb = Vec::with_capacity(4);
            if x > 0 {
                nb.push(v - 1);
            }
            if x + 1 < n {
                nb.push(v + 1);
            }
            if y > 0 {
                nb.push(v - n);
            }
            if y + 1 < n {
                nb.push(v + n);
            }
            nb
        })
        .collect()
}

fn bench_serial(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_grid_serial");
    for &n in &[32usize, 64, 128] {
        let adj = grid(n);
        let graph = distribute_graph(&adj, &vec![0; n * n], NoComm).unwrap();
        let opts = AggregationOptions::default()
            .with_min_nodes_per_aggregate(3)
            .with_verbosity(Verbosity::None);
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &graph, |b, g| {
            b.iter(|| build_aggregates(g, &opts).unwrap())
        });
    }
    group.finish();
}

fn bench_local_ranks(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_grid_4_ranks");
    group.sample_size(20);
    let n = 64;
    let adj = grid(n);
    let parts: Vec<usize> = (0..n * n).map(|g| (g / n) * 4 / n).collect();
    let opts = AggregationOptions::default()
        .with_min_nodes_per_aggregate(3)
        .with_verbosity(Verbosity::None);
    group.bench_function(BenchmarkId::from_parameter(n * n), |b| {
        b.iter(|| {
            let world = LocalComm::world(4);
            std::thread::scope(|s| {
                for comm in world {
                    let (adj, parts, opts) = (&adj, &parts, &opts);
                    s.spawn(move || {
                        let g = distribute_graph(adj, parts, comm).unwrap();
                        build_aggregates(&g, opts).unwrap()
                    });
                }
            });
        })
    });
    group.finish();
}

criterion_group!(benches, bench_serial, bench_local_ranks);
criterion_main!(benches);
