// Aggregates a 2-D grid graph partitioned into row blocks across however many
// MPI ranks the program is launched on, then prints each rank's share and the
// global summary from rank 0.
//
//   mpirun -n 4 cargo run --example mpi_aggregate --features mpi-support
fn main() {
    use amg_aggregate::prelude::*;
    use mpi::collective::CommunicatorCollectives;

    let comm = match MpiComm::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("MPI initialization failed: {e}");
            return;
        }
    };
    let (rank, size) = (comm.rank(), comm.size());

    let (nx, ny) = (40, 30);
    let adj: Vec<Vec<usize>> = (0..nx * ny)
        .map(|v| {
            let (x, y) = (v % nx, v / nx);
            let mut nb = Vec::with_capacity(4);
            if x > 0 {
                nb.push(v - 1);
            }
            if x + 1 < nx {
                nb.push(v + 1);
            }
            if y > 0 {
                nb.push(v - nx);
            }
            if y + 1 < ny {
                nb.push(v + nx);
            }
            nb
        })
        .collect();
    let parts: Vec<usize> = (0..adj.len()).map(|g| (g / nx) * size / ny).collect();

    let graph = match distribute_graph(&adj, &parts, comm) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("rank {rank}: {e}");
            return;
        }
    };
    let opts = AggregationOptions::default()
        .with_min_nodes_per_aggregate(3)
        .with_verbosity(Verbosity::Medium);
    match build_aggregates(&graph, &opts) {
        Ok((aggs, summary)) => {
            println!(
                "rank {rank}: {} local vertices, {} ghosts, {} aggregates",
                graph.local_vertex_count(),
                graph.ghost_vertex_count(),
                aggs.aggregate_count()
            );
            graph.communicator().world.barrier();
            if rank == 0 {
                println!("summary: {summary:?}");
            }
        }
        Err(e) => eprintln!("rank {rank}: aggregation failed: {e}"),
    }
}
