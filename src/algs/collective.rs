//! Collective helpers built on the point-to-point [`Communicator`].
//!
//! Every helper posts all receives first, then all sends, and drains every
//! handle before returning, even when a receive fails. The first failure is
//! reported after draining.

use crate::aggregation_error::AggregationError;
use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireCount, WireScalar, cast_slice, decode_records};
use bytemuck::Pod;
use std::collections::{BTreeMap, BTreeSet};
use std::mem::size_of;

/// Base tag for the all-reduce family.
pub const REDUCE_TAG: CommTag = CommTag::new(0x7100);

/// Reduction applied by [`all_reduce`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

impl ReduceOp {
    fn fold(self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Sum => a.saturating_add(b),
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    fn tag(self) -> CommTag {
        match self {
            ReduceOp::Sum => REDUCE_TAG,
            ReduceOp::Min => REDUCE_TAG.offset(1),
            ReduceOp::Max => REDUCE_TAG.offset(2),
        }
    }
}

/// Combine `value` across all ranks; every rank receives the same result.
pub fn all_reduce<C: Communicator>(
    comm: &C,
    value: u64,
    op: ReduceOp,
) -> Result<u64, AggregationError> {
    let me = comm.rank();
    let peers: Vec<usize> = (0..comm.size()).filter(|&r| r != me).collect();
    if peers.is_empty() {
        return Ok(value);
    }
    let tag = op.tag().as_u16();

    let mut pending_recvs = Vec::with_capacity(peers.len());
    for &peer in &peers {
        let mut buf = [0u8; size_of::<WireScalar>()];
        pending_recvs.push((peer, comm.irecv(peer, tag, &mut buf)));
    }
    let payload = [WireScalar::new(value)];
    let pending_sends: Vec<_> = peers
        .iter()
        .map(|&peer| comm.isend(peer, tag, cast_slice(&payload)))
        .collect();

    // Fold in rank order so that every rank computes bit-identical results.
    let mut contributions = BTreeMap::new();
    contributions.insert(me, value);
    let mut maybe_err = None;
    for (peer, h) in pending_recvs {
        match h.wait() {
            Some(data) => match decode_records::<WireScalar>(&data, 1) {
                Ok(v) => {
                    contributions.insert(peer, v[0].get());
                }
                Err(e) if maybe_err.is_none() => {
                    maybe_err = Some(AggregationError::comm(peer, e));
                }
                Err(_) => {}
            },
            None if maybe_err.is_none() => {
                maybe_err = Some(AggregationError::comm(
                    peer,
                    format!("no reduction contribution from rank {peer}"),
                ));
            }
            None => {}
        }
    }
    for send in pending_sends {
        let _ = send.wait();
    }
    if let Some(err) = maybe_err {
        return Err(err);
    }
    let mut values = contributions.into_values();
    let first = values.next().unwrap_or(value);
    Ok(values.fold(first, |acc, v| op.fold(acc, v)))
}

pub fn sum_all<C: Communicator>(comm: &C, value: u64) -> Result<u64, AggregationError> {
    all_reduce(comm, value, ReduceOp::Sum)
}

pub fn min_all<C: Communicator>(comm: &C, value: u64) -> Result<u64, AggregationError> {
    all_reduce(comm, value, ReduceOp::Min)
}

pub fn max_all<C: Communicator>(comm: &C, value: u64) -> Result<u64, AggregationError> {
    all_reduce(comm, value, ReduceOp::Max)
}

/// Exchange item counts with every rank in `all_neighbors`, sending
/// `links[nbr].len()` (zero when absent). Returns `nbr → count received`.
pub fn exchange_sizes_symmetric<C, T>(
    links: &BTreeMap<usize, Vec<T>>,
    comm: &C,
    tag: CommTag,
    all_neighbors: &BTreeSet<usize>,
) -> Result<BTreeMap<usize, usize>, AggregationError>
where
    C: Communicator,
{
    // 1) post all receives
    let mut recv_size = Vec::with_capacity(all_neighbors.len());
    for &nbr in all_neighbors {
        let mut buf = [0u8; size_of::<WireCount>()];
        recv_size.push((nbr, comm.irecv(nbr, tag.as_u16(), &mut buf)));
    }

    // 2) post all sends
    let mut pending_sends = Vec::with_capacity(all_neighbors.len());
    for &nbr in all_neighbors {
        let count = [WireCount::new(links.get(&nbr).map_or(0, |v| v.len()))];
        pending_sends.push(comm.isend(nbr, tag.as_u16(), cast_slice(&count)));
    }

    // 3) wait for all recvs, collect counts (but do not early-return)
    let mut sizes_in = BTreeMap::new();
    let mut maybe_err = None;
    for (nbr, h) in recv_size {
        match h.wait() {
            Some(data) => match decode_records::<WireCount>(&data, 1) {
                Ok(cnt) => {
                    sizes_in.insert(nbr, cnt[0].get());
                }
                Err(e) if maybe_err.is_none() => {
                    maybe_err = Some(AggregationError::comm(nbr, format!("size header: {e}")));
                }
                Err(_) => {}
            },
            None if maybe_err.is_none() => {
                maybe_err = Some(AggregationError::comm(
                    nbr,
                    format!("failed to receive size from rank {nbr}"),
                ));
            }
            None => {}
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(sizes_in),
    }
}

/// Send `outgoing[nbr]` to each neighbor and receive `incoming_counts[nbr]`
/// records back from each. Neighbors absent from a map exchange nothing.
pub fn exchange_records<C, T>(
    outgoing: &BTreeMap<usize, Vec<T>>,
    incoming_counts: &BTreeMap<usize, usize>,
    comm: &C,
    tag: CommTag,
) -> Result<BTreeMap<usize, Vec<T>>, AggregationError>
where
    C: Communicator,
    T: Pod,
{
    let mut pending_recvs = Vec::with_capacity(incoming_counts.len());
    for (&nbr, &n) in incoming_counts {
        let mut buf = vec![0u8; n * size_of::<T>()];
        pending_recvs.push((nbr, n, comm.irecv(nbr, tag.as_u16(), &mut buf)));
    }

    let pending_sends: Vec<_> = outgoing
        .iter()
        .map(|(&nbr, items)| comm.isend(nbr, tag.as_u16(), cast_slice(items)))
        .collect();

    let mut received = BTreeMap::new();
    let mut maybe_err = None;
    for (nbr, n, h) in pending_recvs {
        match h.wait() {
            Some(data) => match decode_records::<T>(&data, n) {
                Ok(recs) => {
                    received.insert(nbr, recs);
                }
                Err(e) if maybe_err.is_none() => {
                    maybe_err = Some(AggregationError::comm(nbr, e));
                }
                Err(_) => {}
            },
            // zero-length messages may legitimately complete without data
            None if n == 0 => {
                received.insert(nbr, Vec::new());
            }
            None if maybe_err.is_none() => {
                maybe_err = Some(AggregationError::comm(
                    nbr,
                    format!("failed to receive {n} records from rank {nbr}"),
                ));
            }
            None => {}
        }
    }

    for send in pending_sends {
        let _ = send.wait();
    }

    match maybe_err {
        Some(err) => Err(err),
        None => Ok(received),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};
    use crate::algs::wire::WireGid;

    #[test]
    fn reductions_are_identity_on_one_rank() {
        assert_eq!(sum_all(&NoComm, 7).unwrap(), 7);
        assert_eq!(min_all(&NoComm, 7).unwrap(), 7);
        assert_eq!(max_all(&NoComm, 7).unwrap(), 7);
    }

    #[test]
    fn reductions_agree_across_three_ranks() {
        let world = LocalComm::world(3);
        let results: Vec<(u64, u64, u64)> = std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let v = 10 * (comm.rank() as u64 + 1);
                        (
                            sum_all(comm, v).unwrap(),
                            min_all(comm, v).unwrap(),
                            max_all(comm, v).unwrap(),
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for r in results {
            assert_eq!(r, (60, 10, 30));
        }
    }

    #[test]
    fn sizes_then_records_two_ranks() {
        let world = LocalComm::world(2);
        let got: Vec<Vec<u64>> = std::thread::scope(|s| {
            let handles: Vec<_> = world
                .iter()
                .map(|comm| {
                    s.spawn(move || {
                        let me = comm.rank();
                        let peer = 1 - me;
                        let mut out = BTreeMap::new();
                        if me == 0 {
                            out.insert(peer, vec![WireGid::of(5), WireGid::of(6)]);
                        }
                        let nbrs: BTreeSet<usize> = [peer].into_iter().collect();
                        let sizes =
                            exchange_sizes_symmetric(&out, comm, CommTag::new(0x10), &nbrs)
                                .unwrap();
                        let counts: BTreeMap<usize, usize> =
                            sizes.into_iter().filter(|&(_, n)| n > 0).collect();
                        let recvd =
                            exchange_records(&out, &counts, comm, CommTag::new(0x11)).unwrap();
                        recvd
                            .values()
                            .flat_map(|v| v.iter().map(|g| g.get()))
                            .collect()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(got[0].is_empty());
        assert_eq!(got[1], vec![5, 6]);
    }
}
