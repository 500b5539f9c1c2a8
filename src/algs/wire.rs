//! Fixed little-endian wire types for the arbitration and collective paths.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a received byte buffer into owned records.
///
/// The receive buffer is not guaranteed to be aligned for `T`, so records are
/// copied out with `pod_read_unaligned`.
pub fn decode_records<T: Pod>(bytes: &[u8], expected: usize) -> Result<Vec<T>, String> {
    expect_exact_len(bytes.len(), expected * size_of::<T>())?;
    Ok(bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Sentinel for "no value" in optional u64 slots.
pub const WIRE_NONE: u64 = u64::MAX;

#[inline]
pub fn opt_to_wire(v: Option<usize>) -> u64 {
    v.map_or(WIRE_NONE, |x| x as u64)
}

#[inline]
pub fn opt_from_wire(w: u64) -> Option<usize> {
    (w != WIRE_NONE).then_some(w as usize)
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32, // count of following records
}
impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// A single u64 scalar, used by the all-reduce collectives.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireScalar {
    pub v_le: u64,
}
impl WireScalar {
    pub fn new(v: u64) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.v_le)
    }
}

/// A global vertex id announced by a ghost holder to the vertex owner.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireGid {
    pub gid_le: u64,
}
impl WireGid {
    pub fn of(gid: u64) -> Self {
        Self { gid_le: gid.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.gid_le)
    }
}

/// A holder's claim on a shared vertex: `(gid, weight, aggregate)`.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireClaim {
    pub gid_le: u64,
    pub weight_le: u64,
    pub agg_le: u64,
}
impl WireClaim {
    pub fn new(gid: u64, weight: u64, agg: Option<usize>) -> Self {
        Self {
            gid_le: gid.to_le(),
            weight_le: weight.to_le(),
            agg_le: opt_to_wire(agg).to_le(),
        }
    }
    pub fn gid(&self) -> u64 {
        u64::from_le(self.gid_le)
    }
    pub fn weight(&self) -> u64 {
        u64::from_le(self.weight_le)
    }
    pub fn agg(&self) -> Option<usize> {
        opt_from_wire(u64::from_le(self.agg_le))
    }
}

/// The owner's verdict on a shared vertex: `(gid, winner, aggregate)`.
/// `winner == WIRE_NONE` means the vertex was not decided this round.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireVerdict {
    pub gid_le: u64,
    pub winner_le: u64,
    pub agg_le: u64,
}
impl WireVerdict {
    pub fn new(gid: u64, winner: Option<usize>, agg: Option<usize>) -> Self {
        Self {
            gid_le: gid.to_le(),
            winner_le: opt_to_wire(winner).to_le(),
            agg_le: opt_to_wire(agg).to_le(),
        }
    }
    pub fn gid(&self) -> u64 {
        u64::from_le(self.gid_le)
    }
    pub fn winner(&self) -> Option<usize> {
        opt_from_wire(u64::from_le(self.winner_le))
    }
    pub fn agg(&self) -> Option<usize> {
        opt_from_wire(u64::from_le(self.agg_le))
    }
}

const_assert_eq!(size_of::<WireCount>(), 4);
const_assert_eq!(size_of::<WireScalar>(), 8);
const_assert_eq!(size_of::<WireClaim>(), 24);
const_assert_eq!(size_of::<WireVerdict>(), 24);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_preserves_unaggregated_sentinel() {
        let c = WireClaim::new(17, 2, None);
        assert_eq!(c.gid(), 17);
        assert_eq!(c.weight(), 2);
        assert_eq!(c.agg(), None);
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let recs = [WireGid::of(1), WireGid::of(2)];
        let bytes = cast_slice(&recs);
        assert!(decode_records::<WireGid>(&bytes[..12], 2).is_err());
        let back = decode_records::<WireGid>(bytes, 2).unwrap();
        assert_eq!(back[1].get(), 2);
    }
}
