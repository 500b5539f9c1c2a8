//! Communication layer and the collective protocols built on it.

pub mod arbitration;
pub mod collective;
pub mod communicator;
pub mod wire;

pub use arbitration::{Arbiter, ClaimWeights};
pub use collective::{max_all, min_all, sum_all};
