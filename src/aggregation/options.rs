//! Configuration bundle for one aggregation run.

use crate::aggregation_error::AggregationError;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Order in which phase 1 visits local vertices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordering {
    /// Index order.
    #[default]
    Natural,
    /// Fixed pseudo-random permutation derived from `rng_seed` and the rank.
    Random,
    /// Breadth-first through a FIFO of newly touched neighbors.
    Graph,
}

/// How much the pipeline reports through the `log` facade.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    None,
    /// Heuristic-shortfall warnings only.
    #[default]
    Low,
    /// Adds per-phase global summaries.
    Medium,
    /// Adds per-rank arbitration statistics.
    High,
}

/// Immutable options for [`build_aggregates`](super::build_aggregates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationOptions {
    pub min_nodes_per_aggregate: usize,
    /// Phase 1 rejects a root candidate with more already-selected neighbors than this.
    pub max_neigh_already_selected: usize,
    pub ordering: Ordering,
    /// Exponent applied to the aggregated fraction in phase 3.
    pub phase3_agg_creation: f64,
    pub verbosity: Verbosity,
    pub rng_seed: u64,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            min_nodes_per_aggregate: 1,
            max_neigh_already_selected: 0,
            ordering: Ordering::Natural,
            phase3_agg_creation: 0.5,
            verbosity: Verbosity::Low,
            rng_seed: 42,
        }
    }
}

impl AggregationOptions {
    pub fn with_min_nodes_per_aggregate(mut self, n: usize) -> Self {
        self.min_nodes_per_aggregate = n;
        self
    }

    pub fn with_max_neigh_already_selected(mut self, n: usize) -> Self {
        self.max_neigh_already_selected = n;
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_phase3_agg_creation(mut self, exponent: f64) -> Self {
        self.phase3_agg_creation = exponent;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Deterministic generator for one randomized stage on one rank.
    pub(crate) fn rank_rng(&self, rank: usize, stream: u64) -> SmallRng {
        let mix = (rank as u64)
            .wrapping_add(1)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ stream.rotate_left(32);
        SmallRng::seed_from_u64(self.rng_seed ^ mix)
    }

    pub fn validate(&self) -> Result<(), AggregationError> {
        if !self.phase3_agg_creation.is_finite() || self.phase3_agg_creation < 0.0 {
            return Err(AggregationError::InvalidOptions(format!(
                "phase3_agg_creation must be finite and non-negative, got {}",
                self.phase3_agg_creation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let opts: AggregationOptions =
            serde_json::from_str(r#"{"min_nodes_per_aggregate": 3, "ordering": "graph"}"#)
                .unwrap();
        assert_eq!(opts.min_nodes_per_aggregate, 3);
        assert_eq!(opts.ordering, Ordering::Graph);
        assert_eq!(opts.phase3_agg_creation, 0.5);
        assert_eq!(opts.verbosity, Verbosity::Low);
    }

    #[test]
    fn validate_rejects_nan_exponent() {
        let opts = AggregationOptions::default().with_phase3_agg_creation(f64::NAN);
        assert!(matches!(
            opts.validate(),
            Err(AggregationError::InvalidOptions(_))
        ));
        assert!(AggregationOptions::default().validate().is_ok());
    }

    #[test]
    fn verbosity_is_ordered() {
        assert!(Verbosity::None < Verbosity::Low);
        assert!(Verbosity::Medium < Verbosity::High);
    }
}
