//! AggregationError: unified error type for the aggregation pipeline.
//!
//! Only structural problems surface here. Heuristic shortfalls (small
//! aggregates, READY vertices left after phase 1) are logged and healed by
//! later phases; they never become an `Err`.

use crate::aggregation::report::Phase;
use thiserror::Error;

/// Unified error type for aggregation operations.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A supernode or candidate buffer could not be allocated.
    #[error("allocation of {requested} entries failed during {phase}")]
    Allocation { phase: Phase, requested: usize },
    /// Data received during arbitration contradicts the local graph view.
    #[error("structural violation at vertex {vertex} during {phase}: {detail}")]
    StructuralViolation {
        phase: Phase,
        vertex: u64,
        detail: String,
    },
    /// Communication with a neighbor rank failed or returned a malformed payload.
    #[error("communication error with rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The graph handed to the pipeline is malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
    /// The aggregation options are out of range.
    #[error("invalid aggregation options: {0}")]
    InvalidOptions(String),
}

impl AggregationError {
    pub(crate) fn comm(neighbor: usize, msg: impl Into<String>) -> Self {
        AggregationError::CommError {
            neighbor,
            source: msg.into().into(),
        }
    }
}
