//! Transient phase-1 bookkeeping: per-vertex selection state and the
//! supernode arena holding accepted aggregates.

use super::report::Phase;
use crate::aggregation_error::AggregationError;

/// Selection state of a vertex during phase 1.
///
/// Every vertex starts `Ready`; no transition leads back to `Ready`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VertexState {
    /// May still become a root.
    #[default]
    Ready,
    /// Rejected as a root; may still be swept into a neighbor's aggregate.
    NotSelected,
    /// Member of an aggregate.
    Selected,
}

impl VertexState {
    /// True when the vertex may still join a candidate aggregate.
    pub fn is_claimable(self) -> bool {
        match self {
            VertexState::Ready | VertexState::NotSelected => true,
            VertexState::Selected => false,
        }
    }

    /// Reject as a root candidate.
    pub fn reject(&mut self) {
        *self = match *self {
            VertexState::Ready => VertexState::NotSelected,
            VertexState::NotSelected => VertexState::NotSelected,
            VertexState::Selected => VertexState::Selected,
        };
    }

    /// Move into an aggregate.
    pub fn select(&mut self) {
        *self = match *self {
            VertexState::Ready | VertexState::NotSelected | VertexState::Selected => {
                VertexState::Selected
            }
        };
    }
}

/// Grow `buf` so that it can hold `additional` more entries, reporting
/// failure as [`AggregationError::Allocation`].
pub fn try_reserve(
    buf: &mut Vec<usize>,
    additional: usize,
    phase: Phase,
) -> Result<(), AggregationError> {
    buf.try_reserve(additional)
        .map_err(|_| AggregationError::Allocation {
            phase,
            requested: additional,
        })
}

/// Flat arena of accepted aggregates; aggregate `i` occupies
/// `members[starts[i]..starts[i + 1]]`.
#[derive(Debug, Clone)]
pub struct SupernodeArena {
    members: Vec<usize>,
    starts: Vec<usize>,
}

impl Default for SupernodeArena {
    fn default() -> Self {
        Self {
            members: Vec::new(),
            starts: vec![0],
        }
    }
}

impl SupernodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an aggregate and return its index.
    pub fn push(&mut self, members: &[usize]) -> Result<usize, AggregationError> {
        try_reserve(&mut self.members, members.len(), Phase::One)?;
        self.members.extend_from_slice(members);
        self.starts.push(self.members.len());
        Ok(self.starts.len() - 2)
    }

    pub fn len(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> &[usize] {
        &self.members[self.starts[i]..self.starts[i + 1]]
    }
}
