//! Explicit logging collaborator for the aggregation phases.
//!
//! There is no global verbosity switch: the pipeline builds one [`PhaseLog`]
//! per run and hands it to each phase.

use super::options::Verbosity;
use std::fmt;

/// Pipeline stage, used for log lines and error context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    One,
    OneB,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Setup => "arbitration setup",
            Phase::One => "phase 1",
            Phase::OneB => "phase 1b",
            Phase::Two => "phase 2",
            Phase::Three => "phase 3",
            Phase::Four => "phase 4",
            Phase::Five => "phase 5",
            Phase::Six => "phase 6",
        };
        f.write_str(s)
    }
}

/// Routes phase diagnostics to the `log` facade according to a [`Verbosity`].
///
/// Warnings and summaries describe global quantities and are emitted by rank 0
/// only; per-round details are emitted by every rank.
#[derive(Debug, Clone)]
pub struct PhaseLog {
    label: String,
    rank: usize,
    verbosity: Verbosity,
}

impl PhaseLog {
    pub fn new(label: impl Into<String>, rank: usize, verbosity: Verbosity) -> Self {
        Self {
            label: label.into(),
            rank,
            verbosity,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Heuristic shortfall; never an error.
    pub fn warn(&self, phase: Phase, args: fmt::Arguments<'_>) {
        if self.rank == 0 && self.verbosity >= Verbosity::Low {
            log::warn!("Aggregation({}) : {} (WARNING) - {}", self.label, phase, args);
        }
    }

    pub fn summary(&self, phase: Phase, args: fmt::Arguments<'_>) {
        if self.rank == 0 && self.verbosity >= Verbosity::Medium {
            log::info!("Aggregation({}) : {} - {}", self.label, phase, args);
        }
    }

    pub fn detail(&self, phase: Phase, args: fmt::Arguments<'_>) {
        if self.verbosity >= Verbosity::High {
            log::debug!(
                "Aggregation({}) [rank {}] : {} - {}",
                self.label,
                self.rank,
                phase,
                args
            );
        }
    }
}
