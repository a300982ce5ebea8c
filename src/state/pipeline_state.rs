//! Pipeline state definitions for the shutdown protocol
//!
//! The orchestrator moves strictly forward through these states; the
//! aggregation channel may only close once `Draining` has completed.

use crate::HarvestError;
use std::fmt;

/// Represents the lifecycle phase of a crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Walker is fetching listing pages; enrichers and sink run alongside
    Running,

    /// Walker has stopped; waiting for every launched enricher to finish
    Draining,

    /// Aggregation channel closed; sink has drained and flushed
    Closed,
}

impl PipelineState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }


    /// Returns true if `next` is the single legal successor of this state
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining) | (Self::Draining, Self::Closed)
        )
    }

    /// Moves to `next`, rejecting skipped or backward transitions
    pub fn transition(self, next: PipelineState) -> Result<PipelineState, HarvestError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns a short lowercase name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
