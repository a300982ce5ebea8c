//! Termination reasons of the listing walker

use std::fmt;

/// Why the listing walker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkOutcome {
    /// The last page had no next-page link
    Exhausted,

    /// The item cap was used up
    CapReached,

    /// A listing page could not be fetched or parsed
    FetchFailed,

    /// A listing page came back degraded or forbidden
    Banned,

    /// The crawl was cancelled after a ban elsewhere in the pipeline
    Aborted,
}

impl WalkOutcome {
    /// Returns true if the walker stopped because of a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::Banned | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::CapReached => "cap_reached",
            Self::FetchFailed => "fetch_failed",
            Self::Banned => "banned",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for WalkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
