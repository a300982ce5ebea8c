//! Ban signal shared by the walker and every enrichment task

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Shared record of ban signals seen anywhere in the pipeline
///
/// Every occurrence is logged once, here. When escalation is enabled the
/// first occurrence cancels the crawl: the walker stops launching work and
/// pending enrichers skip their requests.
#[derive(Debug)]
pub struct BanSignal {
    token: CancellationToken,
    escalate: bool,
    occurrences: AtomicU64,
}

impl BanSignal {
    pub fn new(escalate: bool) -> Self {
        Self {
            token: CancellationToken::new(),
            escalate,
            occurrences: AtomicU64::new(0),
        }
    }

    /// Records a ban observed while requesting `url` during `stage`
    pub fn raise(&self, url: &str, stage: &str) {
        let occurrence = self.occurrences.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::error!(
            url,
            stage,
            occurrence,
            "Ban signal: the origin appears to have blocked this client"
        );

        if self.escalate && !self.token.is_cancelled() {
            tracing::error!("Aborting crawl after ban signal");
            self.token.cancel();
        }
    }

    /// Returns true once an escalated ban has cancelled the crawl
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when an escalated ban cancels the crawl
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    /// Number of ban signals raised so far
    pub fn occurrences(&self) -> u64 {
        self.occurrences.load(Ordering::Relaxed)
    }
}
