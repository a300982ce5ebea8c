//! Crawl summary and per-outcome enrichment counts
//!
//! The summary is printed to standard error so it never mixes with CSV
//! rows written to standard output.

use crate::crawler::EnrichOutcome;
use crate::state::WalkOutcome;
use chrono::{DateTime, Utc};
use tokio::task::JoinError;

/// How the launched enrichment tasks ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentTally {
    pub emitted: u64,
    pub no_phone_control: u64,
    pub empty_phone: u64,
    pub detail_failed: u64,
    pub phone_failed: u64,
    pub banned: u64,
    pub cancelled: u64,
    pub sink_closed: u64,

    /// Tasks that panicked or were aborted by the runtime
    pub panicked: u64,
}

impl EnrichmentTally {
    /// Counts one finished task
    pub fn record(&mut self, outcome: EnrichOutcome) {
        let counter = match outcome {
            EnrichOutcome::Emitted => &mut self.emitted,
            EnrichOutcome::NoPhoneControl => &mut self.no_phone_control,
            EnrichOutcome::EmptyPhone => &mut self.empty_phone,
            EnrichOutcome::DetailFailed => &mut self.detail_failed,
            EnrichOutcome::PhoneFailed => &mut self.phone_failed,
            EnrichOutcome::Banned => &mut self.banned,
            EnrichOutcome::Cancelled => &mut self.cancelled,
            EnrichOutcome::SinkClosed => &mut self.sink_closed,
        };
        *counter += 1;
    }

    /// Counts one task that never returned an outcome
    pub fn record_panic(&mut self) {
        self.panicked += 1;
    }

    /// Counts one joined task, whether it returned or panicked
    pub fn record_joined(&mut self, joined: Result<EnrichOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.record(outcome),
            Err(e) => {
                tracing::error!("Enrichment task failed: {}", e);
                self.record_panic();
            }
        }
    }

    /// Number of tasks joined
    pub fn total(&self) -> u64 {
        self.emitted
            + self.no_phone_control
            + self.empty_phone
            + self.detail_failed
            + self.phone_failed
            + self.banned
            + self.cancelled
            + self.sink_closed
            + self.panicked
    }

    /// Tasks that ended without a row
    pub fn dropped(&self) -> u64 {
        self.total() - self.emitted
    }
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub walk_outcome: WalkOutcome,

    // First listing page
    pub category: Option<String>,
    pub total_count: Option<String>,

    // Walker
    pub pages_fetched: u64,
    pub items_launched: u64,
    pub entries_skipped: u64,

    // Enrichment
    pub enrichment: EnrichmentTally,

    // Sink
    pub rows_written: u64,
    pub rows_failed: u64,

    /// Ban signals raised anywhere in the pipeline
    pub ban_signals: u64,
}

impl CrawlSummary {
    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Returns true if the origin blocked the client at any stage
    pub fn was_banned(&self) -> bool {
        self.ban_signals > 0 || self.walk_outcome == WalkOutcome::Banned
    }

    /// Share of launched items that produced a row, as a percentage
    pub fn yield_rate(&self) -> f64 {
        if self.items_launched == 0 {
            return 0.0;
        }
        (self.rows_written as f64 / self.items_launched as f64) * 100.0
    }
}

/// Prints the summary to standard error in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    eprintln!("=== Crawl Summary ===\n");

    eprintln!("Run:");
    eprintln!("  Started: {}", summary.started_at.to_rfc3339());
    eprintln!("  Finished: {}", summary.finished_at.to_rfc3339());
    eprintln!("  Duration: {}s", summary.duration_seconds());
    eprintln!("  Walker stopped: {}", summary.walk_outcome);
    eprintln!();

    eprintln!("Listing:");
    eprintln!(
        "  Category: {}",
        summary.category.as_deref().unwrap_or("unknown")
    );
    eprintln!(
        "  Listings found: {}",
        summary.total_count.as_deref().unwrap_or("unknown")
    );
    eprintln!("  Pages fetched: {}", summary.pages_fetched);
    eprintln!("  Items launched: {}", summary.items_launched);
    if summary.entries_skipped > 0 {
        eprintln!("  Entries without a link: {}", summary.entries_skipped);
    }
    eprintln!();

    let tally = &summary.enrichment;
    eprintln!("Enrichment:");
    eprintln!("  Emitted: {}", tally.emitted);
    for (label, count) in [
        ("No phone control", tally.no_phone_control),
        ("Empty phone", tally.empty_phone),
        ("Detail fetch failed", tally.detail_failed),
        ("Phone lookup failed", tally.phone_failed),
        ("Banned", tally.banned),
        ("Cancelled", tally.cancelled),
        ("Sink closed", tally.sink_closed),
        ("Panicked", tally.panicked),
    ] {
        if count > 0 {
            eprintln!("  {}: {}", label, count);
        }
    }
    eprintln!();

    eprintln!("Output:");
    eprintln!("  Rows written: {}", summary.rows_written);
    if summary.rows_failed > 0 {
        eprintln!("  Rows failed: {}", summary.rows_failed);
    }
    eprintln!(
        "  Yield: {:.1}% ({} / {} items)",
        summary.yield_rate(),
        summary.rows_written,
        summary.items_launched
    );

    if summary.was_banned() {
        eprintln!();
        eprintln!("Warning: the origin blocked this client; output is partial");
    } else if summary.walk_outcome.is_failure() {
        eprintln!();
        eprintln!(
            "Warning: listing walk ended early ({}); output is partial",
            summary.walk_outcome
        );
    }
}
