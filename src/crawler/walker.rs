//! Listing walker
//!
//! Fetches listing pages one after another, following the next-page link,
//! and launches one enrichment task per discovered entry until the item
//! budget is spent. The walker is the only owner of the pagination cursor
//! and of the budget.
//!
//! Finished enrichment tasks are reaped as the walk goes, so the task set
//! never holds more than the configured number of tasks.

use crate::crawler::ban::BanSignal;
use crate::crawler::enricher::{DetailEnricher, EnrichOutcome};
use crate::crawler::fetcher::fetch_page;
use crate::crawler::governor::RateGovernor;
use crate::crawler::item::{EnrichedRecord, ItemStub};
use crate::crawler::parser::{parse_listing, PageSelectors};
use crate::output::EnrichmentTally;
use crate::state::{ItemBudget, WalkOutcome};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;
use url::Url;

/// What the walker did before it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkReport {
    pub outcome: WalkOutcome,

    /// Listing pages fetched successfully
    pub pages_fetched: u64,

    /// Enrichment tasks launched
    pub items_launched: u64,

    /// Entries skipped because their detail link was missing
    pub entries_skipped: u64,

    /// Category label of the first page
    pub category: Option<String>,

    /// Total-count label of the first page
    pub total_count: Option<String>,
}

/// Sequential pagination loop feeding the enrichment fan-out
pub struct ListingWalker {
    client: Client,
    governor: Arc<RateGovernor>,
    selectors: Arc<PageSelectors>,
    enricher: Arc<DetailEnricher>,
    /// Upper bound on live enrichment tasks, at least 1
    max_in_flight: usize,
    ban: Arc<BanSignal>,
}

impl ListingWalker {
    pub fn new(
        client: Client,
        governor: Arc<RateGovernor>,
        selectors: Arc<PageSelectors>,
        enricher: Arc<DetailEnricher>,
        max_concurrent_enrichments: usize,
        ban: Arc<BanSignal>,
    ) -> Self {
        Self {
            client,
            governor,
            selectors,
            enricher,
            // A zero bound would never admit a task
            max_in_flight: max_concurrent_enrichments.max(1),
            ban,
        }
    }

    /// Walks the listing starting at `seed`
    ///
    /// Every launched task is spawned into `tasks`, holding its own clone
    /// of `records`. Tasks that finish during the walk are joined here and
    /// counted in `tally`; the caller joins the rest before dropping the
    /// last sender.
    ///
    /// # Termination
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | No next-page link | Exhausted |
    /// | Budget spent with more pages left | CapReached |
    /// | Fetch failure | FetchFailed |
    /// | Degraded page or HTTP 403 | Banned |
    /// | Escalated ban elsewhere | Aborted |
    pub async fn walk(
        &self,
        seed: Url,
        mut budget: ItemBudget,
        records: &mpsc::Sender<EnrichedRecord>,
        tasks: &mut JoinSet<EnrichOutcome>,
        tally: &mut EnrichmentTally,
    ) -> WalkReport {
        let mut report = WalkReport {
            outcome: WalkOutcome::Exhausted,
            pages_fetched: 0,
            items_launched: 0,
            entries_skipped: 0,
            category: None,
            total_count: None,
        };

        let mut cursor = Some(seed);

        report.outcome = loop {
            if self.ban.is_aborted() {
                break WalkOutcome::Aborted;
            }
            let Some(page_url) = cursor.take() else {
                break WalkOutcome::Exhausted;
            };
            if !budget.has_room() {
                break WalkOutcome::CapReached;
            }

            tracing::info!("Fetching listing page: {}", page_url);
            self.governor.acquire().await;

            let body = match fetch_page(&self.client, page_url.as_str())
                .await
                .into_body(page_url.as_str())
            {
                Ok(body) => body,
                Err(e) if e.is_ban() => {
                    self.ban.raise(page_url.as_str(), "listing");
                    break WalkOutcome::Banned;
                }
                Err(e) => {
                    tracing::error!("Failed to fetch listing page {}: {}", page_url, e);
                    break WalkOutcome::FetchFailed;
                }
            };

            let page = parse_listing(&body, &page_url, &self.selectors);
            report.pages_fetched += 1;

            if let Some(next) = &page.next_page {
                tracing::info!("Next page: {}", next);
            }

            if page.looks_degraded() {
                tracing::error!(
                    "Listing page {} has no category label; the page is likely degraded",
                    page_url
                );
                self.ban.raise(page_url.as_str(), "listing");
                break WalkOutcome::Banned;
            }

            if report.pages_fetched == 1 {
                report.category = page.category.clone();
                report.total_count = page.total_count.clone();
                tracing::info!(
                    "Category: {}",
                    report.category.as_deref().unwrap_or_default()
                );
                tracing::info!(
                    "Listings found: {}",
                    report.total_count.as_deref().unwrap_or("unknown")
                );
            } else {
                tracing::info!(
                    "Progress: {}/{}",
                    budget.launched(),
                    report.total_count.as_deref().unwrap_or("?")
                );
            }

            for entry in page.entries {
                if !budget.has_room() || self.ban.is_aborted() {
                    break;
                }

                let Some(detail_url) = entry.detail_url else {
                    tracing::warn!(
                        "Listing entry '{}' on {} has no detail link, skipping",
                        entry.title,
                        page_url
                    );
                    report.entries_skipped += 1;
                    continue;
                };

                self.make_room(tasks, tally).await;
                // A ban may have escalated while we waited for a free slot
                if self.ban.is_aborted() {
                    break;
                }

                budget.take();
                let stub = ItemStub::new(entry.title, entry.location_hint, detail_url);
                tracing::debug!("Launching enrichment for {:?}", stub);

                let span = tracing::info_span!("enrich", url = %stub.detail_url);
                let enricher = Arc::clone(&self.enricher);
                let records = records.clone();
                tasks.spawn(
                    async move { enricher.enrich(stub, &records).await }.instrument(span),
                );
            }

            cursor = page.next_page;
        };

        report.items_launched = budget.launched();
        tracing::info!(
            "Listing walk finished ({}): {} pages, {} items launched",
            report.outcome,
            report.pages_fetched,
            report.items_launched
        );

        report
    }

    /// Joins finished tasks, then waits until the set has a free slot
    async fn make_room(&self, tasks: &mut JoinSet<EnrichOutcome>, tally: &mut EnrichmentTally) {
        while let Some(joined) = tasks.try_join_next() {
            tally.record_joined(joined);
        }

        while tasks.len() >= self.max_in_flight {
            match tasks.join_next().await {
                Some(joined) => tally.record_joined(joined),
                None => break,
            }
        }
    }
}
