//! Crawler coordinator - pipeline wiring and ordered shutdown
//!
//! This module owns the lifecycle of one crawl:
//! - Opening the output before any request is made
//! - Running the listing walker while enrichers and the sink work alongside
//! - Joining every enrichment task before the aggregation channel closes
//! - Waiting for the sink to drain and flush

use crate::config::{validate, Config};
use crate::crawler::ban::BanSignal;
use crate::crawler::enricher::DetailEnricher;
use crate::crawler::governor::RateGovernor;
use crate::crawler::parser::PageSelectors;
use crate::crawler::walker::ListingWalker;
use crate::crawler::{build_http_client, EnrichOutcome};
use crate::output::{drain_records, CrawlSummary, CsvSink, EnrichmentTally, RecordSink};
use crate::state::{ItemBudget, PipelineState};
use crate::url::{build_seed_url, parse_base};
use crate::Result;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;
use url::Url;

/// Capacity of the aggregation channel
///
/// One slot makes every send a near-synchronous hand-off to the sink.
const RECORD_CHANNEL_CAPACITY: usize = 1;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    client: Client,
    governor: Arc<RateGovernor>,
    selectors: Arc<PageSelectors>,
    base_url: Url,
    ban: Arc<BanSignal>,
    state: PipelineState,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - A validated crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Validation failed or the HTTP client was unusable
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;

        let selectors = PageSelectors::compile(&config.selectors)?;
        let base_url = parse_base(&config.search.base_url)?;
        let client = build_http_client(&config.user_agent)?;
        let governor = RateGovernor::new(config.crawler.pause_ms);
        let ban = BanSignal::new(config.crawler.abort_on_ban);

        Ok(Self {
            config: Arc::new(config),
            client,
            governor: Arc::new(governor),
            selectors: Arc::new(selectors),
            base_url,
            ban: Arc::new(ban),
            state: PipelineState::Running,
        })
    }

    /// Current pipeline state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the crawl into the configured CSV destination
    ///
    /// Failing to open the destination is fatal before any request is made.
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let sink = CsvSink::open(self.config.output.csv_path.as_deref())?;
        self.run_with_sink(sink).await
    }

    /// Runs the crawl into an arbitrary record sink
    ///
    /// # Shutdown order
    ///
    /// 1. `Running`: walker loop; enrichers and sink run concurrently
    /// 2. `Draining`: join every launched enrichment task
    /// 3. `Closed`: drop the last sender, then wait for the sink to flush
    pub async fn run_with_sink<S>(&mut self, sink: S) -> Result<CrawlSummary>
    where
        S: RecordSink + Send + 'static,
    {
        let started_at = Utc::now();
        let search = &self.config.search;
        let seed = build_seed_url(
            &search.base_url,
            &search.location,
            search.category.as_deref(),
            &search.query,
        )?;

        tracing::info!(
            "Starting crawl at {} (max items: {}, pause: {}ms)",
            seed,
            self.config.crawler.max_items,
            self.config.crawler.pause_ms
        );

        let (records_tx, records_rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
        let sink_task = tokio::spawn(async move {
            let mut sink = sink;
            drain_records(&mut sink, records_rx).await
        });

        let enricher = Arc::new(DetailEnricher::new(
            self.client.clone(),
            Arc::clone(&self.governor),
            Arc::clone(&self.selectors),
            self.base_url.clone(),
            self.config.crawler.location_fallback,
            Arc::clone(&self.ban),
        ));
        let walker = ListingWalker::new(
            self.client.clone(),
            Arc::clone(&self.governor),
            Arc::clone(&self.selectors),
            enricher,
            self.config.crawler.max_concurrent_enrichments,
            Arc::clone(&self.ban),
        );

        let mut tasks: JoinSet<EnrichOutcome> = JoinSet::new();
        let mut tally = EnrichmentTally::default();
        let span = tracing::info_span!("walk", seed = %seed);
        let walk = walker
            .walk(
                seed,
                ItemBudget::new(self.config.crawler.max_items),
                &records_tx,
                &mut tasks,
                &mut tally,
            )
            .instrument(span)
            .await;

        self.state = self.state.transition(PipelineState::Draining)?;
        tracing::info!("Waiting for {} enrichment tasks", tasks.len());

        while let Some(joined) = tasks.join_next().await {
            tally.record_joined(joined);
        }

        // Every task (and its sender clone) is gone; this closes the channel
        drop(records_tx);
        self.state = self.state.transition(PipelineState::Closed)?;

        let sink_report = sink_task.await??;

        let summary = CrawlSummary {
            started_at,
            finished_at: Utc::now(),
            walk_outcome: walk.outcome,
            category: walk.category,
            total_count: walk.total_count,
            pages_fetched: walk.pages_fetched,
            items_launched: walk.items_launched,
            entries_skipped: walk.entries_skipped,
            enrichment: tally,
            rows_written: sink_report.rows_written,
            rows_failed: sink_report.rows_failed,
            ban_signals: self.ban.occurrences(),
        };

        tracing::info!(
            "Crawl finished: {} rows written from {} items",
            summary.rows_written,
            summary.items_launched
        );

        Ok(summary)
    }
}

/// Runs a complete crawl operation
///
/// # Example
///
/// ```no_run
/// use classifieds_harvest::config::{resolve_config, ConfigOverrides};
/// use classifieds_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let overrides = ConfigOverrides {
///     query: Some("macbook".to_string()),
///     ..Default::default()
/// };
/// let (config, _) = resolve_config(None, overrides)?;
/// let summary = run_crawl(config).await?;
/// println!("{} rows", summary.rows_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
