//! Crawler module for the crawl-and-enrich pipeline
//!
//! This module contains the core crawling logic, including:
//! - A process-wide rate governor for every outbound request
//! - HTTP fetching and HTML selector evaluation
//! - The listing walker and per-item detail enrichment
//! - Phone resolution with ban detection
//! - Overall coordination and ordered shutdown

mod ban;
mod coordinator;
mod enricher;
mod fetcher;
mod governor;
mod item;
mod parser;
mod phone;
mod walker;

pub use ban::BanSignal;
pub use coordinator::{run_crawl, Coordinator};
pub use enricher::{DetailEnricher, EnrichOutcome};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use governor::RateGovernor;
pub use item::{EnrichedRecord, ItemStub};
pub use parser::{parse_detail, parse_listing, DetailPage, ListingEntry, ListingPage, PageSelectors};
pub use phone::PhoneResolver;
pub use walker::{ListingWalker, WalkReport};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the output destination
/// 2. Build the HTTP client and rate governor
/// 3. Walk the listing pages, launching one enrichment task per item
/// 4. Join every enrichment task, then close the record channel
/// 5. Wait for the sink to flush and return the run summary
///
/// # Arguments
///
/// * `config` - The validated crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl ran to completion (possibly with partial output)
/// * `Err(HarvestError)` - Output could not be opened or flushed, or setup failed
pub async fn crawl(config: Config) -> Result<CrawlSummary> {
    run_crawl(config).await
}
