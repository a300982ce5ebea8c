//! Output module for enriched records and crawl summaries
//!
//! This module handles:
//! - Writing enriched records as CSV to a file or standard output
//! - Draining the aggregation channel in arrival order
//! - Recording crawl statistics for the end-of-run summary

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::{drain_records, CsvSink, SinkReport};
pub use stats::{print_summary, CrawlSummary, EnrichmentTally};
pub use traits::{OutputError, OutputResult, RecordSink};
