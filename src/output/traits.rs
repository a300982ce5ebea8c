//! Record sink trait and output errors

use crate::crawler::EnrichedRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to open output file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write output: {0}")]
    Write(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for enriched records
///
/// A sink is owned by a single consumer task, so implementations need not
/// be thread-safe; they only have to be movable across threads.
pub trait RecordSink {
    /// Writes one record
    ///
    /// A failure here affects only this record; the consumer logs it and
    /// keeps draining.
    fn write_record(&mut self, record: &EnrichedRecord) -> OutputResult<()>;

    /// Flushes everything written so far
    ///
    /// Called once after the record channel has closed.
    fn finish(&mut self) -> OutputResult<()>;
}
