//! CSV record sink and the consumer loop feeding it
//!
//! Rows have exactly four columns in the order title, location, phone,
//! url, with no header row. Quoting follows RFC 4180 via the `csv` crate.

use crate::crawler::EnrichedRecord;
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tokio::sync::mpsc;

/// CSV writer over any byte destination
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvSink<Box<dyn Write + Send>> {
    /// Opens the configured destination
    ///
    /// With a path the file is created (or truncated); without one, rows
    /// go to standard output.
    ///
    /// # Returns
    ///
    /// * `Ok(CsvSink)` - Destination is ready for writing
    /// * `Err(OutputError::Open)` - The file could not be created
    pub fn open(path: Option<&Path>) -> OutputResult<Self> {
        let destination: Box<dyn Write + Send> = match path {
            Some(path) => {
                let file = File::create(path).map_err(|source| OutputError::Open {
                    path: path.to_path_buf(),
                    source,
                })?;
                tracing::info!("Writing CSV to {}", path.display());
                Box::new(file)
            }
            None => {
                tracing::info!("Writing CSV to standard output");
                Box::new(io::stdout())
            }
        };

        Ok(Self::from_writer(destination))
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps an already open writer
    pub fn from_writer(destination: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(destination);
        Self { writer }
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.error().to_string()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &EnrichedRecord) -> OutputResult<()> {
        self.writer.write_record(record.to_row())?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Row counts reported by the consumer loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub rows_written: u64,
    pub rows_failed: u64,
}

/// Drains the record channel into a sink until every sender is gone
///
/// Records are written in arrival order. A failed row is logged and
/// counted; the final flush failing is an error.
pub async fn drain_records<S>(
    sink: &mut S,
    mut records: mpsc::Receiver<EnrichedRecord>,
) -> OutputResult<SinkReport>
where
    S: RecordSink + Send,
{
    let mut report = SinkReport::default();

    while let Some(record) = records.recv().await {
        match sink.write_record(&record) {
            Ok(()) => {
                report.rows_written += 1;
                tracing::debug!("Wrote row for {}", record.url);
            }
            Err(e) => {
                report.rows_failed += 1;
                tracing::error!("Failed to write row for {}: {}", record.url, e);
            }
        }
    }

    sink.finish()?;
    tracing::debug!(
        "Record channel closed after {} rows ({} failed)",
        report.rows_written,
        report.rows_failed
    );

    Ok(report)
}
