//! Record sink trait and error types
//!
//! This module defines the trait interface for record sinks and the errors
//! they report.

use crate::model::{CardRecord, Schema};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only log of normalized records with a fixed column schema
///
/// Writing the header is a separate, explicit operation performed once before
/// any append. Appends never rewrite prior rows.
pub trait RecordSink {
    /// Column layout of every row this sink writes
    fn schema(&self) -> Schema;

    /// Whether the sink already holds output from an earlier run
    fn exists(&self) -> bool;

    /// Starts a fresh log containing only the header row
    fn write_header(&mut self) -> OutputResult<()>;

    /// Appends records after the existing rows
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn append(&mut self, records: &[CardRecord]) -> OutputResult<usize>;

    /// Writes the header unless the sink already exists
    fn ensure_header(&mut self) -> OutputResult<bool> {
        if self.exists() {
            return Ok(false);
        }
        self.write_header()?;
        Ok(true)
    }
}
