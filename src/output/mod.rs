//! Output module for normalized card records
//!
//! This module handles:
//! - Appending records to CSV logs with a fixed schema
//! - Recording run statistics

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use stats::RunStats;
pub use traits::{OutputError, OutputResult, RecordSink};
