//! Run statistics
//!
//! Every run mode accumulates a [`RunStats`] and logs it when it finishes.

use chrono::{DateTime, Utc};
use tracing::info;

/// Counters for one invocation
#[derive(Debug, Clone)]
pub struct RunStats {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// List or package pages saved to the page store
    pub pages_saved: usize,

    /// Saved pages parsed back into records
    pub pages_parsed: usize,

    /// Rows appended to the output
    pub records_written: usize,

    /// Rows dropped as duplicates
    pub duplicates_dropped: usize,

    /// Detail pages fetched over the network
    pub details_fetched: usize,

    /// Detail pages parsed straight from the cache
    pub details_cached: usize,

    /// Detail pages already in the ledger
    pub details_skipped: usize,

    /// Detail pages that failed every fetch attempt
    pub details_failed: usize,

    /// Packages crawled to completion
    pub packages_crawled: usize,

    /// Packages whose card blocks yielded nothing
    pub zero_packages: usize,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            pages_saved: 0,
            pages_parsed: 0,
            records_written: 0,
            duplicates_dropped: 0,
            details_fetched: 0,
            details_cached: 0,
            details_skipped: 0,
            details_failed: 0,
            packages_crawled: 0,
            zero_packages: 0,
        }
    }

    /// Whole seconds since the run started
    pub fn elapsed_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    /// Detail items that reached the parser
    pub fn details_resolved(&self) -> usize {
        self.details_fetched + self.details_cached
    }

    /// Logs the summary of a finished run
    pub fn log_summary(&self, mode: &str) {
        info!("=== {} finished in {}s ===", mode, self.elapsed_seconds());
        info!(
            "Pages: {} saved, {} parsed",
            self.pages_saved, self.pages_parsed
        );
        info!(
            "Records: {} written, {} duplicates dropped",
            self.records_written, self.duplicates_dropped
        );

        if self.details_resolved() + self.details_skipped + self.details_failed > 0 {
            info!(
                "Details: {} fetched, {} from cache, {} already done, {} failed",
                self.details_fetched, self.details_cached, self.details_skipped, self.details_failed
            );
        }

        if self.packages_crawled + self.zero_packages > 0 {
            info!(
                "Packages: {} crawled, {} with zero results",
                self.packages_crawled, self.zero_packages
            );
        }
    }
}
