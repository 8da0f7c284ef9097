//! Resumable detail-page pipeline
//!
//! Each queued detail page is resolved to markup (cache, then the lightweight
//! fetcher, then a lazily launched rendering session), parsed with the
//! detail-mode chain and buffered. Every flushed batch is followed by a
//! checkpoint of the [`CrawlState`] ledger.

use std::path::Path;

use tracing::{debug, info, warn};

use super::fetcher::PageFetcher;
use super::retry::{Jitter, RetryPolicy};
use super::session::{ListSession, SessionError, SessionFactory, SessionSlot};
use crate::config::FetcherConfig;
use crate::extractor::{DetailQueue, Extractor};
use crate::model::{CardRecord, DetailQueueItem};
use crate::output::RecordSink;
use crate::state::CrawlState;
use crate::storage::PageStore;
use crate::Result;

/// Builds the detail queue from saved list pages
///
/// Pages are scanned in increasing index order; `max_items` caps the queue
/// after de-duplication.
pub fn build_queue(
    store: &PageStore,
    extractor: &Extractor,
    max_pages: Option<usize>,
    max_items: Option<usize>,
) -> Result<Vec<DetailQueueItem>> {
    let mut queue = DetailQueue::new();

    for (index, path) in store.list_pages(max_pages)? {
        let html = store.read(&path)?;
        let added = extractor.queue_details(&mut queue, &html);
        debug!("Queued {} detail links from list page {}", added, index);
    }

    if let Some(max) = max_items {
        queue.truncate(max);
    }

    info!("Detail queue holds {} items", queue.len());
    Ok(queue.into_items())
}

/// Counters of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailReport {
    /// Pages downloaded during this run
    pub fetched: usize,
    /// Pages parsed from an existing cache file
    pub cached: usize,
    /// Items already recorded in the ledger
    pub skipped: usize,
    /// Items that failed every fetch attempt
    pub failed: usize,
    /// Records appended to the sink
    pub written: usize,
}

/// Detail pipeline over a lightweight fetcher and a rendering fallback
pub struct DetailFetcher<P: PageFetcher, F: SessionFactory> {
    fetcher: P,
    renderer: SessionSlot<F>,
    renderer_unavailable: bool,
    store: PageStore,
    extractor: Extractor,
    config: FetcherConfig,
    jitter: Jitter,
}

impl<P: PageFetcher, F: SessionFactory> DetailFetcher<P, F> {
    pub fn new(
        fetcher: P,
        renderer: F,
        store: PageStore,
        extractor: Extractor,
        config: FetcherConfig,
        jitter: Jitter,
    ) -> Self {
        Self {
            fetcher,
            renderer: SessionSlot::new(renderer),
            renderer_unavailable: false,
            store,
            extractor,
            config,
            jitter,
        }
    }

    /// Resolves, parses and writes every queued item in order
    pub async fn run<S: RecordSink>(
        &mut self,
        queue: &[DetailQueueItem],
        state: &mut CrawlState,
        sink: &mut S,
    ) -> Result<DetailReport> {
        let result = self.process(queue, state, sink).await;
        self.renderer.release().await;
        result
    }

    async fn process<S: RecordSink>(
        &mut self,
        queue: &[DetailQueueItem],
        state: &mut CrawlState,
        sink: &mut S,
    ) -> Result<DetailReport> {
        let mut report = DetailReport::default();
        let mut batch: Vec<CardRecord> = Vec::new();
        let mut batch_keys: Vec<String> = Vec::new();
        let total = queue.len();

        for (position, item) in queue.iter().enumerate() {
            let path = self.store.detail_path(&item.detail_url, &item.card_number);
            let key = path.display().to_string();

            if state.contains(&key) {
                report.skipped += 1;
                continue;
            }

            let html = if path.exists() {
                match self.store.read(&path) {
                    Ok(html) => {
                        report.cached += 1;
                        html
                    }
                    Err(e) => {
                        warn!("Unreadable detail cache {}: {}", path.display(), e);
                        report.failed += 1;
                        continue;
                    }
                }
            } else {
                match self.download(&item.detail_url, &path).await {
                    Some(html) => {
                        report.fetched += 1;
                        html
                    }
                    None => {
                        warn!("Giving up on {}", item.detail_url);
                        report.failed += 1;
                        continue;
                    }
                }
            };

            match self.extractor.detail_record(&html, &item.detail_url) {
                Some(record) => {
                    batch.push(record);
                    batch_keys.push(key);
                }
                None => debug!("No card found on {}", item.detail_url),
            }

            if batch.len() >= self.config.batch_size {
                report.written += flush(sink, state, &mut batch, &mut batch_keys)?;
                info!(
                    "Detail progress: {}/{} ({} records written)",
                    position + 1,
                    total,
                    report.written
                );
            }
        }

        report.written += flush(sink, state, &mut batch, &mut batch_keys)?;
        Ok(report)
    }

    /// Fetches `url` and caches it at `path`; `None` when every attempt failed
    ///
    /// A failed cache write only costs a refetch on the next run.
    async fn download(&mut self, url: &str, path: &Path) -> Option<String> {
        let html = match self.fetch_lightweight(url).await {
            Some(html) => html,
            None => self.fetch_rendered(url).await?,
        };

        if let Err(e) = self.store.save(path, &html) {
            warn!("Could not cache {}: {}", path.display(), e);
        }
        self.jitter.sleep(0.8, 0.5).await;
        Some(html)
    }

    async fn fetch_lightweight(&self, url: &str) -> Option<String> {
        let policy = RetryPolicy::lightweight(self.config.http_attempts, self.jitter);

        for attempt in policy.attempts() {
            match self.fetcher.fetch(url).await {
                Ok(html) => return Some(html),
                Err(e) => debug!(
                    "Fetch attempt {}/{} for {} failed: {}",
                    attempt + 1,
                    policy.max_attempts,
                    url,
                    e
                ),
            }
            if policy.has_next(attempt) {
                policy.backoff(attempt).await;
                self.fetcher.rotate_identity();
            }
        }
        None
    }

    async fn fetch_rendered(&mut self, url: &str) -> Option<String> {
        if self.renderer_unavailable {
            return None;
        }

        let policy = RetryPolicy::rendering(self.config.browser_attempts, self.jitter);
        for attempt in policy.attempts() {
            match self.render(url).await {
                Ok(html) if !html.trim().is_empty() => return Some(html),
                Ok(_) => debug!("Rendered {} to an empty document", url),
                Err(SessionError::Launch(e)) => {
                    warn!("Rendering fallback unavailable: {}", e);
                    self.renderer_unavailable = true;
                    return None;
                }
                Err(e) => {
                    debug!(
                        "Render attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        policy.max_attempts,
                        url,
                        e
                    );
                    if e.is_recoverable() {
                        self.renderer.release().await;
                    }
                }
            }
            if policy.has_next(attempt) {
                policy.backoff(attempt).await;
            }
        }
        None
    }

    async fn render(&mut self, url: &str) -> std::result::Result<String, SessionError> {
        let session = self.renderer.acquire().await?;
        session.open(url).await?;
        self.jitter.sleep(0.8, 0.5).await;
        session.snapshot().await
    }
}

/// Appends the batch, then checkpoints the keys it covers
fn flush<S: RecordSink>(
    sink: &mut S,
    state: &mut CrawlState,
    batch: &mut Vec<CardRecord>,
    keys: &mut Vec<String>,
) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    let written = sink.append(batch)?;
    state.commit(keys.drain(..))?;
    batch.clear();
    Ok(written)
}
