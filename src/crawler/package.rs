//! Package crawl
//!
//! Every package page is loaded in a rendering session, scrolled until its
//! card count settles, saved to the page store and parsed into full-schema
//! rows. Packages that parse to nothing fall back to minimal rows and are
//! queued on the zero-result worklist for a later retry pass.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::navigator::{scroll_until_stable, ScrollProbe};
use super::retry::Jitter;
use super::session::{ListSession, SessionError, SessionFactory, SessionSlot};
use crate::config::PackageConfig;
use crate::extractor::{Extractor, CARD_BLOCK};
use crate::output::RecordSink;
use crate::state::{PackageProgress, Worklist};
use crate::storage::PageStore;
use crate::url::package_id;
use crate::{CardError, Result};

/// Pause after each package-page scroll (base, spread in seconds)
const PACKAGE_SCROLL_PACE: (f64, f64) = (0.8, 0.5);

/// Counters of one package crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    /// Packages saved and parsed
    pub crawled: usize,
    /// Packages passed over before the resume point
    pub skipped: usize,
    /// Packages that could not be loaded or read
    pub failed: usize,
    /// Packages whose card blocks parsed to nothing
    pub zero_result: usize,
    /// Rows appended to the sink
    pub records: usize,
}

/// Sequential crawler over a list of package URLs
pub struct PackageCrawler<F: SessionFactory> {
    slot: SessionSlot<F>,
    store: PageStore,
    extractor: Extractor,
    config: PackageConfig,
    jitter: Jitter,
    progress: PackageProgress,
    worklist: Worklist,
}

impl<F: SessionFactory> PackageCrawler<F> {
    pub fn new(
        factory: F,
        store: PageStore,
        extractor: Extractor,
        config: PackageConfig,
        jitter: Jitter,
        progress: PackageProgress,
        worklist: Worklist,
    ) -> Self {
        Self {
            slot: SessionSlot::new(factory),
            store,
            extractor,
            config,
            jitter,
            progress,
            worklist,
        }
    }

    /// Crawls `urls` in order, skipping everything before `resume_from`
    pub async fn run<S: RecordSink>(
        &mut self,
        urls: &[String],
        resume_from: Option<&str>,
        sink: &mut S,
    ) -> Result<PackageReport> {
        let result = self.crawl(urls, resume_from, sink).await;
        self.slot.release().await;
        result
    }

    async fn crawl<S: RecordSink>(
        &mut self,
        urls: &[String],
        resume_from: Option<&str>,
        sink: &mut S,
    ) -> Result<PackageReport> {
        let mut report = PackageReport::default();
        let mut started = resume_from.is_none();

        for url in urls {
            let id = package_id(url);

            if !started {
                if resume_from == Some(id.as_str()) {
                    info!("Resuming from package {}", id);
                    started = true;
                } else {
                    debug!("Skipping package {}", id);
                    report.skipped += 1;
                    continue;
                }
            }

            if let Err(e) = self.progress.record(&id) {
                warn!("Could not record progress at package {}: {}", id, e);
            }
            info!("Open package: {}", url);

            if !self.load(url, &id).await {
                report.failed += 1;
                continue;
            }

            let html = match self.settle_and_snapshot().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Lost the session while reading package {}: {}", id, e);
                    self.slot.release().await;
                    report.failed += 1;
                    continue;
                }
            };
            if let Err(e) = self.store.save_package(&id, &html) {
                warn!("Could not cache package {}: {}", id, e);
            }

            let mut rows = self.extractor.full_records(&html);
            if rows.is_empty() {
                warn!("Package {} yielded no card blocks; keeping link-only rows", id);
                if let Err(e) = self.worklist.append(url) {
                    warn!("Could not queue {} for a retry: {}", url, e);
                }
                rows = self.extractor.minimal_records(&html);
                report.zero_result += 1;
            }

            report.records += sink.append(&rows)?;
            report.crawled += 1;
            info!(
                "Package {}: parsed {} cards (cumulative {})",
                id,
                rows.len(),
                report.records
            );

            self.jitter.sleep(2.0, 1.0).await;
        }

        if !started {
            if let Some(target) = resume_from {
                warn!("Resume point {} not found among {} packages", target, urls.len());
            }
        }

        Ok(report)
    }

    /// Opens the package page, recreating the session between failed attempts
    async fn load(&mut self, url: &str, id: &str) -> bool {
        let attempts = self.config.load_attempts;
        let retry_delay = Duration::from_secs(self.config.retry_delay);

        for attempt in 1..=attempts {
            match self.open(url).await {
                Ok(()) => return true,
                Err(e) if attempt < attempts => {
                    warn!(
                        "Attempt {} failed for {}: {}, retrying...",
                        attempt, id, e
                    );
                    self.jitter.pause(retry_delay).await;
                    self.slot.release().await;
                }
                Err(e) => {
                    warn!("Failed to load {} after {} attempts: {}", id, attempts, e);
                }
            }
        }
        false
    }

    async fn open(&mut self, url: &str) -> std::result::Result<(), SessionError> {
        self.slot.acquire().await?.open(url).await
    }

    async fn settle_and_snapshot(&mut self) -> std::result::Result<String, SessionError> {
        let probe = format!("{}, {}", CARD_BLOCK, self.extractor.card_link_probe());
        let session = self.slot.acquire().await?;

        let rounds = scroll_until_stable(
            session,
            ScrollProbe::Matches(&probe),
            self.config.max_scroll_rounds,
            self.config.stable_rounds,
            &self.jitter,
            PACKAGE_SCROLL_PACE,
        )
        .await?;
        debug!("Package page settled after {} scroll rounds", rounds);

        session.snapshot().await
    }
}

/// Package URLs linked from the package index page
///
/// Links are absolutized and de-duplicated in first-seen order.
pub async fn discover_packages<P: super::fetcher::PageFetcher + ?Sized>(
    fetcher: &P,
    extractor: &Extractor,
    index_url: &str,
) -> Result<Vec<String>> {
    info!("Fetch package index: {}", index_url);
    let html = fetcher.fetch(index_url).await.map_err(CardError::Fetch)?;
    let urls = extractor.package_links(&html);
    info!("Discovered {} package URLs", urls.len());
    Ok(urls)
}
