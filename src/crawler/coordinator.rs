//! Crawler coordinator - run-mode orchestration
//!
//! This module ties the components together for each run mode:
//! - Fetching list pages with the navigator
//! - Parsing saved list pages into the list or full schema
//! - The resumable detail pipeline
//! - Package crawls, including discovery and the zero-result retry pass
//! - The standalone de-duplication pass

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use super::browser::ChromeLauncher;
use super::detail::{build_queue, DetailFetcher, DetailReport};
use super::fetcher::{HttpFetcher, PageFetcher};
use super::navigator::{NavOutcome, Navigator};
use super::package::{discover_packages, PackageCrawler, PackageReport};
use super::retry::Jitter;
use super::session::SessionFactory;
use crate::config::Config;
use crate::dedup::{dedupe_csv_file, Deduplicator, KeyStrategy};
use crate::extractor::Extractor;
use crate::model::{CardRecord, Schema};
use crate::output::{CsvSink, RecordSink, RunStats};
use crate::state::{CrawlState, PackageProgress, Worklist};
use crate::storage::PageStore;
use crate::Result;

/// Token that replaces an explicit package list with discovery
pub const DISCOVER_ALL: &str = "ALL";

/// Package-mode inputs
#[derive(Debug, Clone, Default)]
pub struct PackageRequest {
    /// Package URLs, or the single token `ALL`
    pub urls: Vec<String>,
    /// Package id to resume from; `last` means the persisted progress
    pub resume_from: Option<String>,
    /// Crawl the zero-result worklist instead of `urls`
    pub retry_zero: bool,
}

/// One invocation's work
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Fetch and save list pages
    Fetch,
    /// Parse saved list pages into the list schema
    Parse { max_pages: Option<usize> },
    /// Parse saved list pages into the full schema
    ListFull { max_pages: Option<usize> },
    /// Fetch, then both parses
    Full,
    /// Resolve detail pages into the full schema
    Detail {
        max_pages: Option<usize>,
        max_items: Option<usize>,
    },
    /// Crawl package pages into the full schema
    Package(PackageRequest),
    /// De-duplicate an existing CSV into a new file
    Dedupe {
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        strategy: KeyStrategy,
    },
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            RunMode::Fetch => "fetch",
            RunMode::Parse { .. } => "parse",
            RunMode::ListFull { .. } => "list-full",
            RunMode::Full => "full",
            RunMode::Detail { .. } => "detail",
            RunMode::Package(_) => "package",
            RunMode::Dedupe { .. } => "dedupe",
        }
    }
}

/// Result of one de-duplication pass; displays as `kept K/T → path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeReport {
    pub kept: usize,
    pub total: usize,
    pub output: PathBuf,
}

impl fmt::Display for DedupeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kept {}/{} → {}", self.kept, self.total, self.output.display())
    }
}

/// Default output of the de-duplication pass: `<input stem>_deduped.csv`
pub fn deduped_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cards".to_string());
    input.with_file_name(format!("{}_deduped.csv", stem))
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    store: PageStore,
    extractor: Extractor,
    jitter: Jitter,
    stats: RunStats,
}

impl Coordinator {
    /// Opens the page store and binds the extractor to the configured site
    pub fn new(config: Config) -> Result<Self> {
        let store = PageStore::open(&config.output.work_dir)?;
        let base = Url::parse(&config.site.base_url)?;
        let extractor = Extractor::new(
            base,
            config.site.card_link_prefix.clone(),
            config.site.package_link_prefix.clone(),
        );
        let jitter = Jitter::new(config.pacing.jitter_scale);

        Ok(Self {
            config,
            store,
            extractor,
            jitter,
            stats: RunStats::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Runs a mode with the Chromium launcher and the HTTP fetcher
    pub async fn run(&mut self, mode: RunMode) -> Result<()> {
        tracing::info!("Starting {} run", mode.name());

        match mode {
            RunMode::Fetch => {
                self.fetch_list_pages(self.launcher()).await?;
            }
            RunMode::Parse { max_pages } => {
                self.parse_list_pages(max_pages)?;
            }
            RunMode::ListFull { max_pages } => {
                self.parse_list_pages_to_full(max_pages)?;
            }
            RunMode::Full => {
                self.fetch_list_pages(self.launcher()).await?;
                self.parse_list_pages(None)?;
                self.parse_list_pages_to_full(None)?;
            }
            RunMode::Detail {
                max_pages,
                max_items,
            } => {
                let fetcher = self.http_fetcher()?;
                self.run_detail_pipeline(fetcher, self.launcher(), max_pages, max_items)
                    .await?;
            }
            RunMode::Package(request) => {
                let fetcher = self.http_fetcher()?;
                let urls = self.resolve_packages(&fetcher, &request).await?;
                if urls.is_empty() {
                    tracing::warn!("No package URLs provided (or discovery failed)");
                } else {
                    let resume_from = self.progress().resolve(request.resume_from.as_deref());
                    self.crawl_packages(self.launcher(), &urls, resume_from.as_deref())
                        .await?;
                }
            }
            RunMode::Dedupe {
                input,
                output,
                strategy,
            } => {
                let report = self.dedupe(input, output, strategy)?;
                tracing::info!("De-duplicated: {}", report);
            }
        }

        Ok(())
    }

    fn launcher(&self) -> ChromeLauncher {
        ChromeLauncher::new(self.config.browser.clone())
    }

    fn http_fetcher(&self) -> Result<HttpFetcher> {
        Ok(HttpFetcher::from_config(
            &self.config.browser,
            &self.config.fetcher,
        )?)
    }

    fn progress(&self) -> PackageProgress {
        PackageProgress::new(self.config.output.progress_path())
    }

    fn worklist(&self) -> Worklist {
        Worklist::new(self.config.output.zero_packages_path())
    }

    /// Fetches list pages, resuming after the highest saved page
    pub async fn fetch_list_pages<F: SessionFactory>(&mut self, factory: F) -> Result<NavOutcome> {
        let mut navigator = Navigator::new(
            factory,
            self.store.clone(),
            self.config.site.start_url.clone(),
            self.config.navigator.clone(),
            self.jitter,
        );

        let outcome = navigator.run().await?;
        self.stats.pages_saved += outcome.pages_saved;
        Ok(outcome)
    }

    /// Parses saved list pages into a fresh list-schema CSV
    ///
    /// Returns the number of rows written.
    pub fn parse_list_pages(&mut self, max_pages: Option<usize>) -> Result<usize> {
        let mut sink = CsvSink::new(&self.config.output.list_csv, Schema::List);
        let extractor = self.extractor.clone();
        self.parse_saved_pages(&mut sink, max_pages, |html| {
            let (records, tier) = extractor.list_records(html);
            tracing::debug!("List tier used: {:?}", tier);
            records
        })
    }

    /// Parses saved list pages into a fresh full-schema CSV
    ///
    /// Returns the number of rows written.
    pub fn parse_list_pages_to_full(&mut self, max_pages: Option<usize>) -> Result<usize> {
        let mut sink = CsvSink::new(&self.config.output.full_csv, Schema::Full);
        let extractor = self.extractor.clone();
        self.parse_saved_pages(&mut sink, max_pages, |html| extractor.full_records(html))
    }

    fn parse_saved_pages<S, P>(
        &mut self,
        sink: &mut S,
        max_pages: Option<usize>,
        parse: P,
    ) -> Result<usize>
    where
        S: RecordSink,
        P: Fn(&str) -> Vec<CardRecord>,
    {
        sink.write_header()?;

        let mut dedup = Deduplicator::new(KeyStrategy::Identity);
        let mut total = 0;

        for (_, path) in self.store.list_pages(max_pages)? {
            let html = self.store.read(&path)?;
            let unique = dedup.filter(parse(&html));

            total += sink.append(&unique)?;
            self.stats.pages_parsed += 1;

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!(
                "Parsed {} {} cards from {} (total {})",
                unique.len(),
                sink.schema(),
                name,
                total
            );
        }

        self.stats.records_written += total;
        self.stats.duplicates_dropped += dedup.dropped();
        Ok(total)
    }

    /// Resolves queued detail pages into the full-schema CSV
    pub async fn run_detail_pipeline<P, F>(
        &mut self,
        fetcher: P,
        renderer: F,
        max_pages: Option<usize>,
        max_items: Option<usize>,
    ) -> Result<DetailReport>
    where
        P: PageFetcher,
        F: SessionFactory,
    {
        let queue = build_queue(&self.store, &self.extractor, max_pages, max_items)?;
        let mut state = CrawlState::load(self.config.output.state_path());
        let mut sink = CsvSink::new(&self.config.output.full_csv, Schema::Full);

        if state.is_empty() || !sink.exists() {
            sink.write_header()?;
        } else {
            tracing::info!(
                "Resuming detail pipeline: {} pages already written",
                state.len()
            );
        }

        let mut pipeline = DetailFetcher::new(
            fetcher,
            renderer,
            self.store.clone(),
            self.extractor.clone(),
            self.config.fetcher.clone(),
            self.jitter,
        );
        let report = pipeline.run(&queue, &mut state, &mut sink).await?;

        self.stats.details_fetched += report.fetched;
        self.stats.details_cached += report.cached;
        self.stats.details_skipped += report.skipped;
        self.stats.details_failed += report.failed;
        self.stats.records_written += report.written;
        Ok(report)
    }

    /// Turns a package request into the list of URLs to crawl
    ///
    /// The zero-result worklist is cleared once it has been taken over.
    pub async fn resolve_packages<P: PageFetcher + ?Sized>(
        &self,
        fetcher: &P,
        request: &PackageRequest,
    ) -> Result<Vec<String>> {
        let worklist = self.worklist();
        let mut urls = request.urls.clone();

        if request.retry_zero {
            let queued = worklist.read()?;
            if queued.is_empty() {
                tracing::info!("Zero-result worklist is empty");
            } else {
                tracing::info!("Retrying {} zero-result packages", queued.len());
                urls = queued;
            }
        }

        if urls.len() == 1 && urls[0].eq_ignore_ascii_case(DISCOVER_ALL) {
            urls = match discover_packages(fetcher, &self.extractor, &self.config.site.package_index_url)
                .await
            {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!("Failed to fetch package index: {}", e);
                    Vec::new()
                }
            };
        }

        if request.retry_zero && !urls.is_empty() {
            worklist.clear()?;
        }

        Ok(urls)
    }

    /// Crawls package pages into the full-schema CSV
    pub async fn crawl_packages<F: SessionFactory>(
        &mut self,
        factory: F,
        urls: &[String],
        resume_from: Option<&str>,
    ) -> Result<PackageReport> {
        let mut sink = CsvSink::new(&self.config.output.full_csv, Schema::Full);
        sink.ensure_header()?;

        let mut crawler = PackageCrawler::new(
            factory,
            self.store.clone(),
            self.extractor.clone(),
            self.config.package.clone(),
            self.jitter,
            self.progress(),
            self.worklist(),
        );
        let report = crawler.run(urls, resume_from, &mut sink).await?;

        self.stats.pages_saved += report.crawled;
        self.stats.packages_crawled += report.crawled;
        self.stats.zero_packages += report.zero_result;
        self.stats.records_written += report.records;
        Ok(report)
    }

    /// De-duplicates `input` into `output`
    ///
    /// `input` defaults to the full CSV and `output` to [`deduped_path`] of it.
    pub fn dedupe(
        &mut self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        strategy: KeyStrategy,
    ) -> Result<DedupeReport> {
        let input = input.unwrap_or_else(|| self.config.output.full_csv.clone());
        let output = output.unwrap_or_else(|| deduped_path(&input));

        let (kept, total) = dedupe_csv_file(&input, &output, strategy)?;
        self.stats.records_written += kept;
        self.stats.duplicates_dropped += total - kept;
        Ok(DedupeReport {
            kept,
            total,
            output,
        })
    }

    /// Logs the run summary
    pub fn finish(&self, mode: &RunMode) {
        self.stats.log_summary(mode.name());
    }
}
