//! Crawler module for page acquisition
//!
//! This module contains the acquisition side of the harvester, including:
//! - Rendering sessions and their lifecycle
//! - List-page navigation with stall detection and crash recovery
//! - Lightweight HTTP fetching with user-agent rotation
//! - The detail pipeline and the package crawl
//! - Overall run coordination

mod browser;
mod coordinator;
mod detail;
mod fetcher;
mod navigator;
mod package;
mod retry;
mod session;

pub use browser::{BrowserSession, ChromeLauncher};
pub use coordinator::{
    deduped_path, Coordinator, DedupeReport, PackageRequest, RunMode, DISCOVER_ALL,
};
pub use detail::{build_queue, DetailFetcher, DetailReport};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use navigator::{
    click_next, scroll_until_stable, NavOutcome, Navigator, ScrollProbe, NEXT_PAGE_SELECTORS,
};
pub use package::{discover_packages, PackageCrawler, PackageReport};
pub use retry::{Jitter, RetryPolicy};
pub use session::{ListSession, SessionError, SessionFactory, SessionSlot};
