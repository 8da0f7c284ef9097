//! Scripted in-memory browser shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use card_harvest::config::Config;
use card_harvest::crawler::{ListSession, SessionError, SessionFactory, NEXT_PAGE_SELECTORS};

/// Behaviour of the fake site plus a log of everything the crawler did to it
#[derive(Debug, Default)]
pub struct Site {
    /// Number of result pages behind the search view
    pub total_pages: u32,
    /// Markup served for explicitly opened URLs (package pages)
    pub documents: HashMap<String, String>,
    /// 1-based snapshot calls that fail with a network fault
    pub failing_snapshots: HashSet<usize>,
    /// Remaining `open` failures per URL
    pub failing_opens: HashMap<String, usize>,
    /// Launch attempts fail with this message
    pub launch_error: Option<String>,
    /// Reloads outlast the page-load timeout
    pub slow_refresh: bool,

    pub launches: usize,
    pub closes: usize,
    pub opens: Vec<String>,
    pub snapshots: usize,
    pub refreshes: usize,
    pub jumps: Vec<u32>,
}

/// Session factory handing out tabs onto one shared [`Site`]
#[derive(Clone, Default)]
pub struct FakeBrowser {
    site: Arc<Mutex<Site>>,
}

impl FakeBrowser {
    pub fn with_pages(total_pages: u32) -> Self {
        let browser = Self::default();
        browser.site().total_pages = total_pages;
        browser
    }

    pub fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap()
    }
}

#[async_trait]
impl SessionFactory for FakeBrowser {
    type Session = FakeTab;

    async fn launch(&self) -> Result<FakeTab, SessionError> {
        let mut site = self.site();
        if let Some(message) = &site.launch_error {
            return Err(SessionError::Launch(message.clone()));
        }
        site.launches += 1;
        Ok(FakeTab {
            site: self.site.clone(),
            url: String::new(),
            page: 0,
        })
    }
}

pub struct FakeTab {
    site: Arc<Mutex<Site>>,
    url: String,
    page: u32,
}

impl FakeTab {
    fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap()
    }
}

/// Markup of one result page
pub fn list_page_html(page: u32) -> String {
    format!(
        "<html><body><div class=\"result\">page {}</div></body></html>",
        page
    )
}

#[async_trait]
impl ListSession for FakeTab {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        let mut site = self.site();
        site.opens.push(url.to_string());
        if let Some(remaining) = site.failing_opens.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SessionError::Network("connection reset".to_string()));
            }
        }
        drop(site);
        self.url = url.to_string();
        self.page = 0;
        Ok(())
    }

    async fn trigger_search(&mut self) -> Result<bool, SessionError> {
        self.page = 1;
        Ok(true)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, SessionError> {
        Ok(2000)
    }

    async fn count_matches(&mut self, _selector: &str) -> Result<usize, SessionError> {
        Ok(12)
    }

    async fn snapshot(&mut self) -> Result<String, SessionError> {
        let mut site = self.site();
        site.snapshots += 1;
        if site.failing_snapshots.contains(&site.snapshots) {
            return Err(SessionError::Network("connection reset".to_string()));
        }
        if let Some(html) = site.documents.get(&self.url) {
            return Ok(html.clone());
        }
        Ok(list_page_html(self.page))
    }

    async fn click(&mut self, selector: &str) -> Result<bool, SessionError> {
        let total = self.site().total_pages;
        if selector == NEXT_PAGE_SELECTORS[0] && self.page < total {
            self.page += 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn active_page_number(&mut self) -> Result<Option<u32>, SessionError> {
        Ok(Some(self.page).filter(|page| *page > 0))
    }

    async fn click_page_number(&mut self, number: u32) -> Result<bool, SessionError> {
        let mut site = self.site();
        if number == 0 || number > site.total_pages {
            return Ok(false);
        }
        site.jumps.push(number);
        drop(site);
        self.page = number;
        Ok(true)
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        let mut site = self.site();
        site.refreshes += 1;
        if site.slow_refresh {
            return Err(SessionError::Timeout(Duration::from_secs(30)));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.site().closes += 1;
    }
}

/// Default config with every output under `dir` and the given site base
pub fn config_in(dir: &Path, base_url: &str) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.start_url = format!("{}/Cards", base_url);
    config.site.package_index_url = format!("{}/Package", base_url);
    config.output.work_dir = dir.join("work");
    config.output.list_csv = dir.join("cards.csv");
    config.output.full_csv = dir.join("cards_full.csv");
    config.pacing.jitter_scale = 0.0;
    config
}
