//! Chromium-backed rendering session
//!
//! [`ChromeLauncher`] launches a fresh Chromium per session through
//! `chromiumoxide`, each with its own throwaway profile and a user agent drawn
//! from the configured pool. [`BrowserSession`] drives a single tab with
//! small JavaScript snippets; selectors are embedded as JSON string literals.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::{rng, Rng};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, trace, warn};

use super::session::{ListSession, SessionError, SessionFactory};
use crate::config::BrowserConfig;

/// Label of the control that populates the result list
const SEARCH_LABEL: &str = "搜索";

/// Any of these appearing means the result list has rendered
const RESULTS_MARKER: &str = ".ant-pagination, .card, .card-item, .result-item";

const ACTIVE_PAGE_ITEM: &str = "li.ant-pagination-item-active a, li.ant-pagination-item-active";

const PAGE_NUMBER_LINKS: &str = "li[class*='ant-pagination-item'] > a";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a pagination click gets to move the active page
const PAGE_CHANGE_WAIT: Duration = Duration::from_secs(3);

/// Launches one Chromium per session
#[derive(Debug)]
pub struct ChromeLauncher {
    config: BrowserConfig,
    launched: AtomicU32,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            launched: AtomicU32::new(0),
        }
    }

    fn pick_user_agent(&self) -> Option<&str> {
        let pool = &self.config.user_agents;
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng().random_range(0..pool.len())].as_str())
    }

    fn profile_dir(&self) -> PathBuf {
        let sequence = self.launched.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "card-harvest-{}-{}",
            std::process::id(),
            sequence
        ))
    }

    fn chrome_config(&self, profile_dir: &Path) -> Result<ChromeConfig, SessionError> {
        let mut builder = ChromeConfig::builder()
            .window_size(self.config.window_width, self.config.window_height)
            .user_data_dir(profile_dir)
            .request_timeout(self.config.page_load_timeout())
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if let Ok(path) = std::env::var("CHROME_PATH").or_else(|_| std::env::var("CHROMIUM_PATH")) {
            builder = builder.chrome_executable(path);
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(lang) = self.config.language.split(',').next().map(str::trim) {
            if !lang.is_empty() {
                builder = builder.arg(format!("--lang={}", lang));
            }
        }

        if let Some(user_agent) = self.pick_user_agent() {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }

        builder.build().map_err(SessionError::Launch)
    }
}

#[async_trait]
impl SessionFactory for ChromeLauncher {
    type Session = BrowserSession;

    async fn launch(&self) -> Result<BrowserSession, SessionError> {
        let profile_dir = self.profile_dir();
        let config = self.chrome_config(&profile_dir)?;

        let (mut browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                discard_profile(&profile_dir).await;
                return Err(SessionError::Launch(e.to_string()));
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler task completed");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shut_down(&mut browser, &handler_task).await;
                discard_profile(&profile_dir).await;
                return Err(SessionError::Launch(e.to_string()));
            }
        };

        info!("Browser session started");
        Ok(BrowserSession {
            browser,
            page,
            handler_task,
            profile_dir,
            page_load_timeout: self.config.page_load_timeout(),
            explicit_wait: self.config.explicit_wait(),
        })
    }
}

/// A single Chromium tab
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
    page_load_timeout: Duration,
    explicit_wait: Duration,
}

async fn shut_down(browser: &mut Browser, handler_task: &JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        debug!("Failed to close browser: {}", e);
    }
    if let Err(e) = browser.wait().await {
        debug!("Failed to reap browser process: {}", e);
    }
    handler_task.abort();
}

/// Removes a session's throwaway profile; a missing directory is fine
async fn discard_profile(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => trace!("Removed browser profile {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove browser profile {}: {}", dir.display(), e),
    }
}

fn fault(e: CdpError) -> SessionError {
    match e {
        CdpError::Ws(_) | CdpError::Io(_) => SessionError::Network(e.to_string()),
        other => SessionError::Driver(other.to_string()),
    }
}

/// JSON string literal usable inside a JavaScript snippet
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

impl BrowserSession {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, SessionError> {
        self.page
            .evaluate(script)
            .await
            .map_err(fault)?
            .into_value()
            .map_err(|e| SessionError::Driver(format!("Unexpected script result: {}", e)))
    }

    /// Polls a boolean expression until it holds or `limit` passes
    async fn wait_until(&self, expression: &str, limit: Duration) -> Result<bool, SessionError> {
        let deadline = Instant::now() + limit;
        let script = format!("Boolean({})", expression);
        loop {
            if self.eval::<bool>(&script).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_body(&self) -> Result<(), SessionError> {
        if !self.wait_until("document.body", self.explicit_wait).await? {
            warn!("Document body did not appear within {:?}", self.explicit_wait);
        }
        Ok(())
    }
}

#[async_trait]
impl ListSession for BrowserSession {
    async fn open(&mut self, url: &str) -> Result<(), SessionError> {
        debug!("Opening {}", url);
        match timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(result) => {
                result.map_err(fault)?;
            }
            Err(_) => return Err(SessionError::Timeout(self.page_load_timeout)),
        }
        self.wait_for_body().await
    }

    async fn trigger_search(&mut self) -> Result<bool, SessionError> {
        let script = format!(
            r#"(function(label) {{
                var candidates = document.querySelectorAll('button, a, span');
                for (var i = 0; i < candidates.length; i++) {{
                    var el = candidates[i];
                    if ((el.textContent || '').trim() !== label) continue;
                    if (el.offsetParent === null || el.disabled) continue;
                    el.click();
                    return true;
                }}
                return false;
            }})({})"#,
            js_string(SEARCH_LABEL)
        );

        let clicked: bool = self.eval(&script).await?;
        if !clicked {
            debug!("No search control found");
            return Ok(false);
        }

        let marker = format!("document.querySelector({})", js_string(RESULTS_MARKER));
        if !self.wait_until(&marker, self.explicit_wait).await? {
            warn!("Search results did not render within {:?}", self.explicit_wait);
        }
        Ok(true)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.page
            .evaluate("window.scrollTo(0, document.body ? document.body.scrollHeight : 0)")
            .await
            .map_err(fault)?;
        Ok(())
    }

    async fn document_height(&mut self) -> Result<u64, SessionError> {
        self.eval("document.body ? document.body.scrollHeight : 0")
            .await
    }

    async fn count_matches(&mut self, selector: &str) -> Result<usize, SessionError> {
        self.eval(&format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }

    async fn snapshot(&mut self) -> Result<String, SessionError> {
        self.page.content().await.map_err(fault)
    }

    async fn click(&mut self, selector: &str) -> Result<bool, SessionError> {
        let script = format!(
            r#"(function(selector) {{
                var el = document.querySelector(selector);
                if (!el || el.disabled) return false;
                el.click();
                return true;
            }})({})"#,
            js_string(selector)
        );
        self.eval(&script).await
    }

    async fn active_page_number(&mut self) -> Result<Option<u32>, SessionError> {
        let text: String = self
            .eval(&format!(
                "(function(el) {{ return el ? (el.textContent || '').trim() : ''; }})(document.querySelector({}))",
                js_string(ACTIVE_PAGE_ITEM)
            ))
            .await?;
        Ok(text.parse().ok())
    }

    async fn click_page_number(&mut self, number: u32) -> Result<bool, SessionError> {
        let script = format!(
            r#"(function(selector, label) {{
                var links = document.querySelectorAll(selector);
                for (var i = 0; i < links.length; i++) {{
                    var a = links[i];
                    if ((a.textContent || '').trim() !== label) continue;
                    if (a.offsetParent === null) continue;
                    a.click();
                    return true;
                }}
                return false;
            }})({}, {})"#,
            js_string(PAGE_NUMBER_LINKS),
            js_string(&number.to_string())
        );
        self.eval(&script).await
    }

    async fn wait_for_page_change(&mut self, from: u32) -> Result<Option<u32>, SessionError> {
        let deadline = Instant::now() + PAGE_CHANGE_WAIT;
        loop {
            let current = self.active_page_number().await?;
            if current.map_or(false, |n| n != from) || Instant::now() >= deadline {
                return Ok(current);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        match timeout(self.page_load_timeout, self.page.reload()).await {
            Ok(result) => {
                result.map_err(fault)?;
            }
            Err(_) => return Err(SessionError::Timeout(self.page_load_timeout)),
        }
        self.wait_for_body().await
    }

    async fn close(&mut self) {
        shut_down(&mut self.browser, &self.handler_task).await;
        discard_profile(&self.profile_dir).await;
        info!("Browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string("li.next a[aria-label='Next']"),
            r#""li.next a[aria-label='Next']""#
        );
        assert_eq!(js_string(r#"a[title="x"]"#), r#""a[title=\"x\"]""#);
    }

    #[test]
    fn test_profile_dirs_are_unique() {
        let launcher = ChromeLauncher::new(BrowserConfig::default());
        assert_ne!(launcher.profile_dir(), launcher.profile_dir());
    }

    #[tokio::test]
    async fn test_discard_profile_removes_the_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let profile = dir.path().join("card-harvest-1-0");
        std::fs::create_dir_all(profile.join("Default/Cache")).unwrap();
        std::fs::write(profile.join("Default/Preferences"), "{}").unwrap();

        discard_profile(&profile).await;
        assert!(!profile.exists());

        // already gone
        discard_profile(&profile).await;
        assert!(dir.path().exists());
    }
}
