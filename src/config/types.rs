use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Card-Harvest
///
/// Every table is optional; a missing file or table falls back to the
/// defaults below, which target the public card database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub navigator: NavigatorConfig,
    pub package: PackageConfig,
    pub fetcher: FetcherConfig,
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

/// Target site locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search/list view the navigator starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Base used to absolutize relative links and image sources
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Page listing every package, used by `ALL` discovery
    #[serde(rename = "package-index-url")]
    pub package_index_url: String,

    /// Path prefix of per-card detail links
    #[serde(rename = "card-link-prefix")]
    pub card_link_prefix: String,

    /// Path prefix of package links on the package index
    #[serde(rename = "package-link-prefix")]
    pub package_link_prefix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            start_url: "https://zxcard.yimieji.com/search".to_string(),
            base_url: "https://zxcard.yimieji.com".to_string(),
            package_index_url: "https://zxcard.yimieji.com/package".to_string(),
            card_link_prefix: "/Cards/".to_string(),
            package_link_prefix: "/Package/".to_string(),
        }
    }
}

/// Rendering session settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Upper bound for a single navigation (seconds)
    #[serde(rename = "page-load-timeout")]
    pub page_load_timeout: u64,

    /// Upper bound for readiness waits such as "body exists" (seconds)
    #[serde(rename = "explicit-wait")]
    pub explicit_wait: u64,

    #[serde(rename = "window-width")]
    pub window_width: u32,

    #[serde(rename = "window-height")]
    pub window_height: u32,

    /// Accept-Language sent by both the browser and the HTTP client
    pub language: String,

    /// Pool rotated between sessions and between HTTP retries
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: 30,
            explicit_wait: 20,
            window_width: 1920,
            window_height: 1080,
            language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout)
    }

    pub fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait)
    }
}

/// List-page navigation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Scroll rounds per page before giving up on lazy loading
    #[serde(rename = "max-scroll-rounds")]
    pub max_scroll_rounds: u32,

    /// Unchanged document-height rounds that count as "fully loaded"
    #[serde(rename = "stable-rounds")]
    pub stable_rounds: u32,

    /// Stop after saving this many pages in one run
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,

    /// Consecutive stalls that end the crawl
    #[serde(rename = "max-consecutive-stalls")]
    pub max_consecutive_stalls: u32,

    /// Next-page attempts before a stall is counted
    #[serde(rename = "advance-attempts")]
    pub advance_attempts: u32,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_scroll_rounds: 20,
            stable_rounds: 1,
            max_pages: None,
            max_consecutive_stalls: 2,
            advance_attempts: 3,
        }
    }
}

/// Package crawl settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    #[serde(rename = "max-scroll-rounds")]
    pub max_scroll_rounds: u32,

    /// Unchanged card-count rounds that count as "fully loaded"
    #[serde(rename = "stable-rounds")]
    pub stable_rounds: u32,

    /// Page-load attempts before the package is skipped
    #[serde(rename = "load-attempts")]
    pub load_attempts: u32,

    /// Pause between failed load attempts (seconds)
    #[serde(rename = "retry-delay")]
    pub retry_delay: u64,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            max_scroll_rounds: 150,
            stable_rounds: 3,
            load_attempts: 3,
            retry_delay: 5,
        }
    }
}

/// Detail fetch settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout of the lightweight fetcher (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    #[serde(rename = "http-attempts")]
    pub http_attempts: u32,

    #[serde(rename = "browser-attempts")]
    pub browser_attempts: u32,

    /// Records buffered before each flush + checkpoint
    #[serde(rename = "batch-size")]
    pub batch_size: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: 20,
            http_attempts: 4,
            browser_attempts: 3,
            batch_size: 50,
        }
    }
}

/// Courtesy delays
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Multiplier applied to every jitter sleep and retry backoff; 0 disables them
    #[serde(rename = "jitter-scale")]
    pub jitter_scale: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { jitter_scale: 1.0 }
    }
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the page store (raw list pages, package pages, detail cache)
    #[serde(rename = "work-dir")]
    pub work_dir: PathBuf,

    #[serde(rename = "list-csv")]
    pub list_csv: PathBuf,

    #[serde(rename = "full-csv")]
    pub full_csv: PathBuf,

    /// Detail pipeline ledger; relative paths live under `work-dir`
    #[serde(rename = "state-file")]
    pub state_file: PathBuf,

    /// Worklist of packages that parsed to zero rows; relative to `work-dir`
    #[serde(rename = "zero-packages-file")]
    pub zero_packages_file: PathBuf,

    /// Last started package; relative to `work-dir`
    #[serde(rename = "progress-file")]
    pub progress_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("debug_yimieji"),
            list_csv: PathBuf::from("zx2_cards.csv"),
            full_csv: PathBuf::from("zx2_cards_full.csv"),
            state_file: PathBuf::from("detail_state.json"),
            zero_packages_file: PathBuf::from("zero_packages.txt"),
            progress_file: PathBuf::from("last_package.txt"),
        }
    }
}

impl OutputConfig {
    fn in_work_dir(&self, path: &PathBuf) -> PathBuf {
        if path.is_absolute() {
            path.clone()
        } else {
            self.work_dir.join(path)
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.in_work_dir(&self.state_file)
    }

    pub fn zero_packages_path(&self) -> PathBuf {
        self.in_work_dir(&self.zero_packages_file)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.in_work_dir(&self.progress_file)
    }
}
