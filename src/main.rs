//! Card-Harvest main entry point
//!
//! This is the command-line interface for the Card-Harvest catalog scraper.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use card_harvest::config::{load_config_with_hash, Config};
use card_harvest::crawler::{Coordinator, PackageRequest, RunMode};
use card_harvest::KeyStrategy;
use tracing_subscriber::EnvFilter;

/// Card-Harvest: a resumable trading-card catalog scraper
///
/// Card-Harvest pages through the card database in a headless browser, saves
/// every page it sees, and turns the saved markup into CSV card lists. Every
/// mode picks up where an interrupted run left off.
#[derive(Parser, Debug)]
#[command(name = "card-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable trading-card catalog scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch list pages and save them to the work directory
    Fetch(ScrollArgs),

    /// Parse saved list pages into the list-schema CSV
    Parse {
        /// Only parse the first N saved pages
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Parse saved list pages into the full-schema CSV
    ListFull {
        /// Only parse the first N saved pages
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Fetch list pages, then parse them into both schemas
    Full(ScrollArgs),

    /// Resolve per-card detail pages into the full-schema CSV
    Detail {
        /// Only queue links from the first N saved pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Cap the detail queue at N items
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Crawl package pages into the full-schema CSV
    Package {
        /// Package URLs, or ALL to discover them from the package index
        urls: Vec<String>,

        /// Skip packages until this id; `last` resumes from the saved progress
        #[arg(long, value_name = "ID")]
        resume_from: Option<String>,

        /// Crawl the zero-result worklist instead of the given URLs
        #[arg(long)]
        retry_zero: bool,

        /// Maximum scroll rounds per package page
        #[arg(long)]
        max_scroll: Option<u32>,

        /// Unchanged rounds that end scrolling
        #[arg(long)]
        stable_rounds: Option<u32>,
    },

    /// De-duplicate a CSV file into a new file
    Dedupe {
        /// Input CSV (defaults to the full-schema output)
        #[arg(long = "in", value_name = "PATH")]
        input: Option<PathBuf>,

        /// Output CSV (defaults to <input stem>_deduped.csv)
        #[arg(long = "out", value_name = "PATH")]
        output: Option<PathBuf>,

        /// Key strategy
        #[arg(long, value_enum, default_value_t = KeyStrategy::Auto)]
        key: KeyStrategy,
    },
}

/// Navigator overrides shared by `fetch` and `full`
#[derive(Args, Debug)]
struct ScrollArgs {
    /// Stop after saving N pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum scroll rounds per list page
    #[arg(long)]
    max_scroll: Option<u32>,

    /// Unchanged rounds that end scrolling
    #[arg(long)]
    stable_rounds: Option<u32>,
}

impl ScrollArgs {
    fn apply(&self, config: &mut Config) {
        if self.max_pages.is_some() {
            config.navigator.max_pages = self.max_pages;
        }
        if let Some(rounds) = self.max_scroll {
            config.navigator.max_scroll_rounds = rounds;
        }
        if let Some(rounds) = self.stable_rounds {
            config.navigator.stable_rounds = rounds;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let mode = into_mode(cli.command, &mut config);
    if let Err(e) = execute(config, mode).await {
        tracing::error!("Run failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("card_harvest=info,warn"),
            1 => EnvFilter::new("card_harvest=debug,info"),
            2 => EnvFilter::new("card_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Folds command-line overrides into the config and picks the run mode
fn into_mode(command: Command, config: &mut Config) -> RunMode {
    match command {
        Command::Fetch(scroll) => {
            scroll.apply(config);
            RunMode::Fetch
        }
        Command::Parse { max_pages } => RunMode::Parse { max_pages },
        Command::ListFull { max_pages } => RunMode::ListFull { max_pages },
        Command::Full(scroll) => {
            scroll.apply(config);
            RunMode::Full
        }
        Command::Detail {
            max_pages,
            max_items,
        } => RunMode::Detail {
            max_pages,
            max_items,
        },
        Command::Package {
            urls,
            resume_from,
            retry_zero,
            max_scroll,
            stable_rounds,
        } => {
            if let Some(rounds) = max_scroll {
                config.package.max_scroll_rounds = rounds;
            }
            if let Some(rounds) = stable_rounds {
                config.package.stable_rounds = rounds;
            }
            RunMode::Package(PackageRequest {
                urls,
                resume_from,
                retry_zero,
            })
        }
        Command::Dedupe { input, output, key } => RunMode::Dedupe {
            input,
            output,
            strategy: key,
        },
    }
}

async fn execute(config: Config, mode: RunMode) -> anyhow::Result<()> {
    card_harvest::config::validate(&config).context("Invalid configuration")?;
    let mut coordinator = Coordinator::new(config)?;

    match mode.clone() {
        RunMode::Dedupe {
            input,
            output,
            strategy,
        } => println!("{}", coordinator.dedupe(input, output, strategy)?),
        other => coordinator.run(other).await?,
    }

    coordinator.finish(&mode);
    Ok(())
}
