//! Configuration module for Card-Harvest
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so an absent file is valid.
//!
//! # Example
//!
//! ```no_run
//! use card_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Scroll rounds per page: {}", config.navigator.max_scroll_rounds);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, FetcherConfig, NavigatorConfig, OutputConfig, PackageConfig,
    PacingConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
