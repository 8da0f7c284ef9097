//! State module for tracking crawl progress
//!
//! This module provides the state that lets long jobs resume after a crash.
//!
//! # Components
//!
//! - `NavState`: States of the list-page Navigator (loaded, scrolling, stalled, etc.)
//! - `CrawlState`: Persisted set of detail pages already written to the output
//! - `PackageProgress`: The last package whose crawl was started
//! - `Worklist`: Packages that yielded no cards, kept for a retry pass

mod crawl_state;
mod nav_state;
mod package_progress;

// Re-export main types
pub use crawl_state::CrawlState;
pub use nav_state::NavState;
pub use package_progress::{PackageProgress, Worklist, RESUME_LAST};
