//! Persisted detail-fetch ledger
//!
//! The ledger is a set of detail cache paths whose parsed records have been
//! flushed to the output. It is stored as `{"done": [<path>, ...]}` and only
//! ever grows within a run.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::write_atomic;
use crate::Result;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    done: BTreeSet<String>,
}

/// Set of completed detail outputs, persisted with write-temp-then-rename
#[derive(Debug)]
pub struct CrawlState {
    path: PathBuf,
    done: BTreeSet<String>,
}

impl CrawlState {
    /// Loads the ledger; a missing or unreadable file starts an empty one
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let done = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Ledger>(&content) {
                Ok(ledger) => ledger.done,
                Err(e) => {
                    warn!(
                        "Ignoring unreadable state file {}: {}",
                        path.display(),
                        e
                    );
                    BTreeSet::new()
                }
            },
            Err(_) => BTreeSet::new(),
        };

        debug!("Loaded {} completed detail pages from {}", done.len(), path.display());
        Self { path, done }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, item: &str) -> bool {
        self.done.contains(item)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Adds the given items and atomically rewrites the ledger
    pub fn commit<I, S>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.done.extend(items.into_iter().map(Into::into));

        let ledger = Ledger {
            done: self.done.clone(),
        };
        let json = serde_json::to_vec(&ledger)?;
        write_atomic(&self.path, &json)?;

        debug!("Checkpointed {} completed detail pages", self.done.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = CrawlState::load(dir.path().join("detail_state.json"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_commit_persists_and_grows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detail_state.json");

        let mut state = CrawlState::load(&path);
        state.commit(["details/E01-001.html", "details/E01-002.html"]).unwrap();
        state.commit(vec!["details/E01-003.html".to_string()]).unwrap();

        let reloaded = CrawlState::load(&path);
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.contains("details/E01-002.html"));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["done"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detail_state.json");
        fs::write(&path, "{\"done\": [").unwrap();

        assert!(CrawlState::load(&path).is_empty());
    }
}
