//! File-backed page store

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{io_error, write_atomic, StorageResult};
use crate::url::detail_stem;

const LIST_PREFIX: &str = "list_page_";
const PACKAGE_PREFIX: &str = "package_";
const HTML_SUFFIX: &str = ".html";
const DETAIL_DIR: &str = "details";

/// Raw markup snapshots keyed by page index, package id or detail stem
#[derive(Debug, Clone)]
pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    /// Opens the store, creating the work directory and detail cache
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let details = root.join(DETAIL_DIR);
        fs::create_dir_all(&details).map_err(io_error(&details))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn list_page_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("{LIST_PREFIX}{index}{HTML_SUFFIX}"))
    }

    pub fn package_path(&self, package_id: &str) -> PathBuf {
        self.root
            .join(format!("{PACKAGE_PREFIX}{package_id}{HTML_SUFFIX}"))
    }

    /// Deterministic cache path of a detail page
    pub fn detail_path(&self, detail_url: &str, card_number: &str) -> PathBuf {
        self.root
            .join(DETAIL_DIR)
            .join(format!("{}{HTML_SUFFIX}", detail_stem(detail_url, card_number)))
    }

    pub fn save_list_page(&self, index: usize, html: &str) -> StorageResult<PathBuf> {
        let path = self.list_page_path(index);
        write_atomic(&path, html.as_bytes())?;
        debug!("Saved list page {} to {}", index, path.display());
        Ok(path)
    }

    pub fn save_package(&self, package_id: &str, html: &str) -> StorageResult<PathBuf> {
        let path = self.package_path(package_id);
        write_atomic(&path, html.as_bytes())?;
        debug!("Saved package {} to {}", package_id, path.display());
        Ok(path)
    }

    pub fn save(&self, path: &Path, html: &str) -> StorageResult<()> {
        write_atomic(path, html.as_bytes())
    }

    pub fn read(&self, path: &Path) -> StorageResult<String> {
        fs::read_to_string(path).map_err(io_error(path))
    }

    /// Saved list pages in increasing index order, optionally only the first `max`
    pub fn list_pages(&self, max: Option<usize>) -> StorageResult<Vec<(usize, PathBuf)>> {
        let entries = fs::read_dir(&self.root).map_err(io_error(&self.root))?;

        let mut pages: Vec<(usize, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let index: usize = name
                    .to_str()?
                    .strip_prefix(LIST_PREFIX)?
                    .strip_suffix(HTML_SUFFIX)?
                    .parse()
                    .ok()?;
                Some((index, entry.path()))
            })
            .collect();

        pages.sort_by_key(|(index, _)| *index);
        if let Some(max) = max {
            pages.truncate(max);
        }
        Ok(pages)
    }

    /// Highest saved list-page index, 0 when nothing is saved yet
    pub fn last_page_index(&self) -> StorageResult<usize> {
        Ok(self
            .list_pages(None)?
            .last()
            .map(|(index, _)| *index)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pages_are_numerically_ordered() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(dir.path()).unwrap();

        for index in [10, 2, 1] {
            store.save_list_page(index, "<html></html>").unwrap();
        }
        fs::write(dir.path().join("list_page_x.html"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let indexes: Vec<_> = store
            .list_pages(None)
            .unwrap()
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(indexes, vec![1, 2, 10]);
        assert_eq!(store.last_page_index().unwrap(), 10);
        assert_eq!(store.list_pages(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(dir.path().join("work")).unwrap();

        assert_eq!(store.last_page_index().unwrap(), 0);
        assert!(dir.path().join("work").join("details").is_dir());
    }

    #[test]
    fn test_snapshot_paths() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(dir.path()).unwrap();

        let path = store.save_package("B01", "<html>pkg</html>").unwrap();
        assert_eq!(path, dir.path().join("package_B01.html"));
        assert_eq!(store.read(&path).unwrap(), "<html>pkg</html>");

        assert_eq!(
            store.detail_path("https://site/Cards/1", "E53-021"),
            dir.path().join("details").join("E53-021.html")
        );
    }
}
