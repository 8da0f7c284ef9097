//! Package-crawl progress: the last started package and the zero-result worklist

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::write_atomic;
use crate::Result;

/// Resume token that resolves to the persisted last package
pub const RESUME_LAST: &str = "last";

/// Identifier of the last package whose crawl was started
#[derive(Debug, Clone)]
pub struct PackageProgress {
    path: PathBuf,
}

impl PackageProgress {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The persisted package id, if any
    pub fn last(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn record(&self, package_id: &str) -> Result<()> {
        write_atomic(&self.path, package_id.as_bytes())?;
        debug!("Recorded package progress: {}", package_id);
        Ok(())
    }

    /// Resolves a resume-from argument; `last` maps to the persisted id
    pub fn resolve(&self, resume_from: Option<&str>) -> Option<String> {
        match resume_from {
            Some(RESUME_LAST) => self.last(),
            Some(id) => Some(id.to_string()),
            None => None,
        }
    }
}

/// Append-only list of package URLs that produced no parsed cards
#[derive(Debug, Clone)]
pub struct Worklist {
    path: PathBuf,
}

impl Worklist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, url: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", url)?;
        Ok(())
    }

    /// Queued URLs in file order, without blanks or repeats
    pub fn read(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut urls: Vec<String> = Vec::new();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !urls.iter().any(|u| u == line) {
                urls.push(line.to_string());
            }
        }
        Ok(urls)
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
