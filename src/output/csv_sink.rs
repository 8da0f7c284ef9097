//! CSV-file record sink

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::traits::{OutputResult, RecordSink};
use crate::model::{CardRecord, Schema};

/// UTF-8 CSV file (no byte-order mark) with one of the fixed schemas
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    schema: Schema,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl RecordSink for CsvSink {
    fn schema(&self) -> Schema {
        self.schema
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn write_header(&mut self) -> OutputResult<()> {
        self.ensure_parent()?;
        let file = File::create(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(self.schema.headers())?;
        writer.flush()?;

        debug!("Wrote {} header to {}", self.schema, self.path.display());
        Ok(())
    }

    fn append(&mut self, records: &[CardRecord]) -> OutputResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        self.ensure_parent()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for record in records {
            writer.write_record(self.schema.row(record))?;
        }
        writer.flush()?;

        debug!("Appended {} rows to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}
