//! Record de-duplication
//!
//! A [`Deduplicator`] keeps the first row for every computed key and drops the
//! rest, so iteration order decides which instance survives. It works on
//! in-memory [`CardRecord`]s during a crawl run and on raw CSV rows in the
//! standalone file pass.

use std::collections::HashSet;
use std::path::Path;

use clap::ValueEnum;
use csv::StringRecord;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::{CardRecord, Field, Schema};
use crate::Result;

/// Separator used when digesting a whole row (SYMBOL FOR UNIT SEPARATOR)
const ROW_SEPARATOR: &str = "\u{241F}";

/// How a row's de-duplication key is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyStrategy {
    /// `detail_url`, else `image_url`, else the card composite
    #[default]
    Auto,

    #[value(name = "detail_url")]
    DetailUrl,

    #[value(name = "image_url")]
    ImageUrl,

    /// Card number, rarity and both name fields
    Card,

    /// Card number and primary name; used within a crawl run
    #[value(skip)]
    Identity,
}

/// Read access to a row's named columns
pub trait RowView {
    /// Value of the named column; empty when the row has no such column
    fn column(&self, name: &str) -> &str;

    /// Every value of the row, in the row's own order
    fn values(&self) -> Vec<&str>;

    /// The display name: list-mode `name`, else the Chinese then Japanese name
    fn primary_name(&self) -> &str {
        ["name", "cn_name", "jp_name"]
            .iter()
            .map(|column| self.column(column).trim())
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

impl RowView for CardRecord {
    fn column(&self, name: &str) -> &str {
        Schema::List
            .field_for(name)
            .or_else(|| Schema::Full.field_for(name))
            .map(|field| self.get(field))
            .unwrap_or("")
    }

    fn values(&self) -> Vec<&str> {
        Field::ALL.iter().map(|field| self.get(*field)).collect()
    }
}

/// One CSV row viewed through its file's header
pub struct CsvRow<'a> {
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl<'a> CsvRow<'a> {
    pub fn new(headers: &'a StringRecord, record: &'a StringRecord) -> Self {
        Self { headers, record }
    }
}

impl RowView for CsvRow<'_> {
    fn column(&self, name: &str) -> &str {
        self.headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| self.record.get(i))
            .unwrap_or("")
    }

    fn values(&self) -> Vec<&str> {
        (0..self.headers.len())
            .map(|i| self.record.get(i).unwrap_or(""))
            .collect()
    }
}

/// Joins non-empty-overall parts; all-blank parts make an empty key
fn composite(parts: &[&str]) -> String {
    if parts.iter().all(|p| p.is_empty()) {
        return String::new();
    }
    parts.join("|")
}

fn card_composite<R: RowView + ?Sized>(row: &R) -> String {
    composite(&[
        row.column("card_number").trim(),
        row.column("rarity").trim(),
        row.column("cn_name").trim(),
        row.column("jp_name").trim(),
    ])
}

/// SHA-256 hex digest of every value of the row
pub fn row_digest<R: RowView + ?Sized>(row: &R) -> String {
    let payload = row.values().join(ROW_SEPARATOR);
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// The row's key under `strategy`; never empty
pub fn row_key<R: RowView + ?Sized>(row: &R, strategy: KeyStrategy) -> String {
    let key = match strategy {
        KeyStrategy::DetailUrl => row.column("detail_url").trim().to_string(),
        KeyStrategy::ImageUrl => row.column("image_url").trim().to_string(),
        KeyStrategy::Card => card_composite(row),
        KeyStrategy::Auto => [row.column("detail_url"), row.column("image_url")]
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| card_composite(row)),
        KeyStrategy::Identity => composite(&[row.column("card_number").trim(), row.primary_name()]),
    };

    if key.is_empty() {
        row_digest(row)
    } else {
        key
    }
}

/// First-wins filter over a stream of rows
#[derive(Debug)]
pub struct Deduplicator {
    strategy: KeyStrategy,
    seen: HashSet<String>,
    dropped: usize,
}

impl Deduplicator {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self {
            strategy,
            seen: HashSet::new(),
            dropped: 0,
        }
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Returns true the first time a key is seen
    pub fn admit<R: RowView + ?Sized>(&mut self, row: &R) -> bool {
        let fresh = self.seen.insert(row_key(row, self.strategy));
        if !fresh {
            self.dropped += 1;
        }
        fresh
    }

    /// Keeps the records whose keys have not been seen, in order
    pub fn filter(&mut self, records: Vec<CardRecord>) -> Vec<CardRecord> {
        records.into_iter().filter(|r| self.admit(r)).collect()
    }

    /// Rows dropped so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Distinct keys seen so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// De-duplicates a CSV file into a new file, keeping the input's header
///
/// Returns `(kept, total)`. A missing input is reported and yields `(0, 0)`.
pub fn dedupe_csv_file(
    input: &Path,
    output: &Path,
    strategy: KeyStrategy,
) -> Result<(usize, usize)> {
    if !input.exists() {
        warn!("Input CSV not found: {}", input.display());
        return Ok((0, 0));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(input)?;
    let mut headers = reader.headers()?.clone();
    if headers.is_empty() {
        headers = StringRecord::from(Schema::Full.headers());
    }

    let mut writer = csv::Writer::from_path(output)?;
    writer.write_record(&headers)?;

    let mut dedup = Deduplicator::new(strategy);
    let mut kept = 0;
    let mut total = 0;

    for result in reader.records() {
        let record = result?;
        total += 1;

        let row = CsvRow::new(&headers, &record);
        if !dedup.admit(&row) {
            continue;
        }
        writer.write_record(row.values())?;
        kept += 1;
    }

    writer.flush()?;
    debug!(
        "Deduplicated {} with strategy {:?}: kept {}/{}",
        input.display(),
        strategy,
        kept,
        total
    );

    Ok((kept, total))
}
