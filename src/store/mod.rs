// src/store/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::extractors::listing::ListingRecord;
use crate::utils::error::StorageError;

/// Column order is fixed; import parses positionally against it.
pub const EXPORT_HEADER: &str =
    "Title,Price,Address,Year,Energy Certificate,Gross Area (m²),Util Area (m²),URL";

/// Outcome of a bulk import: rows appended vs. rows that failed to parse.
/// Rows skipped as duplicates (or with an empty URL) count as neither.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
}

/// The saved-listing collection, persisted as one JSON document at a fixed
/// path. Every mutation is a full read-modify-write of the collection; there
/// is no coordination between concurrent writers (last write wins).
pub struct ListingStore {
    path: PathBuf,
}

impl ListingStore {
    /// Creates a store backed by the given file, creating parent directories
    /// as needed. The file itself is only created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }

        Ok(Self { path })
    }

    /// Loads the full collection. A missing file is an empty collection;
    /// unreadable or undecodable content propagates as an error.
    pub fn list(&self) -> Result<Vec<ListingRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(StorageError::Io)?;
        serde_json::from_str(&raw).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn save(&self, records: &[ListingRecord]) -> Result<(), StorageError> {
        let rendered = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        fs::write(&self.path, rendered).map_err(StorageError::Io)?;

        tracing::debug!("Saved {} listing(s) to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Appends a record. URLs are not deduplicated here: re-capturing the
    /// same listing records it again.
    pub fn add(&self, record: ListingRecord) -> Result<(), StorageError> {
        let mut records = self.list()?;
        records.push(record);
        self.save(&records)
    }

    /// Removes the record with the given id. Removing an absent id is a
    /// successful no-op.
    pub fn remove(&self, id: &str) -> Result<(), StorageError> {
        let mut records = self.list()?;
        records.retain(|record| record.id != id);
        self.save(&records)
    }

    /// Renders the collection as delimited text, one row per record in
    /// insertion order. Title, address and URL are wrapped in double quotes;
    /// commas embedded in text fields are replaced with `-` beforehand, so
    /// rows always split into exactly eight columns.
    pub fn export_csv(&self) -> Result<String, StorageError> {
        let records = self.list()?;

        let mut lines = Vec::with_capacity(records.len() + 1);
        lines.push(EXPORT_HEADER.to_string());

        for record in &records {
            lines.push(format!(
                "\"{}\",{},\"{}\",{},{},{},{},\"{}\"",
                flatten_commas(&record.title),
                flatten_commas(&record.price),
                flatten_commas(&record.address),
                record.year,
                record.energy_certificate,
                record.gross_area,
                record.util_area,
                record.url,
            ));
        }

        Ok(lines.join("\n"))
    }

    /// Parses exported text back into records. The first line is assumed to
    /// be the header and skipped. Each row gets a fresh id and timestamp and
    /// an empty thumbnail (not recoverable from text). Rows are appended only
    /// when their URL is non-empty and not already present in the growing
    /// collection; malformed rows are counted and skipped. One final save
    /// persists the whole batch.
    pub fn import_csv(&self, text: &str) -> Result<ImportReport, StorageError> {
        let mut records = self.list()?;
        let mut report = ImportReport::default();

        for line in text.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            match parse_row(line) {
                Some(record) => {
                    if !record.url.is_empty() && !records.iter().any(|r| r.url == record.url) {
                        records.push(record);
                        report.success += 1;
                    }
                }
                None => {
                    tracing::warn!("Failed to parse row: {}", line);
                    report.failed += 1;
                }
            }
        }

        self.save(&records)?;

        tracing::info!(
            "Import finished. Success: {}, Failures: {}",
            report.success,
            report.failed
        );
        Ok(report)
    }
}

fn flatten_commas(field: &str) -> String {
    field.replace(',', "-")
}

/// Strips one wrapping quote pair, matching how export quotes the column.
fn strip_quotes(column: &str) -> &str {
    let column = column.strip_prefix('"').unwrap_or(column);
    column.strip_suffix('"').unwrap_or(column)
}

fn parse_row(line: &str) -> Option<ListingRecord> {
    let columns: Vec<&str> = line.split(',').collect();
    if columns.len() < 8 {
        return None;
    }

    let url = strip_quotes(columns[7]).to_string();

    Some(ListingRecord {
        id: Uuid::new_v4().to_string(),
        title: strip_quotes(columns[0]).to_string(),
        price: columns[1].to_string(),
        address: strip_quotes(columns[2]).to_string(),
        year: columns[3].to_string(),
        energy_certificate: columns[4].to_string(),
        gross_area: columns[5].to_string(),
        util_area: columns[6].to_string(),
        listing_url: url.clone(),
        url,
        thumbnail: String::new(),
        added_at: Utc::now().timestamp_millis(),
    })
}
