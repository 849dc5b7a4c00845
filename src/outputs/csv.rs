//! CSV store for collected articles.
//!
//! The file keeps the newest article on the first data row. Adding a record
//! therefore rewrites the whole file: rows go to a sibling `.tmp` file which
//! is synced and renamed over the original, so a crash leaves either the old
//! or the new file, never a torn one.
//!
//! # Encoding
//!
//! UTF-8 with a byte-order mark. Spreadsheet tools use the BOM to detect
//! UTF-8; without it Arabic text opens as mojibake.
//!
//! ```text
//! ScrapedAt,PublishedAt,URL,Title,Body,Category,IsNotificationOnly
//! 2025-11-18T14:02:07,2025-11-18T13:57,https://...,...,...,محليات,False
//! ```

use crate::dedup::SeenUrls;
use crate::error::StoreError;
use crate::models::{ArticleRecord, CsvRow, CSV_FIELDS};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Outcome of [`CsvStore::prepend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepend {
    Written,
    Duplicate,
}

#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    rows: Vec<CsvRow>,
}

impl CsvStore {
    /// Load the store at `path`, or start empty if the file does not exist.
    ///
    /// Repeated URLs in an existing file are collapsed to their first (newest) row.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            info!("CSV file does not exist yet; will create a new one");
            return Ok(CsvStore {
                path: path.to_path_buf(),
                rows: Vec::new(),
            });
        }

        let raw = fs::read(path)?;
        let data = raw.strip_prefix(BOM).unwrap_or(&raw);
        let mut reader = csv::Reader::from_reader(data);

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        let mut collapsed = 0usize;
        for result in reader.deserialize::<CsvRow>() {
            let row = result?;
            if !row.url.is_empty() && !seen.insert(row.url.clone()) {
                collapsed += 1;
                continue;
            }
            rows.push(row);
        }
        if collapsed > 0 {
            warn!(collapsed, "Dropped repeated URLs from existing CSV");
        }
        info!(rows = rows.len(), unique_urls = seen.len(), "Loaded existing CSV");

        Ok(CsvStore {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows newest-first.
    #[cfg(test)]
    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// URLs already persisted.
    pub fn seen_urls(&self) -> SeenUrls {
        SeenUrls::from_rows(&self.rows)
    }

    /// Put `record` at the top of the store and flush it to disk.
    ///
    /// `seen` is updated only once the file has been replaced.
    #[instrument(level = "debug", skip_all, fields(url = %record.url))]
    pub fn prepend(
        &mut self,
        record: &ArticleRecord,
        seen: &mut SeenUrls,
    ) -> Result<Prepend, StoreError> {
        if seen.contains(&record.url) {
            debug!("Duplicate URL (already in CSV), skipping");
            return Ok(Prepend::Duplicate);
        }

        self.rows.insert(0, CsvRow::from(record));
        if let Err(e) = self.write_all() {
            self.rows.remove(0);
            return Err(e);
        }
        seen.insert(&record.url);
        info!(title = %record.title, "Added article");
        Ok(Prepend::Written)
    }

    fn write_all(&self) -> Result<(), StoreError> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let file = File::create(&tmp_path)?;
        let mut out = BufWriter::new(file);
        out.write_all(BOM)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut out);
            writer.write_record(CSV_FIELDS)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        debug!(rows = self.rows.len(), path = %self.path.display(), "Wrote CSV");
        Ok(())
    }
}
