//! The set of article URLs already in the store.
//!
//! Consulted before an article is fetched and updated only after its row is
//! on disk, so a URL in the set always has a persisted row.

use crate::models::CsvRow;
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct SeenUrls {
    urls: HashSet<String>,
}

impl SeenUrls {
    /// Seed from persisted rows; rows without a URL contribute nothing.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a CsvRow>) -> Self {
        let urls = rows
            .into_iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.clone())
            .collect();
        SeenUrls { urls }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns `false` if the URL was already known.
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
