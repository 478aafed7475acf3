//! Listing sources backed by the scraper's output

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::common::errors::Result;
use crate::common::traits::ListingSource;
use crate::common::types::{canonical_item_name, Listing};

/// Reads listings from a JSON snapshot written by the external scraper
///
/// The file maps item names to arrays of `{"price": "...", "intent": "buy"|"sell"}`.
/// It is re-read on every fetch so a scraper can overwrite it between cycles.
#[derive(Debug, Clone)]
pub struct FileListingSource {
    path: PathBuf,
}

impl FileListingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, Vec<Listing>>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let parsed: HashMap<String, Vec<Listing>> = serde_json::from_str(&raw)?;
        Ok(parsed
            .into_iter()
            .map(|(name, listings)| (canonical_item_name(&name), listings))
            .collect())
    }
}

#[async_trait]
impl ListingSource for FileListingSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch_listings(&self, item_name: &str) -> Result<Vec<Listing>> {
        let mut snapshot = self.load().await?;
        let listings = snapshot
            .remove(&canonical_item_name(item_name))
            .unwrap_or_default();
        debug!(count = listings.len(), "Loaded listings");
        Ok(listings)
    }
}
