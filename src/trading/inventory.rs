//! Own-inventory snapshots with a short-lived cache
//!
//! Fetching the inventory is slow and rate limited. Callers share one
//! snapshot until it expires; a refresh holds the lock across the fetch so
//! concurrent callers wait for that fetch instead of starting their own.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::common::errors::Result;
use crate::common::traits::TradingPlatform;
use crate::common::types::{canonical_item_name, InventoryListing, PureSnapshot};
use crate::pricing::currency::PureKind;

/// Point-in-time view of our own holdings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySnapshot {
    pub pure: PureSnapshot,
    counts: HashMap<String, u32>,
    asset_ids: HashSet<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl InventorySnapshot {
    /// Build from a raw listing, keeping one app's assets
    pub fn from_listing(listing: &InventoryListing, app_id: u32) -> Self {
        let mut snapshot = Self {
            fetched_at: listing.fetched_at.or_else(|| Some(Utc::now())),
            ..Self::default()
        };

        for asset in listing.assets.iter().filter(|a| a.app_id == app_id) {
            let name = listing
                .descriptions
                .name_for(asset)
                .map(str::to_string)
                .unwrap_or_else(|| asset.description_key());
            let quantity = asset.amount.max(1);

            *snapshot.counts.entry(canonical_item_name(&name)).or_insert(0) += quantity;
            snapshot.asset_ids.insert(asset.asset_id.clone());

            match PureKind::from_name(&name) {
                Some(PureKind::Key) => snapshot.pure.keys += quantity,
                Some(PureKind::Refined) => snapshot.pure.refined += quantity,
                Some(PureKind::Reclaimed) => snapshot.pure.reclaimed += quantity,
                Some(PureKind::Scrap) => snapshot.pure.scrap += quantity,
                None => {}
            }
        }

        snapshot
    }

    pub fn count_of(&self, name: &str) -> u32 {
        self.counts
            .get(&canonical_item_name(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains_asset(&self, asset_id: &str) -> bool {
        self.asset_ids.contains(asset_id)
    }

    pub fn asset_count(&self) -> usize {
        self.asset_ids.len()
    }
}

struct CachedSnapshot {
    snapshot: Arc<InventorySnapshot>,
    loaded_at: Instant,
}

/// TTL cache over the platform's own-inventory call
pub struct InventoryCache {
    platform: Arc<dyn TradingPlatform>,
    app_id: u32,
    ttl: Duration,
    slot: Mutex<Option<CachedSnapshot>>,
}

impl InventoryCache {
    pub fn new(platform: Arc<dyn TradingPlatform>, app_id: u32, ttl: Duration) -> Self {
        Self {
            platform,
            app_id,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Cached snapshot, fetched if missing or older than the TTL
    pub async fn snapshot(&self) -> Result<Arc<InventorySnapshot>> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.snapshot.clone());
            }
        }
        self.fetch_into(&mut slot).await
    }

    /// Always fetch, replacing the cached snapshot
    pub async fn refresh(&self) -> Result<Arc<InventorySnapshot>> {
        let mut slot = self.slot.lock().await;
        self.fetch_into(&mut slot).await
    }

    /// Drop the cached snapshot so the next read fetches
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }

    #[instrument(skip(self, slot), fields(platform = self.platform.platform_name()))]
    async fn fetch_into(&self, slot: &mut Option<CachedSnapshot>) -> Result<Arc<InventorySnapshot>> {
        let listing = self.platform.own_inventory().await?;
        let snapshot = Arc::new(InventorySnapshot::from_listing(&listing, self.app_id));
        debug!(
            assets = snapshot.asset_count(),
            keys = snapshot.pure.keys,
            refined = snapshot.pure.refined,
            "Inventory refreshed"
        );
        *slot = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            loaded_at: Instant::now(),
        });
        Ok(snapshot)
    }
}
