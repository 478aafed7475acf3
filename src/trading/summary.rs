//! Offer summarizer
//!
//! Reduces the two asset lists of a proposal to name/quantity tallies.
//! Assets without a description are tallied under their "classid_instanceid"
//! key so they still reach the allow-list check. Assets from other games are
//! left out of the tallies; the ones we would give are listed separately.

use std::collections::BTreeMap;
use tracing::debug;

use crate::common::types::{canonical_item_name, display_item_name, Asset, DescriptionTable, TradeProposal};
use crate::pricing::currency::{Denominations, PureKind};

/// Aggregated quantity of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTally {
    /// Display name (first seen spelling, article removed)
    pub name: String,
    pub quantity: u32,
}

/// Net items received and given, keyed by canonical name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferSummary {
    pub received: BTreeMap<String, ItemTally>,
    pub given: BTreeMap<String, ItemTally>,
    /// Asset ids we would give away, for liveness checks
    pub given_asset_ids: Vec<String>,
    /// Asset ids we would give away that belong to another game
    pub given_other_apps: Vec<String>,
}

impl OfferSummary {
    pub fn received_quantity(&self, name: &str) -> u32 {
        self.received
            .get(&canonical_item_name(name))
            .map_or(0, |tally| tally.quantity)
    }

    pub fn given_quantity(&self, name: &str) -> u32 {
        self.given
            .get(&canonical_item_name(name))
            .map_or(0, |tally| tally.quantity)
    }

    pub fn received_pure(&self) -> Denominations {
        pure_of(&self.received)
    }

    pub fn given_pure(&self) -> Denominations {
        pure_of(&self.given)
    }

    pub fn received_non_pure(&self) -> impl Iterator<Item = &ItemTally> {
        non_pure_of(&self.received)
    }

    pub fn given_non_pure(&self) -> impl Iterator<Item = &ItemTally> {
        non_pure_of(&self.given)
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty() && self.given.is_empty()
    }
}

fn pure_of(side: &BTreeMap<String, ItemTally>) -> Denominations {
    let mut out = Denominations::default();
    for (key, tally) in side {
        if let Some(kind) = PureKind::from_name(key) {
            out.add(kind, tally.quantity);
        }
    }
    out
}

fn non_pure_of(side: &BTreeMap<String, ItemTally>) -> impl Iterator<Item = &ItemTally> {
    side.iter()
        .filter(|(key, _)| PureKind::from_name(key).is_none())
        .map(|(_, tally)| tally)
}

/// Builds summaries for one game's assets
#[derive(Debug, Clone, Copy)]
pub struct OfferSummarizer {
    app_id: u32,
}

impl OfferSummarizer {
    pub fn new(app_id: u32) -> Self {
        Self { app_id }
    }

    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    pub fn summarize(&self, proposal: &TradeProposal, descriptions: &DescriptionTable) -> OfferSummary {
        let mut summary = OfferSummary::default();

        for asset in self.relevant(&proposal.items_to_receive) {
            tally(&mut summary.received, asset, descriptions);
        }
        for asset in &proposal.items_to_give {
            if asset.app_id == self.app_id {
                tally(&mut summary.given, asset, descriptions);
                summary.given_asset_ids.push(asset.asset_id.clone());
            } else {
                summary.given_other_apps.push(asset.asset_id.clone());
            }
        }

        let skipped = proposal.items_to_receive.len() - self.relevant(&proposal.items_to_receive).count();
        if skipped > 0 {
            debug!(offer_id = %proposal.offer_id, skipped, "Ignored received assets from other apps");
        }
        if !summary.given_other_apps.is_empty() {
            debug!(
                offer_id = %proposal.offer_id,
                assets = ?summary.given_other_apps,
                "Offer asks for assets from other apps"
            );
        }

        summary
    }

    fn relevant<'a>(&self, assets: &'a [Asset]) -> impl Iterator<Item = &'a Asset> + 'a {
        let app_id = self.app_id;
        assets.iter().filter(move |asset| asset.app_id == app_id)
    }
}

fn tally(side: &mut BTreeMap<String, ItemTally>, asset: &Asset, descriptions: &DescriptionTable) {
    let name = descriptions
        .name_for(asset)
        .map(str::to_string)
        .unwrap_or_else(|| asset.description_key());

    let entry = side
        .entry(canonical_item_name(&name))
        .or_insert_with(|| ItemTally {
            name: display_item_name(&name),
            quantity: 0,
        });
    entry.quantity = entry.quantity.saturating_add(asset.amount.max(1));
}
