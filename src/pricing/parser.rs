//! Free-text listing price parser
//!
//! Listing prices arrive as comma-separated fragments such as
//! "1 key, 15 ref" or "65.33 ref". Each fragment is a number followed by a
//! currency label. Numbers are always read with '.' as the decimal
//! separator, independent of the host locale.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::trace;

use super::currency::{PureKind, RECLAIMED_VALUE, REFINED_VALUE, SCRAP_VALUE};

/// Labels accepted at the end of a fragment, longest first so "keys" wins over "key"
const LABELS: [(&str, PureKind); 8] = [
    ("keys", PureKind::Key),
    ("key", PureKind::Key),
    ("refined", PureKind::Refined),
    ("ref", PureKind::Refined),
    ("reclaimed", PureKind::Reclaimed),
    ("rec", PureKind::Reclaimed),
    ("scraps", PureKind::Scrap),
    ("scrap", PureKind::Scrap),
];

/// Outcome of reading one comma-separated fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    Value(Decimal),
    /// Not a price fragment; ignored
    Skip,
    /// A price fragment that cannot be valued; the whole listing is rejected
    Invalid,
}

/// Parse a listing price into refined-metal units
///
/// Unparseable fragments are skipped. A key fragment without a positive
/// `key_price`, or any amount too large to represent, rejects the whole
/// listing. Returns `None` when the total is not positive, including when no
/// fragment parsed at all; callers discard the listing in that case.
pub fn parse_listing_price(text: &str, key_price: Decimal) -> Option<Decimal> {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let total = lowered
        .split(',')
        .try_fold(Decimal::ZERO, |total, fragment| {
            match parse_fragment(fragment, key_price) {
                Fragment::Value(value) => total.checked_add(value),
                Fragment::Skip => Some(total),
                Fragment::Invalid => None,
            }
        })?;

    (total > Decimal::ZERO).then_some(total)
}

fn parse_fragment(fragment: &str, key_price: Decimal) -> Fragment {
    let fragment = fragment.trim();
    let Some((amount_text, kind)) = LABELS.iter().find_map(|(label, kind)| {
        fragment
            .strip_suffix(label)
            .map(|rest| (rest.trim(), *kind))
    }) else {
        return Fragment::Skip;
    };

    let amount = match Decimal::from_str(amount_text) {
        Ok(amount) if amount >= Decimal::ZERO => amount,
        _ => {
            trace!(fragment, "Skipping unparseable price fragment");
            return Fragment::Skip;
        }
    };

    let unit = match kind {
        PureKind::Key if key_price <= Decimal::ZERO => {
            trace!(fragment, "Key fragment without a key price");
            return Fragment::Invalid;
        }
        PureKind::Key => key_price,
        PureKind::Refined => REFINED_VALUE,
        PureKind::Reclaimed => RECLAIMED_VALUE,
        PureKind::Scrap => SCRAP_VALUE,
    };
    match amount.checked_mul(unit) {
        Some(value) => Fragment::Value(value),
        None => {
            trace!(fragment, "Price fragment overflows");
            Fragment::Invalid
        }
    }
}

/// Parser bound to a key price, for callers that parse many listings at once
#[derive(Debug, Clone, Copy)]
pub struct ListingPriceParser {
    key_price: Decimal,
}

impl ListingPriceParser {
    pub fn new(key_price: Decimal) -> Self {
        Self { key_price }
    }

    pub fn key_price(&self) -> Decimal {
        self.key_price
    }

    pub fn parse(&self, text: &str) -> Option<Decimal> {
        parse_listing_price(text, self.key_price)
    }
}
