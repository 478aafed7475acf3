//! Conversion between refined-metal values and discrete currency items
//!
//! Metal uses the community two-decimal notation: one refined is 1.00,
//! one reclaimed is 0.33 and one scrap is 0.11. The key has no fixed rate;
//! its current price is always supplied by the caller.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::fmt;

use crate::common::types::{canonical_item_name, PureSnapshot};

pub const KEY_NAME: &str = "Mann Co. Supply Crate Key";
pub const REFINED_NAME: &str = "Refined Metal";
pub const RECLAIMED_NAME: &str = "Reclaimed Metal";
pub const SCRAP_NAME: &str = "Scrap Metal";

pub const REFINED_VALUE: Decimal = dec!(1.00);
pub const RECLAIMED_VALUE: Decimal = dec!(0.33);
pub const SCRAP_VALUE: Decimal = dec!(0.11);

/// Maximum distance from an exact metal combination for a clean price
pub const CLEAN_TOLERANCE: Decimal = dec!(0.0001);

/// One of the four currency ("pure") items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PureKind {
    Key,
    Refined,
    Reclaimed,
    Scrap,
}

impl PureKind {
    pub const ALL: [PureKind; 4] = [
        PureKind::Key,
        PureKind::Refined,
        PureKind::Reclaimed,
        PureKind::Scrap,
    ];

    /// Recognize a pure item by name (any case, leading article ignored)
    pub fn from_name(name: &str) -> Option<Self> {
        let canonical = canonical_item_name(name);
        Self::ALL
            .into_iter()
            .find(|kind| canonical_item_name(kind.item_name()) == canonical)
    }

    pub fn item_name(&self) -> &'static str {
        match self {
            PureKind::Key => KEY_NAME,
            PureKind::Refined => REFINED_NAME,
            PureKind::Reclaimed => RECLAIMED_NAME,
            PureKind::Scrap => SCRAP_NAME,
        }
    }

    /// Fixed metal value; `None` for the floating key
    pub fn fixed_value(&self) -> Option<Decimal> {
        match self {
            PureKind::Key => None,
            PureKind::Refined => Some(REFINED_VALUE),
            PureKind::Reclaimed => Some(RECLAIMED_VALUE),
            PureKind::Scrap => Some(SCRAP_VALUE),
        }
    }

    /// Value of one unit given the current key price
    pub fn unit_value(&self, key_price: Decimal) -> Decimal {
        self.fixed_value().unwrap_or(key_price)
    }

    /// How many of this kind a holdings snapshot contains
    pub fn held_in(&self, snapshot: &PureSnapshot) -> u32 {
        match self {
            PureKind::Key => snapshot.keys,
            PureKind::Refined => snapshot.refined,
            PureKind::Reclaimed => snapshot.reclaimed,
            PureKind::Scrap => snapshot.scrap,
        }
    }

    fn short_label(&self) -> &'static str {
        match self {
            PureKind::Key => "key",
            PureKind::Refined => "ref",
            PureKind::Reclaimed => "rec",
            PureKind::Scrap => "scrap",
        }
    }
}

/// A value expressed as counts of each currency item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Denominations {
    pub keys: u32,
    pub refined: u32,
    pub reclaimed: u32,
    pub scrap: u32,
}

impl Denominations {
    pub fn new(keys: u32, refined: u32, reclaimed: u32, scrap: u32) -> Self {
        Self {
            keys,
            refined,
            reclaimed,
            scrap,
        }
    }

    /// Split a value into currency items, largest first
    ///
    /// Keys and whole refined are taken greedily, then reclaimed; the
    /// remainder is rounded to the nearest scrap and carries are normalized
    /// (3 scrap into a reclaimed, 3 reclaimed into a refined). A non-positive
    /// key price means no keys are used.
    pub fn from_scalar(value: Decimal, key_price: Decimal) -> Self {
        if value <= Decimal::ZERO {
            return Self::default();
        }

        let mut remaining = value;

        let keys = if key_price > Decimal::ZERO {
            (remaining / key_price).floor()
        } else {
            Decimal::ZERO
        };
        remaining -= keys * key_price;

        let refined = remaining.floor();
        remaining -= refined;

        let reclaimed = (remaining / RECLAIMED_VALUE).floor();
        remaining -= reclaimed * RECLAIMED_VALUE;

        let scrap = (remaining / SCRAP_VALUE)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .max(Decimal::ZERO);

        let mut out = Self {
            keys: keys.to_u32().unwrap_or(0),
            refined: refined.to_u32().unwrap_or(0),
            reclaimed: reclaimed.to_u32().unwrap_or(0),
            scrap: scrap.to_u32().unwrap_or(0),
        };
        out.normalize();
        out
    }

    fn normalize(&mut self) {
        self.reclaimed += self.scrap / 3;
        self.scrap %= 3;
        self.refined += self.reclaimed / 3;
        self.reclaimed %= 3;
    }

    /// Total value given the current key price
    pub fn to_scalar(&self, key_price: Decimal) -> Decimal {
        Decimal::from(self.keys) * key_price + self.metal_value()
    }

    /// Value of the metal part only
    pub fn metal_value(&self) -> Decimal {
        Decimal::from(self.refined) * REFINED_VALUE
            + Decimal::from(self.reclaimed) * RECLAIMED_VALUE
            + Decimal::from(self.scrap) * SCRAP_VALUE
    }

    pub fn count(&self, kind: PureKind) -> u32 {
        match kind {
            PureKind::Key => self.keys,
            PureKind::Refined => self.refined,
            PureKind::Reclaimed => self.reclaimed,
            PureKind::Scrap => self.scrap,
        }
    }

    pub fn add(&mut self, kind: PureKind, quantity: u32) {
        let slot = match kind {
            PureKind::Key => &mut self.keys,
            PureKind::Refined => &mut self.refined,
            PureKind::Reclaimed => &mut self.reclaimed,
            PureKind::Scrap => &mut self.scrap,
        };
        *slot = slot.saturating_add(quantity);
    }

    pub fn is_empty(&self) -> bool {
        self.keys == 0 && self.refined == 0 && self.reclaimed == 0 && self.scrap == 0
    }

    /// First denomination the snapshot cannot cover, with (needed, held)
    pub fn shortfall_against(&self, snapshot: &PureSnapshot) -> Option<(PureKind, u32, u32)> {
        PureKind::ALL.into_iter().find_map(|kind| {
            let needed = self.count(kind);
            let held = kind.held_in(snapshot);
            (needed > held).then_some((kind, needed, held))
        })
    }
}

impl fmt::Display for Denominations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing");
        }
        let parts: Vec<String> = PureKind::ALL
            .into_iter()
            .filter(|kind| self.count(*kind) > 0)
            .map(|kind| {
                let count = self.count(kind);
                if kind == PureKind::Key && count != 1 {
                    format!("{} keys", count)
                } else {
                    format!("{} {}", count, kind.short_label())
                }
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Convert a value into currency item counts
pub fn to_denominations(value: Decimal, key_price: Decimal) -> Denominations {
    Denominations::from_scalar(value, key_price)
}

/// Convert currency item counts into a value
pub fn to_scalar(keys: u32, refined: u32, reclaimed: u32, scrap: u32, key_price: Decimal) -> Decimal {
    Denominations::new(keys, refined, reclaimed, scrap).to_scalar(key_price)
}

/// Whether a metal value is an exact combination of refined, reclaimed and scrap
///
/// Used to validate configured list prices, never live estimates.
pub fn is_denomination_clean(value: Decimal) -> bool {
    if value < Decimal::ZERO {
        return false;
    }
    let fraction = value - value.floor();
    let steps = (fraction / SCRAP_VALUE)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (fraction - steps * SCRAP_VALUE).abs() < CLEAN_TOLERANCE
}
