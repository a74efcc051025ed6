//! Canonical order and leg types produced by the normalizer.

use crate::domain::{Decimal, Direction, OptionType, OrderId, PositionEffect, Side, Symbol};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One side of an options order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub side: Side,
    pub effect: PositionEffect,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub quantity: Decimal,
}

impl Leg {
    /// Strict close-matching rule: same strike, option type and expiration as
    /// the open position, on the opposite side.
    pub fn closes(&self, position: &Leg) -> bool {
        self.effect == PositionEffect::Close
            && self.strike == position.strike
            && self.option_type == position.option_type
            && self.expiration == position.expiration
            && self.side == position.side.opposite()
    }
}

/// Legs of a two-effect order, split by position effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollLegs {
    pub closes: Vec<Leg>,
    pub opens: Vec<Leg>,
}

impl RollLegs {
    /// The (close, open) pair when the roll has exactly one of each.
    pub fn single_pair(&self) -> Option<(&Leg, &Leg)> {
        match (self.closes.as_slice(), self.opens.as_slice()) {
            ([close], [open]) => Some((close, open)),
            _ => None,
        }
    }
}

/// Shape of an order; each variant carries only the legs relevant to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderKind {
    SingleLegOpen { leg: Leg },
    SingleLegClose { leg: Leg },
    Roll { legs: RollLegs },
}

/// A filled order in canonical form. Immutable once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub option_type: OptionType,
    pub direction: Direction,
    /// Processed premium magnitude; `direction` carries the sign.
    pub premium: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: OrderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Long and short strategy-grouping codes from the order and all of its legs.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub codes: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_from: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_to: Option<OrderId>,
    /// Broker tagged this order as originating from a roll form.
    pub roll_sourced: bool,
}

impl Order {
    pub fn legs(&self) -> Box<dyn Iterator<Item = &Leg> + '_> {
        match &self.kind {
            OrderKind::SingleLegOpen { leg } | OrderKind::SingleLegClose { leg } => {
                Box::new(std::iter::once(leg))
            }
            OrderKind::Roll { legs } => Box::new(legs.closes.iter().chain(legs.opens.iter())),
        }
    }

    pub fn leg_count(&self) -> usize {
        self.legs().count()
    }

    pub fn open_leg_count(&self) -> usize {
        self.legs()
            .filter(|leg| leg.effect == PositionEffect::Open)
            .count()
    }

    pub fn close_leg_count(&self) -> usize {
        self.legs()
            .filter(|leg| leg.effect == PositionEffect::Close)
            .count()
    }

    pub fn is_roll(&self) -> bool {
        matches!(self.kind, OrderKind::Roll { .. })
    }

    /// Closes exposure without opening any.
    pub fn is_close_only(&self) -> bool {
        matches!(self.kind, OrderKind::SingleLegClose { .. })
    }

    /// Legs this order closes with.
    pub fn close_legs(&self) -> &[Leg] {
        match &self.kind {
            OrderKind::SingleLegClose { leg } => std::slice::from_ref(leg),
            OrderKind::Roll { legs } => &legs.closes,
            OrderKind::SingleLegOpen { .. } => &[],
        }
    }

    /// The position this order leaves open, if it opens exactly one leg.
    pub fn opened_leg(&self) -> Option<&Leg> {
        match &self.kind {
            OrderKind::SingleLegOpen { leg } => Some(leg),
            OrderKind::Roll { legs } => match legs.opens.as_slice() {
                [open] => Some(open),
                _ => None,
            },
            OrderKind::SingleLegClose { .. } => None,
        }
    }

    pub fn credit(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.premium,
            Direction::Debit => Decimal::zero(),
        }
    }

    pub fn debit(&self) -> Decimal {
        match self.direction {
            Direction::Debit => self.premium,
            Direction::Credit => Decimal::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn leg(side: Side, effect: PositionEffect, strike: &str, exp: (i32, u32, u32)) -> Leg {
        Leg {
            side,
            effect,
            option_type: OptionType::Put,
            strike: Decimal::from_str(strike).unwrap(),
            expiration: NaiveDate::from_ymd_opt(exp.0, exp.1, exp.2).unwrap(),
            quantity: Decimal::from_str("1").unwrap(),
        }
    }

    #[test]
    fn test_close_requires_exact_contract_and_opposite_side() {
        let open = leg(Side::Sell, PositionEffect::Open, "790", (2024, 3, 15));

        assert!(leg(Side::Buy, PositionEffect::Close, "790", (2024, 3, 15)).closes(&open));
        assert!(!leg(Side::Buy, PositionEffect::Close, "780", (2024, 3, 15)).closes(&open));
        assert!(!leg(Side::Buy, PositionEffect::Close, "790", (2024, 3, 22)).closes(&open));
        assert!(!leg(Side::Sell, PositionEffect::Close, "790", (2024, 3, 15)).closes(&open));
        assert!(!leg(Side::Buy, PositionEffect::Open, "790", (2024, 3, 15)).closes(&open));
    }

    #[test]
    fn test_roll_single_pair() {
        let close = leg(Side::Buy, PositionEffect::Close, "790", (2024, 3, 15));
        let open = leg(Side::Sell, PositionEffect::Open, "790", (2024, 3, 22));
        let legs = RollLegs {
            closes: vec![close.clone()],
            opens: vec![open.clone()],
        };
        assert_eq!(legs.single_pair(), Some((&close, &open)));

        let spread = RollLegs {
            closes: vec![close.clone(), close],
            opens: vec![open],
        };
        assert_eq!(spread.single_pair(), None);
    }
}
