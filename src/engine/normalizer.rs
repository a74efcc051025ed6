//! Raw broker records to canonical orders.
//!
//! Malformed records are dropped with a diagnostic; orders that are not filled
//! are skipped silently. The output is sorted once here and never re-sorted.

use crate::domain::ordering::sort_orders_chronological;
use crate::domain::{
    Decimal, Direction, Leg, OptionType, Order, OrderId, OrderKind, PositionEffect, RawLeg,
    RawOrder, RollLegs, Side, Symbol,
};
use std::collections::{BTreeSet, HashSet};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

const FILLED_STATE: &str = "filled";

/// Why a raw order was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("order has no legs")]
    NoLegs,
    #[error("legs mix calls and puts")]
    MixedOptionType,
    #[error("multi-leg order is neither a single open, a single close nor a roll")]
    UnsupportedLegShape,
    #[error("duplicate order id")]
    DuplicateId,
}

/// A dropped record and the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeIssue {
    pub order_id: Option<String>,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Filled orders in canonical chronological order.
    pub orders: Vec<Order>,
    pub issues: Vec<NormalizeIssue>,
    pub skipped_unfilled: usize,
}

/// Normalize a batch of raw orders.
pub fn normalize_orders(raw_orders: &[RawOrder]) -> Normalized {
    let mut out = Normalized::default();
    let mut seen: HashSet<String> = HashSet::new();

    for raw in raw_orders {
        match normalize_order(raw) {
            Ok(Some(order)) => {
                if !seen.insert(order.id.as_str().to_string()) {
                    warn!(order_id = %order.id, "Dropping duplicate order id");
                    out.issues.push(NormalizeIssue {
                        order_id: Some(order.id.0),
                        reason: DropReason::DuplicateId,
                    });
                    continue;
                }
                out.orders.push(order);
            }
            Ok(None) => {
                debug!(order_id = ?raw.id, state = ?raw.state, "Skipping order that is not filled");
                out.skipped_unfilled += 1;
            }
            Err(reason) => {
                warn!(order_id = ?raw.id, %reason, "Dropping malformed order");
                out.issues.push(NormalizeIssue {
                    order_id: raw.id.clone(),
                    reason,
                });
            }
        }
    }

    sort_orders_chronological(&mut out.orders);
    out
}

/// Normalize one raw order. `Ok(None)` means the order is not filled.
pub fn normalize_order(raw: &RawOrder) -> Result<Option<Order>, DropReason> {
    let state = required_str(&raw.state, "state")?;
    if !state.eq_ignore_ascii_case(FILLED_STATE) {
        return Ok(None);
    }

    let id = required_str(&raw.id, "id")?;
    let symbol = required_str(&raw.symbol, "symbol")?;
    let direction: Direction = parse_field(&raw.direction, "direction")?;
    let premium = raw
        .processed_premium
        .map(|p| Decimal::new(p).abs())
        .ok_or(DropReason::MissingField("processed_premium"))?;
    let created_at = raw.created_at.ok_or(DropReason::MissingField("created_at"))?;

    if raw.legs.is_empty() {
        return Err(DropReason::NoLegs);
    }

    let order_type: Option<OptionType> = match raw.option_type.as_deref() {
        Some(s) => Some(parse_str(s, "option_type")?),
        None => None,
    };

    let legs = raw
        .legs
        .iter()
        .map(|leg| normalize_leg(leg, order_type))
        .collect::<Result<Vec<_>, _>>()?;

    let option_type = order_type.unwrap_or(legs[0].option_type);
    if legs.iter().any(|leg| leg.option_type != option_type) {
        return Err(DropReason::MixedOptionType);
    }

    let kind = classify_legs(legs)?;

    Ok(Some(Order {
        id: OrderId::new(id),
        symbol: Symbol::new(symbol),
        option_type,
        direction,
        premium,
        created_at,
        kind,
        strategy: non_empty(&raw.strategy),
        codes: collect_codes(raw),
        rolled_from: non_empty(&raw.rolled_from).map(OrderId::new),
        rolled_to: non_empty(&raw.rolled_to).map(OrderId::new),
        roll_sourced: raw
            .form_source
            .as_deref()
            .is_some_and(|s| s.to_ascii_lowercase().contains("roll")),
    }))
}

fn normalize_leg(raw: &RawLeg, order_type: Option<OptionType>) -> Result<Leg, DropReason> {
    let side: Side = parse_field(&raw.side, "leg.side")?;
    let effect: PositionEffect = parse_field(&raw.position_effect, "leg.position_effect")?;
    let option_type = match raw.option_type.as_deref() {
        Some(s) => parse_str(s, "leg.option_type")?,
        None => order_type.ok_or(DropReason::MissingField("leg.option_type"))?,
    };
    let strike = positive(raw.strike_price, "leg.strike_price")?;
    let quantity = positive(raw.quantity, "leg.quantity")?;
    let expiration = raw
        .expiration_date
        .ok_or(DropReason::MissingField("leg.expiration_date"))?;

    Ok(Leg {
        side,
        effect,
        option_type,
        strike,
        expiration,
        quantity,
    })
}

fn classify_legs(mut legs: Vec<Leg>) -> Result<OrderKind, DropReason> {
    if legs.len() == 1 {
        let leg = legs.remove(0);
        return Ok(match leg.effect {
            PositionEffect::Open => OrderKind::SingleLegOpen { leg },
            PositionEffect::Close => OrderKind::SingleLegClose { leg },
        });
    }

    let (opens, closes): (Vec<Leg>, Vec<Leg>) = legs
        .into_iter()
        .partition(|leg| leg.effect == PositionEffect::Open);
    if opens.is_empty() || closes.is_empty() {
        return Err(DropReason::UnsupportedLegShape);
    }
    Ok(OrderKind::Roll {
        legs: RollLegs { closes, opens },
    })
}

fn collect_codes(raw: &RawOrder) -> BTreeSet<String> {
    let order_codes = [&raw.long_strategy_code, &raw.short_strategy_code];
    let leg_codes = raw
        .legs
        .iter()
        .flat_map(|leg| [&leg.long_strategy_code, &leg.short_strategy_code]);

    order_codes
        .into_iter()
        .chain(leg_codes)
        .filter_map(non_empty)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_str<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, DropReason> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(DropReason::MissingField(field))
}

fn parse_field<T: FromStr>(value: &Option<String>, field: &'static str) -> Result<T, DropReason> {
    parse_str(required_str(value, field)?, field)
}

fn parse_str<T: FromStr>(value: &str, field: &'static str) -> Result<T, DropReason> {
    value.parse::<T>().map_err(|_| DropReason::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn positive(
    value: Option<rust_decimal::Decimal>,
    field: &'static str,
) -> Result<Decimal, DropReason> {
    let value = Decimal::new(value.ok_or(DropReason::MissingField(field))?);
    if !value.is_positive() {
        return Err(DropReason::InvalidField {
            field,
            value: value.to_canonical_string(),
        });
    }
    Ok(value)
}
