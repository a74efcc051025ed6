//! Strict position-flow validation of merged candidates.

use super::candidates::CandidateChain;
use crate::domain::ordering::is_chronological;
use crate::domain::{Leg, Order, OrderId, OrderKind, Side, MAX_CHAIN_DAYS};
use chrono::Duration;
use serde::Serialize;
use thiserror::Error;

/// Why a candidate failed validation. Rejected candidates are discarded whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("candidate has no orders")]
    Empty,
    #[error("chain mixes underlying symbols")]
    MixedSymbol,
    #[error("chain mixes calls and puts")]
    MixedOptionType,
    #[error("member orders are not in chronological order")]
    NotChronological,
    #[error("chain spans {days} days, more than {max}", max = MAX_CHAIN_DAYS)]
    WindowExceeded { days: i64 },
    #[error("order {0} cannot start a chain")]
    InvalidStart(OrderId),
    #[error("order {0} opens a second position")]
    UnexpectedOpen(OrderId),
    #[error("roll {0} is not one close leg paired with one open leg on the chain's side")]
    MalformedRoll(OrderId),
    #[error("order {0} does not close the open position")]
    MismatchedClose(OrderId),
    #[error("order {0} follows the final close")]
    ActivityAfterClose(OrderId),
}

/// Which canonical flow a chain follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPattern {
    SellToOpen,
    BuyToOpen,
}

impl FlowPattern {
    fn from_opening_side(side: Side) -> Self {
        match side {
            Side::Sell => FlowPattern::SellToOpen,
            Side::Buy => FlowPattern::BuyToOpen,
        }
    }
}

/// A candidate that satisfies one of the canonical flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChain<'a> {
    pub orders: Vec<&'a Order>,
    pub pattern: FlowPattern,
    /// Contract held after the last order; `None` once closed.
    pub open_position: Option<&'a Leg>,
    /// The first order is a broker-tagged roll whose close leg unwinds a
    /// position opened before the input window.
    pub inherited_close: bool,
}

impl<'a> ValidatedChain<'a> {
    pub fn open_leg_count(&self) -> usize {
        self.orders.iter().map(|o| o.open_leg_count()).sum()
    }

    /// Close legs that unwind positions opened inside this chain.
    pub fn close_leg_count(&self) -> usize {
        let total: usize = self.orders.iter().map(|o| o.close_leg_count()).sum();
        total - usize::from(self.inherited_close)
    }
}

/// Validate a candidate against the sell-to-open / buy-to-open flows.
///
/// Order 1 opens a single leg (or is a broker-tagged roll); every later roll
/// closes exactly the held contract on the opposite side and opens one new leg
/// on the opening side; a single-leg close may only come last.
pub fn validate<'a>(candidate: &CandidateChain<'a>) -> Result<ValidatedChain<'a>, Rejection> {
    let orders = &candidate.orders;
    let (first, last) = match (orders.first(), orders.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(Rejection::Empty),
    };

    if orders.iter().any(|o| o.symbol != first.symbol) {
        return Err(Rejection::MixedSymbol);
    }
    if orders.iter().any(|o| {
        o.option_type != first.option_type
            || o.legs().any(|leg| leg.option_type != first.option_type)
    }) {
        return Err(Rejection::MixedOptionType);
    }
    if !is_chronological(orders.iter().copied()) {
        return Err(Rejection::NotChronological);
    }
    let span = last.created_at - first.created_at;
    if span > Duration::days(MAX_CHAIN_DAYS) {
        return Err(Rejection::WindowExceeded {
            days: span.num_days(),
        });
    }

    let (opening_side, mut position, inherited_close) = match &first.kind {
        OrderKind::SingleLegOpen { leg } => (leg.side, leg, false),
        OrderKind::Roll { legs } if first.roll_sourced => {
            let (close, open) = legs
                .single_pair()
                .ok_or_else(|| Rejection::MalformedRoll(first.id.clone()))?;
            if close.side != open.side.opposite() {
                return Err(Rejection::MalformedRoll(first.id.clone()));
            }
            (open.side, open, true)
        }
        _ => return Err(Rejection::InvalidStart(first.id.clone())),
    };

    let mut closed = false;
    for order in orders.iter().skip(1) {
        if closed {
            return Err(Rejection::ActivityAfterClose(order.id.clone()));
        }
        match &order.kind {
            OrderKind::SingleLegOpen { .. } => {
                return Err(Rejection::UnexpectedOpen(order.id.clone()));
            }
            OrderKind::SingleLegClose { leg } => {
                if !leg.closes(position) {
                    return Err(Rejection::MismatchedClose(order.id.clone()));
                }
                closed = true;
            }
            OrderKind::Roll { legs } => {
                let (close, open) = legs
                    .single_pair()
                    .ok_or_else(|| Rejection::MalformedRoll(order.id.clone()))?;
                if !close.closes(position) {
                    return Err(Rejection::MismatchedClose(order.id.clone()));
                }
                if open.side != opening_side {
                    return Err(Rejection::MalformedRoll(order.id.clone()));
                }
                position = open;
            }
        }
    }

    Ok(ValidatedChain {
        orders: orders.clone(),
        pattern: FlowPattern::from_opening_side(opening_side),
        open_position: (!closed).then_some(position),
        inherited_close,
    })
}
