//! Stable chronological ordering for deterministic processing.

use crate::domain::Order;
use chrono::{DateTime, Utc};

/// Stable ordering key for orders.
///
/// Ordering: created_at -> order id. Orders created in the same instant sort
/// by identifier so repeated runs see the same sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderOrderingKey<'a> {
    pub created_at: DateTime<Utc>,
    pub id: &'a str,
}

impl<'a> OrderOrderingKey<'a> {
    pub fn from_order(order: &'a Order) -> Self {
        OrderOrderingKey {
            created_at: order.created_at,
            id: order.id.as_str(),
        }
    }
}

/// Sort orders deterministically. Called once, by the normalizer.
pub fn sort_orders_chronological(orders: &mut [Order]) {
    orders.sort_by(|a, b| OrderOrderingKey::from_order(a).cmp(&OrderOrderingKey::from_order(b)));
}

/// True when `orders` is already in canonical chronological order.
pub fn is_chronological<'a, I>(orders: I) -> bool
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut prev: Option<OrderOrderingKey<'a>> = None;
    for order in orders {
        let key = OrderOrderingKey::from_order(order);
        if let Some(prev) = &prev {
            if *prev > key {
                return false;
            }
        }
        prev = Some(key);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Decimal, Direction, Leg, OptionType, OrderId, OrderKind, PositionEffect, Side, Symbol,
    };
    use chrono::{NaiveDate, TimeZone};
    use std::collections::BTreeSet;

    fn make_order(id: &str, secs: i64) -> Order {
        Order {
            id: OrderId::new(id),
            symbol: Symbol::new("SPY"),
            option_type: OptionType::Put,
            direction: Direction::Credit,
            premium: Decimal::zero(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            kind: OrderKind::SingleLegOpen {
                leg: Leg {
                    side: Side::Sell,
                    effect: PositionEffect::Open,
                    option_type: OptionType::Put,
                    strike: Decimal::zero(),
                    expiration: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                    quantity: Decimal::zero(),
                },
            },
            strategy: None,
            codes: BTreeSet::new(),
            rolled_from: None,
            rolled_to: None,
            roll_sourced: false,
        }
    }

    #[test]
    fn test_sort_by_time_then_id() {
        let mut orders = vec![
            make_order("b", 2000),
            make_order("z", 1000),
            make_order("a", 1000),
        ];

        sort_orders_chronological(&mut orders);

        let ids: Vec<_> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "b"]);
        assert!(is_chronological(&orders));
    }

    #[test]
    fn test_is_chronological_detects_inversion() {
        let orders = vec![make_order("a", 2000), make_order("b", 1000)];
        assert!(!is_chronological(&orders));
    }
}
