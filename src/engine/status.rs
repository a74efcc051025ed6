//! Status classification and aggregate metrics for validated chains.

use super::validator::ValidatedChain;
use crate::domain::{Chain, ChainStatus, Decimal, Direction, OpenPosition, Order, StatusReason};
use chrono::NaiveDate;

/// One row of the status decision table.
type Rule = fn(&ValidatedChain<'_>, NaiveDate) -> bool;

/// Evaluated top to bottom; the first rule that holds decides the status.
const DECISION_TABLE: [(StatusReason, Rule); 4] = [
    (StatusReason::OpenCloseBalanced, open_close_balanced),
    (StatusReason::FinalClose, ends_with_close),
    (StatusReason::CreditThenDebitUnwind, credit_then_debit_unwind),
    (StatusReason::PastExpiration, past_expiration),
];

fn open_close_balanced(chain: &ValidatedChain<'_>, _as_of: NaiveDate) -> bool {
    chain.open_leg_count() == chain.close_leg_count()
}

fn ends_with_close(chain: &ValidatedChain<'_>, _as_of: NaiveDate) -> bool {
    chain.orders.last().is_some_and(|o| o.is_close_only())
}

/// Credits collected first, then unwound by debit orders that close more legs
/// than they open.
///
/// Closing more legs than opened in the debit suffix takes a close-only order,
/// and a validated chain may only end with one, so `FinalClose` decides first on
/// anything the validator accepts. The row only fires on unvalidated input.
fn credit_then_debit_unwind(chain: &ValidatedChain<'_>, _as_of: NaiveDate) -> bool {
    let split = chain
        .orders
        .iter()
        .position(|o| o.direction == Direction::Debit);
    let Some(split) = split.filter(|&idx| idx > 0) else {
        return false;
    };
    let (credits, debits) = chain.orders.split_at(split);
    if credits.iter().any(|o| o.direction != Direction::Credit)
        || debits.iter().any(|o| o.direction != Direction::Debit)
    {
        return false;
    }
    let closes: usize = debits.iter().map(|o| o.close_leg_count()).sum();
    let opens: usize = debits.iter().map(|o| o.open_leg_count()).sum();
    closes > opens
}

/// Expiring on the evaluation date still counts as open.
fn past_expiration(chain: &ValidatedChain<'_>, as_of: NaiveDate) -> bool {
    chain
        .open_position
        .is_some_and(|position| position.expiration < as_of)
}

/// Classify a validated chain as of the given evaluation date.
pub fn resolve_status(chain: &ValidatedChain<'_>, as_of: NaiveDate) -> StatusReason {
    DECISION_TABLE
        .iter()
        .find(|(_, rule)| rule(chain, as_of))
        .map(|(reason, _)| *reason)
        .unwrap_or(StatusReason::OpenPosition)
}

/// Two-effect orders after the first one.
pub fn roll_count(orders: &[&Order]) -> usize {
    orders.iter().skip(1).filter(|o| o.is_roll()).count()
}

/// Stable identifier taken from the first order only, so it survives the chain
/// growing: that order's smallest strategy code, else `{symbol}_{firstOrderId}`.
pub fn chain_id(orders: &[&Order]) -> String {
    match orders.first() {
        Some(first) => match first.codes.first() {
            Some(code) => code.clone(),
            None => fallback_chain_id(first),
        },
        None => String::new(),
    }
}

pub fn fallback_chain_id(first: &Order) -> String {
    format!("{}_{}", first.symbol, first.id)
}

/// Build the output aggregate for a validated chain.
pub fn build_chain(chain: &ValidatedChain<'_>, as_of: NaiveDate) -> Chain {
    let reason = resolve_status(chain, as_of);
    let status = reason.status();

    let total_credits: Decimal = chain.orders.iter().map(|o| o.credit()).sum();
    let total_debits: Decimal = chain.orders.iter().map(|o| o.debit()).sum();

    let first = chain.orders[0];
    let last = chain.orders[chain.orders.len() - 1];

    Chain {
        chain_id: chain_id(&chain.orders),
        symbol: first.symbol.clone(),
        option_type: first.option_type,
        orders: chain.orders.iter().map(|o| (*o).clone()).collect(),
        roll_count: roll_count(&chain.orders),
        total_credits,
        total_debits,
        net_premium: total_credits - total_debits,
        status,
        status_reason: reason,
        started_at: first.created_at,
        last_activity_at: last.created_at,
        latest_position: match status {
            ChainStatus::Active => chain.open_position.map(OpenPosition::from),
            ChainStatus::Closed | ChainStatus::Expired => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::candidates::fixtures::*;
    use crate::engine::validator::FlowPattern;

    fn validated<'a>(orders: Vec<&'a Order>, open: bool) -> ValidatedChain<'a> {
        let open_position = if open {
            orders.last().copied().and_then(Order::opened_leg)
        } else {
            None
        };
        ValidatedChain {
            orders,
            pattern: FlowPattern::SellToOpen,
            open_position,
            inherited_close: false,
        }
    }

    fn as_of(month: u32, day: u32) -> NaiveDate {
        exp(month, day)
    }

    #[test]
    fn test_balanced_chain_is_closed() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = btc("b", 5, "790", exp(3, 15), "245");
        let chain = validated(vec![&a, &b], false);

        assert_eq!(resolve_status(&chain, as_of(1, 10)), StatusReason::OpenCloseBalanced);
    }

    #[test]
    fn test_final_close_rule() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = btc("b", 5, "790", exp(3, 15), "245");
        let chain = validated(vec![&a, &b], false);

        assert!(ends_with_close(&chain, as_of(1, 10)));
        let rolled = roll("c", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "1");
        assert!(!ends_with_close(&validated(vec![&a, &rolled], true), as_of(1, 10)));
    }

    #[test]
    fn test_credit_then_debit_rule() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = roll("b", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "900");
        let c = btc("c", 9, "790", exp(3, 22), "245");
        assert!(credit_then_debit_unwind(&validated(vec![&a, &b, &c], false), as_of(1, 10)));

        let mut debit_roll = roll("d", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "50");
        debit_roll.direction = Direction::Debit;
        assert!(!credit_then_debit_unwind(
            &validated(vec![&a, &debit_roll], true),
            as_of(1, 10)
        ));
        assert!(!credit_then_debit_unwind(&validated(vec![&a, &b], true), as_of(1, 10)));
    }

    #[test]
    fn test_final_close_shadows_credit_then_debit() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = roll("b", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "900");
        let c = btc("c", 9, "790", exp(3, 22), "245");
        let d = btc("d", 10, "790", exp(3, 22), "245");
        let chain = validated(vec![&a, &b, &c, &d], false);

        assert!(credit_then_debit_unwind(&chain, as_of(1, 10)));
        assert_eq!(resolve_status(&chain, as_of(1, 10)), StatusReason::FinalClose);
    }

    #[test]
    fn test_open_chain_active_until_expiration_passes() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = roll("b", 10, ("790", exp(3, 15)), ("790", exp(3, 22)), "900");
        let chain = validated(vec![&a, &b], true);

        assert_eq!(resolve_status(&chain, as_of(3, 1)), StatusReason::OpenPosition);
        assert_eq!(resolve_status(&chain, as_of(3, 22)), StatusReason::OpenPosition);
        assert_eq!(resolve_status(&chain, as_of(3, 23)), StatusReason::PastExpiration);
    }

    #[test]
    fn test_build_chain_metrics() {
        let a = sto("a", 0, "790", exp(3, 15), "1145.00");
        let b = roll("b", 10, ("790", exp(3, 15)), ("790", exp(3, 22)), "900.00");
        let c = roll("c", 17, ("790", exp(3, 22)), ("790", exp(4, 19)), "800.00");
        let e = btc("e", 40, "790", exp(4, 19), "245.00");
        let chain = build_chain(&validated(vec![&a, &b, &c, &e], false), as_of(6, 1));

        assert_eq!(chain.roll_count, 2);
        assert_eq!(chain.total_credits, d("2845"));
        assert_eq!(chain.total_debits, d("245"));
        assert_eq!(chain.net_premium, d("2600"));
        assert_eq!(chain.status, ChainStatus::Closed);
        assert_eq!(chain.chain_id, "SMCI_a");
        assert_eq!(chain.latest_position, None);
    }

    #[test]
    fn test_active_chain_reports_latest_position() {
        let a = sto("a", 0, "790", exp(3, 15), "1145");
        let b = roll("b", 10, ("790", exp(3, 15)), ("770", exp(4, 19)), "900");
        let chain = build_chain(&validated(vec![&a, &b], true), as_of(3, 1));

        assert_eq!(chain.status, ChainStatus::Active);
        assert_eq!(chain.roll_count, 1);
        let position = chain.latest_position.unwrap();
        assert_eq!(position.strike, d("770"));
        assert_eq!(position.expiration, exp(4, 19));
    }

    #[test]
    fn test_chain_id_comes_from_first_order() {
        let a = with_codes(sto("a", 0, "790", exp(3, 15), "1"), &["S1", "L9"]);
        let b = with_codes(btc("b", 5, "790", exp(3, 15), "1"), &["S2"]);
        assert_eq!(chain_id(&[&a]), "L9");
        assert_eq!(chain_id(&[&a, &b]), "L9");

        let plain = sto("p", 0, "790", exp(3, 15), "1");
        assert_eq!(chain_id(&[&plain, &b]), "SMCI_p");
    }

    #[test]
    fn test_chain_id_stable_when_uncoded_close_joins() {
        let a = with_codes(sto("a", 0, "790", exp(3, 15), "1"), &["S1"]);
        let b = with_codes(roll("b", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "1"), &["S1"]);
        let c = btc("c", 9, "790", exp(3, 22), "1");
        assert_eq!(chain_id(&[&a, &b]), chain_id(&[&a, &b, &c]));
    }
}
