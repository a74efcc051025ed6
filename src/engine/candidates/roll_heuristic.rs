//! Heuristic roll detection by walking positions forward in time.

use super::{CandidateChain, GeneratorKind};
use crate::domain::{Leg, Order, OrderKind, MAX_CHAIN_DAYS};
use chrono::Duration;
use tracing::{debug, warn};

const ROLL_KEYWORD: &str = "roll";

/// Evidence that an order is a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollSignal {
    /// Carries a rolled-from or rolled-to reference.
    ExplicitLink,
    /// Strategy label mentions a roll.
    StrategyLabel,
    /// Has both an open and a close leg.
    MultiLeg,
}

/// Classify an order as a roll, reporting the strongest signal present.
pub fn classify_roll(order: &Order) -> Option<RollSignal> {
    if order.rolled_from.is_some() || order.rolled_to.is_some() {
        return Some(RollSignal::ExplicitLink);
    }
    if order
        .strategy
        .as_deref()
        .is_some_and(|s| s.to_ascii_lowercase().contains(ROLL_KEYWORD))
    {
        return Some(RollSignal::StrategyLabel);
    }
    order.is_roll().then_some(RollSignal::MultiLeg)
}

/// A position being followed from its single-leg open.
struct Thread<'a> {
    orders: Vec<&'a Order>,
    /// Contract currently held; the latest open leg.
    position: &'a Leg,
    finished: bool,
    /// A later order matched this and another thread equally well.
    ambiguous: bool,
}

impl<'a> Thread<'a> {
    fn start(order: &'a Order, leg: &'a Leg) -> Self {
        Self {
            orders: vec![order],
            position: leg,
            finished: false,
            ambiguous: false,
        }
    }

    fn is_live(&self) -> bool {
        !self.finished && !self.ambiguous
    }

    fn within_window(&self, order: &Order) -> bool {
        order.created_at - self.orders[0].created_at <= Duration::days(MAX_CHAIN_DAYS)
    }

    fn accepts(&self, order: &Order) -> bool {
        self.is_live()
            && self.within_window(order)
            && order.close_legs().iter().any(|leg| leg.closes(self.position))
    }

    fn linked_to(&self, order: &Order) -> bool {
        let last = self.orders[self.orders.len() - 1];
        last.rolled_to.as_ref() == Some(&order.id) || order.rolled_from.as_ref() == Some(&last.id)
    }
}

/// Follow every single-leg open forward, attaching each close or roll to the
/// position it strictly closes. A roll's open leg becomes the position going
/// forward; a close-only order ends the thread even when it carries a roll
/// reference or label. An unmatched broker-tagged roll starts
/// a thread of its own.
///
/// If a close leg matches more than one live position and no explicit roll
/// reference singles one out, every matching thread is abandoned rather than
/// guessing.
pub fn detect_rolls<'a>(group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
    let mut threads: Vec<Thread<'a>> = Vec::new();

    for &order in group {
        if let OrderKind::SingleLegOpen { leg } = &order.kind {
            threads.push(Thread::start(order, leg));
            continue;
        }

        let matching: Vec<usize> = threads
            .iter()
            .enumerate()
            .filter(|(_, thread)| thread.accepts(order))
            .map(|(idx, _)| idx)
            .collect();

        let chosen = match matching.as_slice() {
            [] => {
                match order.opened_leg() {
                    // Broker-confirmed roll whose original open predates the input.
                    Some(next) if order.roll_sourced && order.is_roll() => {
                        threads.push(Thread::start(order, next));
                    }
                    _ => debug!(order_id = %order.id, "No open position matches order"),
                }
                continue;
            }
            [only] => *only,
            _ => {
                let linked: Vec<usize> = matching
                    .iter()
                    .copied()
                    .filter(|&idx| threads[idx].linked_to(order))
                    .collect();
                if let [only] = linked.as_slice() {
                    *only
                } else {
                    warn!(
                        order_id = %order.id,
                        candidates = matching.len(),
                        "Close leg matches several open positions; abandoning them"
                    );
                    for &idx in &matching {
                        threads[idx].ambiguous = true;
                    }
                    continue;
                }
            }
        };

        let thread = &mut threads[chosen];
        thread.orders.push(order);
        // Only an order carrying an open leg can move the position; link and
        // label signals are logged but never extend a thread on their own.
        match order.opened_leg() {
            Some(next) => {
                debug!(order_id = %order.id, signal = ?classify_roll(order), "Roll extends position");
                thread.position = next;
            }
            None => thread.finished = true,
        }
    }

    threads
        .into_iter()
        .filter(|thread| !thread.ambiguous && thread.orders.len() > 1)
        .map(|thread| CandidateChain::new(thread.orders, GeneratorKind::RollHeuristic))
        .collect()
}
