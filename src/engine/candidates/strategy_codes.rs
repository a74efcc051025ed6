//! Candidates built from broker strategy-grouping codes.

use super::{CandidateChain, GeneratorKind};
use crate::domain::Order;
use std::collections::BTreeMap;

/// One candidate per distinct code: every order carrying it, in chronological order.
pub fn group_by_code<'a>(group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
    let mut by_code: BTreeMap<&'a str, Vec<&'a Order>> = BTreeMap::new();
    for &order in group {
        for code in &order.codes {
            by_code.entry(code.as_str()).or_default().push(order);
        }
    }

    by_code
        .into_values()
        .map(|orders| CandidateChain::new(orders, GeneratorKind::StrategyCodeGroup))
        .collect()
}

/// Stitch orders whose code sets overlap with the previous order of a thread,
/// so A -> {A, B} -> B stays one thread while the broker retires code A.
///
/// When an order could extend several threads it extends the one with the most
/// recent activity.
pub fn stitch_by_continuity<'a>(group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
    let mut threads: Vec<Vec<&'a Order>> = Vec::new();

    for &order in group {
        if order.codes.is_empty() {
            continue;
        }

        let target = threads
            .iter()
            .enumerate()
            .filter_map(|(idx, thread)| {
                let last = *thread.last()?;
                (!last.codes.is_disjoint(&order.codes)).then_some((idx, last.created_at))
            })
            .max_by(|(ia, ta), (ib, tb)| ta.cmp(tb).then_with(|| ib.cmp(ia)))
            .map(|(idx, _)| idx);

        match target {
            Some(idx) => threads[idx].push(order),
            None => threads.push(vec![order]),
        }
    }

    threads
        .into_iter()
        .filter(|thread| thread.len() > 1)
        .map(|orders| CandidateChain::new(orders, GeneratorKind::StrategyCodeContinuity))
        .collect()
}
