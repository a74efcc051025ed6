//! Merge and deduplicate candidates from all generators.
//!
//! The result does not depend on the order candidates arrive in: every
//! decision is taken on a total priority order over candidates.

use super::candidates::CandidateChain;
use crate::domain::OrderId;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

struct Keyed<'a> {
    candidate: CandidateChain<'a>,
    ids: BTreeSet<&'a OrderId>,
}

/// Priority: more orders, then more legs, then earlier start, then identifiers.
fn priority(a: &Keyed<'_>, b: &Keyed<'_>) -> Ordering {
    b.candidate
        .len()
        .cmp(&a.candidate.len())
        .then_with(|| b.candidate.leg_count().cmp(&a.candidate.leg_count()))
        .then_with(|| first_created(a).cmp(&first_created(b)))
        .then_with(|| a.ids.cmp(&b.ids))
        .then_with(|| a.candidate.source.cmp(&b.candidate.source))
}

fn first_created(keyed: &Keyed<'_>) -> Option<chrono::DateTime<chrono::Utc>> {
    keyed.candidate.orders.first().map(|o| o.created_at)
}

/// Merge candidates into a set of maximal, pairwise-disjoint chains.
///
/// 1. Drop candidates without at least one open-effect and one close-effect leg.
/// 2. Drop candidates whose order set is a strict subset of another's.
/// 3. Among partially overlapping candidates keep the longer one; ties go to
///    the one with more legs.
///
/// Output is ordered by first order time.
pub fn merge_candidates<'a>(candidates: Vec<CandidateChain<'a>>) -> Vec<CandidateChain<'a>> {
    let total = candidates.len();
    let mut keyed: Vec<Keyed<'a>> = candidates
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(|candidate| Keyed {
            ids: candidate.id_set(),
            candidate,
        })
        .collect();
    keyed.sort_by(priority);
    keyed.dedup_by(|later, earlier| later.ids == earlier.ids);

    keyed.retain(|k| k.candidate.has_open_and_close());

    let is_subset: Vec<bool> = keyed
        .iter()
        .map(|k| {
            keyed
                .iter()
                .any(|other| k.ids.len() < other.ids.len() && k.ids.is_subset(&other.ids))
        })
        .collect();
    let mut flags = is_subset.into_iter();
    keyed.retain(|_| !flags.next().unwrap_or(false));

    let mut claimed: BTreeSet<&'a OrderId> = BTreeSet::new();
    let mut merged = Vec::new();
    for k in keyed {
        if !k.ids.is_disjoint(&claimed) {
            continue;
        }
        claimed.extend(k.ids.iter().copied());
        merged.push(k.candidate);
    }

    merged.sort_by(|a, b| {
        let a_first = a.orders.first().map(|o| (o.created_at, &o.id));
        let b_first = b.orders.first().map(|o| (o.created_at, &o.id));
        a_first.cmp(&b_first)
    });

    debug!(candidates = total, merged = merged.len(), "Merged candidates");
    merged
}
