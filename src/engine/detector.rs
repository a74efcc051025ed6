//! The chain detection pipeline for one user's order snapshot.

use super::candidates::{generate_all, CandidateChain, GeneratorKind};
use super::merger::merge_candidates;
use super::normalizer::{normalize_orders, NormalizeIssue};
use super::status::{build_chain, fallback_chain_id};
use super::validator::{validate, Rejection, ValidatedChain};
use crate::domain::{Chain, OptionType, Order, OrderId, RawOrder, Symbol};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("no orders supplied")]
    NoInput,
}

/// A candidate discarded by the position-flow validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub order_ids: Vec<OrderId>,
    pub source: GeneratorKind,
    pub reason: Rejection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionStats {
    pub raw_orders: usize,
    pub normalized_orders: usize,
    pub skipped_unfilled: usize,
    pub candidates_by_generator: BTreeMap<GeneratorKind, usize>,
    pub rejected_candidates: usize,
    pub chains: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// Chains ordered by start time, then chain id.
    pub chains: Vec<Chain>,
    pub issues: Vec<NormalizeIssue>,
    pub rejections: Vec<RejectedCandidate>,
    pub stats: DetectionStats,
}

/// Runs normalize → generate → merge → validate → resolve over one snapshot.
///
/// Pure: the same input and evaluation date always yield the same report.
#[derive(Debug, Clone, Copy)]
pub struct ChainDetector {
    as_of: NaiveDate,
}

impl ChainDetector {
    /// `as_of` is the evaluation date used to tell active chains from expired ones.
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    pub fn run(&self, raw: &[RawOrder]) -> Result<DetectionReport, DetectError> {
        if raw.is_empty() {
            return Err(DetectError::NoInput);
        }

        let normalized = normalize_orders(raw);
        let mut report = DetectionReport {
            issues: normalized.issues,
            stats: DetectionStats {
                raw_orders: raw.len(),
                normalized_orders: normalized.orders.len(),
                skipped_unfilled: normalized.skipped_unfilled,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut chains = Vec::new();
        for ((symbol, option_type), group) in partition(&normalized.orders) {
            debug!(%symbol, %option_type, orders = group.len(), "Detecting chains in group");
            let candidates = generate_all(&group);
            for candidate in &candidates {
                *report
                    .stats
                    .candidates_by_generator
                    .entry(candidate.source)
                    .or_default() += 1;
            }
            for validated in self.settle(candidates, &mut report.rejections) {
                debug!(
                    %symbol,
                    pattern = ?validated.pattern,
                    orders = validated.orders.len(),
                    "Chain validated"
                );
                chains.push(build_chain(&validated, self.as_of));
            }
        }

        assign_unique_ids(&mut chains);
        chains.sort_by(|a, b| {
            (a.started_at, &a.chain_id).cmp(&(b.started_at, &b.chain_id))
        });

        report.stats.rejected_candidates = report.rejections.len();
        report.stats.chains = chains.len();
        report.chains = chains;

        info!(
            raw_orders = report.stats.raw_orders,
            normalized = report.stats.normalized_orders,
            dropped = report.issues.len(),
            rejected = report.stats.rejected_candidates,
            chains = report.stats.chains,
            "Chain detection complete"
        );
        Ok(report)
    }

    /// Merge then validate, pulling rejected candidates out of the pool and
    /// re-merging until every merged candidate validates. Orders hidden behind
    /// a rejected superset get a second chance in a smaller candidate.
    fn settle<'a>(
        &self,
        mut pool: Vec<CandidateChain<'a>>,
        rejections: &mut Vec<RejectedCandidate>,
    ) -> Vec<ValidatedChain<'a>> {
        loop {
            let merged = merge_candidates(pool.clone());
            let mut valid = Vec::with_capacity(merged.len());
            let mut rejected: HashSet<BTreeSet<&'a OrderId>> = HashSet::new();

            for candidate in &merged {
                match validate(candidate) {
                    Ok(chain) => valid.push(chain),
                    Err(reason) => {
                        debug!(
                            source = ?candidate.source,
                            orders = candidate.len(),
                            %reason,
                            "Candidate rejected"
                        );
                        rejections.push(RejectedCandidate {
                            order_ids: candidate.orders.iter().map(|o| o.id.clone()).collect(),
                            source: candidate.source,
                            reason,
                        });
                        rejected.insert(candidate.id_set());
                    }
                }
            }

            if rejected.is_empty() {
                return valid;
            }
            pool.retain(|c| !rejected.contains(&c.id_set()));
        }
    }
}

/// Split orders into `(symbol, option type)` groups, keeping chronological order
/// within each group.
fn partition(orders: &[Order]) -> BTreeMap<(Symbol, OptionType), Vec<&Order>> {
    let mut groups: BTreeMap<(Symbol, OptionType), Vec<&Order>> = BTreeMap::new();
    for order in orders {
        groups
            .entry((order.symbol.clone(), order.option_type))
            .or_default()
            .push(order);
    }
    groups
}

/// Chain ids must be unique per user. A shared strategy code can name more than
/// one chain; later chains (by start) fall back to `{symbol}_{firstOrderId}`.
fn assign_unique_ids(chains: &mut [Chain]) {
    chains.sort_by(|a, b| {
        (a.started_at, &a.orders[0].id).cmp(&(b.started_at, &b.orders[0].id))
    });
    let mut used: HashSet<String> = HashSet::new();
    for chain in chains.iter_mut() {
        if used.contains(&chain.chain_id) {
            let base = fallback_chain_id(&chain.orders[0]);
            let mut candidate = base.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            debug!(from = %chain.chain_id, to = %candidate, "Chain id collision");
            chain.chain_id = candidate;
        }
        used.insert(chain.chain_id.clone());
    }
}
