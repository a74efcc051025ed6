//! Candidate chain generators.
//!
//! Each generator is a pure function over one `(symbol, option_type)` group of
//! normalized orders, already in chronological order. Generators never see each
//! other's output; overlaps are resolved later by the merger.

use crate::domain::{Order, OrderId};
use serde::Serialize;
use std::collections::BTreeSet;

pub mod form_source;
pub mod roll_heuristic;
pub mod strategy_codes;

pub use roll_heuristic::{classify_roll, RollSignal};

/// Which heuristic proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    StrategyCodeGroup,
    StrategyCodeContinuity,
    RollHeuristic,
    FormSource,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 4] = [
        GeneratorKind::StrategyCodeGroup,
        GeneratorKind::StrategyCodeContinuity,
        GeneratorKind::RollHeuristic,
        GeneratorKind::FormSource,
    ];

    /// Run this generator over one chronologically sorted group.
    pub fn generate<'a>(&self, group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
        match self {
            GeneratorKind::StrategyCodeGroup => strategy_codes::group_by_code(group),
            GeneratorKind::StrategyCodeContinuity => strategy_codes::stitch_by_continuity(group),
            GeneratorKind::RollHeuristic => roll_heuristic::detect_rolls(group),
            GeneratorKind::FormSource => form_source::group_roll_sourced(group),
        }
    }
}

/// A proposed chain: member orders in chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateChain<'a> {
    pub orders: Vec<&'a Order>,
    pub source: GeneratorKind,
}

impl<'a> CandidateChain<'a> {
    pub fn new(orders: Vec<&'a Order>, source: GeneratorKind) -> Self {
        Self { orders, source }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn id_set(&self) -> BTreeSet<&'a OrderId> {
        self.orders.iter().map(|o| &o.id).collect()
    }

    pub fn leg_count(&self) -> usize {
        self.orders.iter().map(|o| o.leg_count()).sum()
    }

    pub fn has_open_and_close(&self) -> bool {
        self.orders.iter().any(|o| o.open_leg_count() > 0)
            && self.orders.iter().any(|o| o.close_leg_count() > 0)
    }
}

/// Run all four generators over a group. The group is a read-only snapshot, so
/// the calls are independent; their outputs are joined here before merging.
pub fn generate_all<'a>(group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
    GeneratorKind::ALL
        .iter()
        .flat_map(|kind| kind.generate(group))
        .collect()
}
