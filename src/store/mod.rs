//! Collaborator seams: where raw orders come from and where chains go.

use crate::domain::{ChainRecord, RawOrder, Symbol, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileOrderStore;
pub use memory::{InMemoryChainStore, InMemoryOrderStore};

/// Filter applied when loading a user's orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub symbol: Option<Symbol>,
    /// Only orders created within this many days before `as_of`.
    pub lookback_days: Option<u32>,
    pub as_of: DateTime<Utc>,
}

impl OrderQuery {
    /// Whether a raw order falls inside this query. Orders without a usable
    /// symbol or timestamp pass through so the normalizer can report them.
    pub fn admits(&self, order: &RawOrder) -> bool {
        if let (Some(wanted), Some(symbol)) = (&self.symbol, order.symbol.as_deref()) {
            if Symbol::new(symbol) != *wanted {
                return false;
            }
        }
        if let (Some(days), Some(created_at)) = (self.lookback_days, order.created_at) {
            // A window reaching past the representable range has no lower bound.
            let from = chrono::Duration::try_days(i64::from(days))
                .and_then(|span| self.as_of.checked_sub_signed(span));
            if from.is_some_and(|from| created_at < from) || created_at > self.as_of {
                return false;
            }
        }
        true
    }
}

/// Source of raw broker orders.
///
/// Implementations return orders in any order; the normalizer sorts them.
#[async_trait]
pub trait OrderStore: Send + Sync + fmt::Debug {
    async fn fetch_orders(
        &self,
        user: &UserId,
        query: &OrderQuery,
    ) -> Result<Vec<RawOrder>, StoreError>;
}

/// Outcome of an upsert batch, keyed by `(user, chain_id)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Destination for detected chains.
#[async_trait]
pub trait ChainStore: Send + Sync + fmt::Debug {
    /// Remove every chain stored for the user, returning how many were removed.
    async fn clear_chains(&self, user: &UserId) -> Result<usize, StoreError>;

    /// Insert or replace records by `(user, chain_id)`.
    async fn upsert_chains(&self, records: &[ChainRecord]) -> Result<UpsertSummary, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store timed out")]
    Timeout,
    #[error("malformed store data: {0}")]
    Malformed(String),
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Transient errors are worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout)
    }
}
