//! In-memory stores for tests and the batch CLI.

use super::{ChainStore, OrderQuery, OrderStore, StoreError, UpsertSummary};
use crate::domain::{ChainRecord, RawOrder, UserId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Order store over predefined raw orders.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: BTreeMap<UserId, Vec<RawOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add orders for a user.
    pub fn with_orders(mut self, user: UserId, orders: Vec<RawOrder>) -> Self {
        self.orders.entry(user).or_default().extend(orders);
        self
    }

    pub fn users(&self) -> Vec<UserId> {
        self.orders.keys().cloned().collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn fetch_orders(
        &self,
        user: &UserId,
        query: &OrderQuery,
    ) -> Result<Vec<RawOrder>, StoreError> {
        Ok(self
            .orders
            .get(user)
            .map(|orders| orders.iter().filter(|o| query.admits(o)).cloned().collect())
            .unwrap_or_default())
    }
}

/// Chain store keyed by `(user, chain_id)`.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    chains: RwLock<BTreeMap<(UserId, String), ChainRecord>>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored records for a user, ordered by chain id.
    pub async fn chains_for(&self, user: &UserId) -> Vec<ChainRecord> {
        self.chains
            .read()
            .await
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, record)| record.clone())
            .collect()
    }

    pub async fn all_chains(&self) -> Vec<ChainRecord> {
        self.chains.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn clear_chains(&self, user: &UserId) -> Result<usize, StoreError> {
        let mut chains = self.chains.write().await;
        let before = chains.len();
        chains.retain(|(owner, _), _| owner != user);
        Ok(before - chains.len())
    }

    async fn upsert_chains(&self, records: &[ChainRecord]) -> Result<UpsertSummary, StoreError> {
        let mut chains = self.chains.write().await;
        let mut summary = UpsertSummary::default();
        for record in records {
            let key = (record.user.clone(), record.chain_id.clone());
            match chains.insert(key, record.clone()) {
                None => summary.inserted += 1,
                Some(previous) if previous.fingerprint == record.fingerprint => {
                    summary.unchanged += 1
                }
                Some(_) => summary.updated += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChainStatus, Decimal, OptionType, Symbol};
    use chrono::{TimeZone, Utc};

    fn record(user: &str, chain_id: &str, status: ChainStatus) -> ChainRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        let mut record = ChainRecord {
            user: UserId::new(user),
            chain_id: chain_id.to_string(),
            symbol: Symbol::new("SMCI"),
            option_type: OptionType::Put,
            status,
            first_order_at: at,
            last_order_at: at,
            order_count: 2,
            roll_count: 0,
            leg_count: 2,
            total_credits: Decimal::zero(),
            total_debits: Decimal::zero(),
            net_premium: Decimal::zero(),
            latest_position: None,
            orders: Vec::new(),
            fingerprint: String::new(),
        };
        record.fingerprint = record.compute_fingerprint();
        record
    }

    #[tokio::test]
    async fn test_upsert_counts_outcomes() {
        let store = InMemoryChainStore::new();
        let first = store
            .upsert_chains(&[record("u1", "c1", ChainStatus::Active)])
            .await
            .unwrap();
        assert_eq!(first.inserted, 1);

        let again = store
            .upsert_chains(&[
                record("u1", "c1", ChainStatus::Active),
                record("u1", "c2", ChainStatus::Closed),
            ])
            .await
            .unwrap();
        assert_eq!(again, UpsertSummary { inserted: 1, updated: 0, unchanged: 1 });

        let changed = store
            .upsert_chains(&[record("u1", "c1", ChainStatus::Closed)])
            .await
            .unwrap();
        assert_eq!(changed.updated, 1);
        assert_eq!(store.chains_for(&UserId::new("u1")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_only_touches_one_user() {
        let store = InMemoryChainStore::new();
        store
            .upsert_chains(&[
                record("u1", "c1", ChainStatus::Closed),
                record("u2", "c1", ChainStatus::Closed),
            ])
            .await
            .unwrap();

        assert_eq!(store.clear_chains(&UserId::new("u1")).await.unwrap(), 1);
        assert!(store.chains_for(&UserId::new("u1")).await.is_empty());
        assert_eq!(store.all_chains().await.len(), 1);
    }

    #[tokio::test]
    async fn test_order_store_filters_by_user() {
        let store = InMemoryOrderStore::new().with_orders(
            UserId::new("u1"),
            vec![RawOrder {
                id: Some("o1".to_string()),
                ..Default::default()
            }],
        );
        let query = OrderQuery {
            symbol: None,
            lookback_days: None,
            as_of: Utc::now(),
        };

        assert_eq!(store.fetch_orders(&UserId::new("u1"), &query).await.unwrap().len(), 1);
        assert!(store.fetch_orders(&UserId::new("u2"), &query).await.unwrap().is_empty());
    }
}
