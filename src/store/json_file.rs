//! Order store backed by a JSON export: an object mapping user id to raw orders.

use super::{OrderQuery, OrderStore, StoreError};
use crate::domain::{RawOrder, UserId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonFileOrderStore {
    path: PathBuf,
}

impl JsonFileOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<BTreeMap<UserId, Vec<RawOrder>>, StoreError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                StoreError::Other(format!("{}: {}", self.path.display(), e))
            }
            _ => StoreError::Unavailable(format!("{}: {}", self.path.display(), e)),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// Every user present in the file.
    pub async fn users(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.load().await?.into_keys().collect())
    }
}

#[async_trait]
impl OrderStore for JsonFileOrderStore {
    async fn fetch_orders(
        &self,
        user: &UserId,
        query: &OrderQuery,
    ) -> Result<Vec<RawOrder>, StoreError> {
        let mut all = self.load().await?;
        let orders: Vec<RawOrder> = all
            .remove(user)
            .unwrap_or_default()
            .into_iter()
            .filter(|o| query.admits(o))
            .collect();
        debug!(%user, orders = orders.len(), path = %self.path.display(), "Loaded orders");
        Ok(orders)
    }
}
