//! Chain aggregate and the record shape handed to the chain store.

use crate::domain::{Decimal, Leg, OptionType, Order, OrderId, Side, Symbol, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum elapsed time between the first and last order of a chain. Fixed policy.
pub const MAX_CHAIN_DAYS: i64 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Active,
    Closed,
    Expired,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStatus::Active => "active",
            ChainStatus::Closed => "closed",
            ChainStatus::Expired => "expired",
        }
    }
}

/// Which status rule fired, in decision-table priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// Open-effect and close-effect leg counts are equal.
    OpenCloseBalanced,
    /// The last order only closes.
    FinalClose,
    /// Credits were collected first and the position was unwound by debits.
    CreditThenDebitUnwind,
    /// The open position's expiration date has passed.
    PastExpiration,
    /// A position is still open.
    OpenPosition,
}

impl StatusReason {
    pub fn status(&self) -> ChainStatus {
        match self {
            StatusReason::OpenCloseBalanced
            | StatusReason::FinalClose
            | StatusReason::CreditThenDebitUnwind => ChainStatus::Closed,
            StatusReason::PastExpiration => ChainStatus::Expired,
            StatusReason::OpenPosition => ChainStatus::Active,
        }
    }
}

/// Descriptor of the contract a chain currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub side: Side,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub quantity: Decimal,
}

impl From<&Leg> for OpenPosition {
    fn from(leg: &Leg) -> Self {
        OpenPosition {
            side: leg.side,
            option_type: leg.option_type,
            strike: leg.strike,
            expiration: leg.expiration,
            quantity: leg.quantity,
        }
    }
}

/// A reconstructed open/roll/close chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub chain_id: String,
    pub symbol: Symbol,
    pub option_type: OptionType,
    /// Member orders in chronological order.
    pub orders: Vec<Order>,
    pub roll_count: usize,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub net_premium: Decimal,
    pub status: ChainStatus,
    pub status_reason: StatusReason,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Populated only while the chain is active.
    pub latest_position: Option<OpenPosition>,
}

impl Chain {
    pub fn order_ids(&self) -> impl Iterator<Item = &OrderId> {
        self.orders.iter().map(|o| &o.id)
    }

    pub fn leg_count(&self) -> usize {
        self.orders.iter().map(Order::leg_count).sum()
    }

    pub fn to_record(&self, user: &UserId) -> ChainRecord {
        let mut record = ChainRecord {
            user: user.clone(),
            chain_id: self.chain_id.clone(),
            symbol: self.symbol.clone(),
            option_type: self.option_type,
            status: self.status,
            first_order_at: self.started_at,
            last_order_at: self.last_activity_at,
            order_count: self.orders.len(),
            roll_count: self.roll_count,
            leg_count: self.leg_count(),
            total_credits: self.total_credits,
            total_debits: self.total_debits,
            net_premium: self.net_premium,
            latest_position: self.latest_position.clone(),
            orders: self.orders.clone(),
            fingerprint: String::new(),
        };
        record.fingerprint = record.compute_fingerprint();
        record
    }
}

/// Output record for the chain store, upserted by `(user, chain_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub user: UserId,
    pub chain_id: String,
    pub symbol: Symbol,
    pub option_type: OptionType,
    pub status: ChainStatus,
    pub first_order_at: DateTime<Utc>,
    pub last_order_at: DateTime<Utc>,
    pub order_count: usize,
    pub roll_count: usize,
    pub leg_count: usize,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub net_premium: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_position: Option<OpenPosition>,
    pub orders: Vec<Order>,
    /// Digest of identity and aggregates; equal fingerprints mean an unchanged row.
    pub fingerprint: String,
}

impl ChainRecord {
    /// Hash the fields a consumer would display, truncated to 128 bits.
    pub fn compute_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.user.as_str());
        hasher.update([0u8]);
        hasher.update(self.chain_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.status.as_str());
        for order in &self.orders {
            hasher.update([0u8]);
            hasher.update(order.id.as_str());
        }
        hasher.update([0u8]);
        hasher.update((self.roll_count as u64).to_le_bytes());
        hasher.update(self.total_credits.to_canonical_string());
        hasher.update([0u8]);
        hasher.update(self.total_debits.to_canonical_string());
        if let Some(position) = &self.latest_position {
            hasher.update([0u8]);
            hasher.update(position.strike.to_canonical_string());
            hasher.update(position.expiration.to_string());
        }
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason_maps_to_status() {
        assert_eq!(StatusReason::FinalClose.status(), ChainStatus::Closed);
        assert_eq!(StatusReason::CreditThenDebitUnwind.status(), ChainStatus::Closed);
        assert_eq!(StatusReason::PastExpiration.status(), ChainStatus::Expired);
        assert_eq!(StatusReason::OpenPosition.status(), ChainStatus::Active);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ChainStatus::Expired).unwrap();
        assert_eq!(json, "\"expired\"");
    }
}
