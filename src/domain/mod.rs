//! Domain types for option-chain reconstruction.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: UserId, Symbol, OrderId, Side, PositionEffect, OptionType, Direction
//! - Raw broker records and the canonical Order/Leg sum types they normalize into
//! - Chain aggregates and the record shape persisted by the chain store
//! - Stable order ordering key for deterministic processing

pub mod chain;
pub mod decimal;
pub mod order;
pub mod ordering;
pub mod primitives;
pub mod raw;

pub use chain::{
    Chain, ChainRecord, ChainStatus, OpenPosition, StatusReason, MAX_CHAIN_DAYS,
};
pub use decimal::Decimal;
pub use order::{Leg, Order, OrderKind, RollLegs};
pub use ordering::OrderOrderingKey;
pub use primitives::{
    Direction, OptionType, OrderId, ParseEnumError, PositionEffect, Side, Symbol, UserId,
};
pub use raw::{RawLeg, RawOrder};
