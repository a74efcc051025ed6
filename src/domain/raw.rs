//! Raw broker order records as handed over by the order store.
//!
//! Every field is optional; the normalizer decides what is required.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLeg {
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub position_effect: Option<String>,
    #[serde(default)]
    pub option_type: Option<String>,
    #[serde(default)]
    pub strike_price: Option<RustDecimal>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub quantity: Option<RustDecimal>,
    #[serde(default)]
    pub long_strategy_code: Option<String>,
    #[serde(default)]
    pub short_strategy_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "chain_symbol")]
    pub symbol: Option<String>,
    #[serde(default)]
    pub option_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub processed_premium: Option<RustDecimal>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub legs: Vec<RawLeg>,
    /// Free-form strategy label, e.g. "short_put" or "calendar_roll".
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub long_strategy_code: Option<String>,
    #[serde(default)]
    pub short_strategy_code: Option<String>,
    #[serde(default)]
    pub rolled_from: Option<String>,
    #[serde(default)]
    pub rolled_to: Option<String>,
    /// Broker form tag; roll-sourced orders carry a value containing "roll".
    #[serde(default)]
    pub form_source: Option<String>,
}
