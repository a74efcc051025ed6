pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use domain::{
    Chain, ChainRecord, ChainStatus, Decimal, OptionType, Order, OrderId, RawLeg, RawOrder,
    Symbol, UserId,
};
pub use engine::{ChainDetector, DetectError, DetectionReport};
pub use error::AppError;
pub use orchestration::{Orchestrator, RunMode, RunRequest, RunSummary};
pub use store::{
    ChainStore, InMemoryChainStore, InMemoryOrderStore, JsonFileOrderStore, OrderStore,
    StoreError,
};
