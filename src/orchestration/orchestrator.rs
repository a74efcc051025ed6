use crate::domain::{Symbol, UserId};
use crate::engine::{ChainDetector, DetectError, DetectionReport};
use crate::store::{ChainStore, OrderQuery, OrderStore, StoreError, UpsertSummary};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const RETRY_INITIAL_INTERVAL: Duration = Duration::from_millis(50);

/// Whether a run replaces a user's chains or only upserts into them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Clear the user's chains, then write the freshly detected set.
    #[default]
    Full,
    /// Upsert the chains detected from the supplied window only.
    Incremental,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: RunMode,
    pub symbol: Option<Symbol>,
    pub lookback_days: Option<u32>,
    /// Evaluation date; also the upper bound of the order window.
    pub as_of: NaiveDate,
}

impl RunRequest {
    fn query(&self) -> OrderQuery {
        OrderQuery {
            symbol: self.symbol.clone(),
            lookback_days: self.lookback_days,
            as_of: end_of_day(self.as_of),
        }
    }
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc() + ChronoDuration::days(1) - ChronoDuration::seconds(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub user: UserId,
    pub orders_loaded: usize,
    pub chains_detected: usize,
    pub chains_cleared: usize,
    pub upsert: UpsertSummary,
    pub dropped_orders: usize,
    pub rejected_candidates: usize,
}

/// Loads a user's orders, runs detection and persists the chains.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    orders: Arc<dyn OrderStore>,
    chains: Arc<dyn ChainStore>,
    retry_max_elapsed: Duration,
}

impl Orchestrator {
    pub fn new(orders: Arc<dyn OrderStore>, chains: Arc<dyn ChainStore>) -> Self {
        Self {
            orders,
            chains,
            retry_max_elapsed: Duration::from_secs(30),
        }
    }

    /// Upper bound on time spent retrying transient store errors.
    pub fn with_retry_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.retry_max_elapsed = max_elapsed;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: RETRY_INITIAL_INTERVAL,
            current_interval: RETRY_INITIAL_INTERVAL,
            max_elapsed_time: Some(self.retry_max_elapsed),
            ..Default::default()
        }
    }

    /// Run detection for one user.
    pub async fn run(
        &self,
        user: &UserId,
        request: &RunRequest,
    ) -> Result<RunSummary, OrchestrationError> {
        let query = request.query();
        let raw = retry(self.backoff(), || async {
            self.orders
                .fetch_orders(user, &query)
                .await
                .map_err(|e| classify(e, "fetch_orders"))
        })
        .await?;

        let orders_loaded = raw.len();
        let report = if raw.is_empty() {
            DetectionReport::default()
        } else {
            let detector = ChainDetector::new(request.as_of);
            tokio::task::spawn_blocking(move || detector.run(&raw)).await??
        };
        let mut summary = RunSummary {
            user: user.clone(),
            orders_loaded,
            chains_detected: report.chains.len(),
            chains_cleared: 0,
            upsert: UpsertSummary::default(),
            dropped_orders: report.issues.len(),
            rejected_candidates: report.rejections.len(),
        };

        let records: Vec<_> = report.chains.iter().map(|c| c.to_record(user)).collect();

        if request.mode == RunMode::Full {
            summary.chains_cleared = retry(self.backoff(), || async {
                self.chains
                    .clear_chains(user)
                    .await
                    .map_err(|e| classify(e, "clear_chains"))
            })
            .await?;
        }
        if !records.is_empty() {
            summary.upsert = retry(self.backoff(), || async {
                self.chains
                    .upsert_chains(&records)
                    .await
                    .map_err(|e| classify(e, "upsert_chains"))
            })
            .await?;
        }

        info!(
            %user,
            mode = ?request.mode,
            orders = summary.orders_loaded,
            chains = summary.chains_detected,
            cleared = summary.chains_cleared,
            inserted = summary.upsert.inserted,
            updated = summary.upsert.updated,
            unchanged = summary.upsert.unchanged,
            "Chain detection run finished"
        );
        Ok(summary)
    }

    /// Run several users concurrently. Users share no state, so each run is
    /// independent; the first failure is returned.
    pub async fn run_users(
        &self,
        users: &[UserId],
        request: &RunRequest,
    ) -> Result<Vec<RunSummary>, OrchestrationError> {
        futures::future::try_join_all(users.iter().map(|user| self.run(user, request))).await
    }
}

fn classify(err: StoreError, operation: &'static str) -> backoff::Error<StoreError> {
    if err.is_transient() {
        warn!(operation, error = %err, "Transient store error, retrying");
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error("detection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_window_ends_with_as_of_day() {
        let request = RunRequest {
            mode: RunMode::Incremental,
            symbol: Some(Symbol::new("smci")),
            lookback_days: Some(30),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };

        let query = request.query();
        assert_eq!(query.as_of.to_rfc3339(), "2024-03-01T23:59:59+00:00");
        assert_eq!(query.symbol, Some(Symbol::new("SMCI")));
        assert_eq!(query.lookback_days, Some(30));
    }

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(matches!(
            classify(StoreError::Timeout, "test"),
            backoff::Error::Transient { .. }
        ));
        assert!(matches!(
            classify(StoreError::Malformed("x".to_string()), "test"),
            backoff::Error::Permanent(_)
        ));
    }
}
