use crate::config::ConfigError;
use crate::orchestration::OrchestrationError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Run failed: {0}")]
    Run(#[from] OrchestrationError),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_wraps_source() {
        let err: AppError = ConfigError::MissingEnv("ORDERS_PATH".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required environment variable: ORDERS_PATH"
        );

        let err: AppError = OrchestrationError::from(StoreError::Timeout).into();
        assert_eq!(err.to_string(), "Run failed: store timed out");
    }
}
