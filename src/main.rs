use rollchain::{
    AppError, Config, InMemoryChainStore, JsonFileOrderStore, Orchestrator, RunRequest,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let orders = Arc::new(JsonFileOrderStore::new(&config.orders_path));
    let chains = Arc::new(InMemoryChainStore::new());

    let users = if config.users.is_empty() {
        orders.users().await?
    } else {
        config.users.clone()
    };

    let orchestrator = Orchestrator::new(orders, chains.clone())
        .with_retry_max_elapsed(config.retry_max_elapsed);
    let request = RunRequest {
        mode: config.run_mode,
        symbol: config.symbol.clone(),
        lookback_days: Some(config.lookback_days),
        as_of: config.as_of,
    };

    let summaries = orchestrator.run_users(&users, &request).await?;
    tracing::info!(
        users = summaries.len(),
        chains = summaries.iter().map(|s| s.chains_detected).sum::<usize>(),
        "All runs finished"
    );

    let records = chains.all_chains().await;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
