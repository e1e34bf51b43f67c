use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use insight_aggregator::{
    cli::{describe_config, Cli, Commands},
    config::{Config, LogFormat},
    delivery::publisher_from_config,
    scheduler::{
        shutdown_channel, AggregationScheduler, IngestScheduler, InsightFeed, JsonLinesFeed,
    },
    server::{AppState, RpcServer},
    storage::{InsightStore, SqliteStorage},
    AggregationEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; invalid settings stop the process before any loop starts
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    cli.apply(&mut config);

    if cli.command == Some(Commands::Config) {
        print!("{}", describe_config(&config));
        return Ok(());
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        "Insight aggregator starting..."
    );

    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };
    let store: Arc<dyn InsightStore> = Arc::new(storage);

    let publisher = match publisher_from_config(&config.delivery) {
        Ok(p) => {
            info!(
                webhook = config.delivery.webhook_url.as_deref().unwrap_or("none"),
                "Batch delivery initialized"
            );
            p
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize batch delivery");
            return Err(e.into());
        }
    };

    let mut feeds: Vec<Box<dyn InsightFeed>> = Vec::with_capacity(config.ingest.feeds.len());
    for path in &config.ingest.feeds {
        match JsonLinesFeed::open(path).await {
            Ok(feed) => feeds.push(Box::new(feed)),
            Err(e) => {
                error!(error = %e, "Failed to open feed");
                return Err(e.into());
            }
        }
    }

    let engine = Arc::new(AggregationEngine::new(&config));
    let (trigger, shutdown) = shutdown_channel();

    let ingest = IngestScheduler::new(engine.clone(), &config.ingest);
    let ingest_handles = ingest.spawn_all(feeds, shutdown.clone());

    let aggregation = AggregationScheduler::new(
        engine.clone(),
        publisher,
        store.clone(),
        config.aggregation.tick_interval(),
    );
    let aggregation_handle = aggregation.spawn(shutdown);

    let headless = cli.headless;
    let state = Arc::new(AppState::new(config, engine, store));

    let served = if headless {
        info!("Running headless, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await
    } else {
        let server = RpcServer::new(state);
        info!("Server ready, waiting for requests on stdin...");
        tokio::select! {
            result = server.run() => result,
            result = tokio::signal::ctrl_c() => result,
        }
    };

    info!("Stopping background loops...");
    trigger.trigger();

    for handle in ingest_handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Feed consumer task failed");
        }
    }
    if let Err(e) = aggregation_handle.await {
        error!(error = %e, "Aggregation task failed");
    }

    if let Err(e) = served {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
