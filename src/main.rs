//! Chat Log Exporter
//!
//! Receives parsed chat messages and:
//! - Buffers them per channel as JSON lines
//! - Periodically uploads each channel's batch to blob storage
//! - Registers daily partitions with the query service
//! - Publishes daily and weekly top chatter reports back to chat

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use api::{router, AppState};
use chatlog_core::{normalize_channel, validate_channel_name};
use logstore::{build_object_store, BlobLogWriter, ChannelBuffer, StorageConfig};
use query_client::{AthenaQueryService, ExecutorConfig, QueryConfig, QueryExecutor, QueryService};
use telemetry::{health, init_tracing_from_env};
use worker::{
    build_publisher, FlushWorker, PartitionWorker, ReportWorker, WorkerScheduler, WorkerSettings,
};

/// Report publishing configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct PublisherConfig {
    /// Webhook receiving `{channel, message}`; reports are only logged when unset
    #[serde(default)]
    webhook_url: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Channels to export, with or without a leading `#`
    #[serde(default)]
    channels: Vec<String>,

    #[serde(default)]
    storage: StorageConfig,

    #[serde(default)]
    query: QueryConfig,

    #[serde(default)]
    worker: WorkerSettings,

    #[serde(default)]
    publisher: PublisherConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            channels: Vec::new(),
            storage: StorageConfig::default(),
            query: QueryConfig::default(),
            worker: WorkerSettings::default(),
            publisher: PublisherConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Chat Log Exporter v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let channels = normalize_channels(&config.channels)?;

    config
        .query
        .validate()
        .context("Invalid query configuration")?;
    config
        .worker
        .validate()
        .context("Invalid worker configuration")?;

    info!(
        channels = ?channels,
        storage = %config.storage.describe(),
        table = %format!("{}.{}", config.query.database, config.query.table),
        "Loaded configuration"
    );

    // Blob storage
    let store = build_object_store(&config.storage).context("Failed to create blob store")?;
    let writer = Arc::new(BlobLogWriter::new(store.clone(), config.storage.prefix.clone()));

    // Query service
    let query_service: Arc<dyn QueryService> =
        Arc::new(AthenaQueryService::from_config(&config.query).await);
    let executor = QueryExecutor::new(query_service.clone(), ExecutorConfig::from(&config.query));

    check_health(store.as_ref(), query_service.as_ref()).await;

    let buffer = Arc::new(ChannelBuffer::with_channels(channels));
    let publisher = build_publisher(config.publisher.webhook_url.as_deref())
        .context("Failed to create report publisher")?;

    let flush = FlushWorker::new(buffer.clone(), writer)
        .with_requeue(config.worker.requeue_failed_batches);
    let partitions = PartitionWorker::new(executor.clone(), buffer.clone(), &config.query);
    let reports = ReportWorker::new(
        executor,
        publisher,
        buffer.clone(),
        &config.query,
        config.worker.publish_delay(),
    );

    let scheduler = Arc::new(WorkerScheduler::new(
        config.worker.clone(),
        flush,
        partitions,
        reports,
        store,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handles = scheduler.start(shutdown_rx);

    let app = router(AppState::new(buffer));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    // Workers stop; the flush loop uploads what is still buffered
    if shutdown_tx.send(true).is_err() {
        warn!("Workers already stopped");
    }
    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Worker task failed");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("CHATLOG")
                .list_separator(",")
                .with_list_parse_key("channels")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Single-underscore names for the nested values deployments set most
    if let Ok(bucket) = std::env::var("CHATLOG_STORAGE_BUCKET") {
        config.storage.bucket = bucket;
    }
    if let Ok(database) = std::env::var("CHATLOG_QUERY_DATABASE") {
        config.query.database = database;
    }
    if let Ok(table) = std::env::var("CHATLOG_QUERY_TABLE") {
        config.query.table = table;
    }
    if let Ok(location) = std::env::var("CHATLOG_QUERY_OUTPUT_LOCATION") {
        config.query.output_location = location;
    }
    if let Ok(url) = std::env::var("CHATLOG_PUBLISHER_WEBHOOK_URL") {
        config.publisher.webhook_url = Some(url);
    }

    Ok(config)
}

/// Normalizes configured channel names, dropping duplicates.
fn normalize_channels(configured: &[String]) -> Result<Vec<String>> {
    let mut channels: Vec<String> = Vec::with_capacity(configured.len());
    for raw in configured {
        let channel = normalize_channel(raw);
        validate_channel_name(&channel)
            .with_context(|| format!("Invalid channel in configuration: '{}'", raw))?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }

    if channels.is_empty() {
        bail!("No channels configured (set `channels` or CHATLOG_CHANNELS)");
    }
    Ok(channels)
}

/// Check component health on startup.
async fn check_health(store: &dyn object_store::ObjectStore, query: &dyn QueryService) {
    if logstore::health::check_connection(store).await {
        info!("Blob store connection: healthy");
    } else {
        error!(
            reason = health().blob_store.message().unwrap_or_default(),
            "Blob store connection: unhealthy"
        );
    }

    if query_client::health::check_connection(query).await {
        info!("Query service connection: healthy");
    } else {
        error!(
            reason = health().query_service.message().unwrap_or_default(),
            "Query service connection: unhealthy"
        );
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
