//! Seniority Augmenter
//!
//! Enriches newline-delimited job-posting files with an inferred seniority:
//! - Watcher turning storage notifications into intake messages
//! - Batch processor with dedup, cache-aside lookup and rate-limited inference
//! - Chunked output writes with multipart upload for large batches
//! - Health and metrics endpoints

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use blob_store::{
    BlobStore, FsBlobStore, MemoryBlobStore, OutputWriter, StorageBackend, StorageConfig,
    WriterConfig,
};
use inference_client::{InferenceClient, InferenceConfig};
use intake_queue::{MemoryQueue, MessageQueue, QueueBackend, QueueConfig, RedisStreamQueue};
use seniority_cache::{CacheClient, CacheConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{
    BatchProcessor, HealthProbes, IntakeWorker, ProcessorConfig, SchedulerConfig, Watcher,
    WatcherConfig, WorkerScheduler,
};

/// Which loops this process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    Watcher,
    Processor,
    #[default]
    All,
}

impl Mode {
    fn runs_watcher(self) -> bool {
        matches!(self, Self::Watcher | Self::All)
    }

    fn runs_processor(self) -> bool {
        matches!(self, Self::Processor | Self::All)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Watcher => "watcher",
            Self::Processor => "processor",
            Self::All => "all",
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "watcher" => Ok(Self::Watcher),
            "processor" => Ok(Self::Processor),
            "all" => Ok(Self::All),
            other => bail!("Unknown mode '{}', expected watcher, processor or all", other),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    #[serde(default)]
    mode: Mode,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    inference: InferenceConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    writer: WriterConfig,
    #[serde(default)]
    queue: QueueConfig,
    #[serde(default)]
    processor: ProcessorConfig,
    #[serde(default)]
    watcher: WatcherConfig,
    #[serde(default)]
    scheduler: SchedulerConfig,
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
            mode: Mode::default(),
            host: default_host(),
            port: default_port(),
            cache: CacheConfig::default(),
            inference: InferenceConfig::default(),
            storage: StorageConfig::default(),
            writer: WriterConfig::default(),
            queue: QueueConfig::default(),
            processor: ProcessorConfig::default(),
            watcher: WatcherConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    fn validate(&self) -> augment_core::Result<()> {
        self.cache.validate()?;
        self.inference.validate()?;
        self.writer.validate()?;
        self.queue.validate()?;
        self.processor.validate()?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Seniority Augmenter v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config()?;
    if let Some(mode) = std::env::args().nth(1) {
        config.mode = mode.parse()?;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        mode = config.mode.as_str(),
        cache = ?config.cache.backend,
        storage = ?config.storage.backend,
        queue = ?config.queue.backend,
        inference_url = %config.inference.url,
        "Loaded config"
    );

    let storage = build_storage(&config.storage);
    let (intake, notifications) = build_queues(&config.queue)?;

    let mut probes = HealthProbes {
        storage: Some(storage.clone()),
        queue: Some(intake.clone()),
        ..Default::default()
    };

    let mut intake_worker = None;
    if config.mode.runs_processor() {
        let cache = CacheClient::from_config(&config.cache)
            .context("Failed to create cache client")?;
        let inference = Arc::new(
            InferenceClient::from_config(&config.inference)
                .context("Failed to create inference client")?,
        );
        let writer = OutputWriter::new(storage.clone(), config.writer.clone());
        let processor = BatchProcessor::new(
            cache.clone(),
            inference.clone(),
            storage.clone(),
            writer,
            config.processor.clone(),
        )
        .context("Failed to create batch processor")?;

        probes.cache = Some(cache);
        probes.inference = Some(inference);
        intake_worker = Some(IntakeWorker::new(intake.clone(), processor, &config.queue));
    } else {
        // components this process never touches
        health().cache.set_healthy();
        health().inference.set_healthy();
    }

    // Check health and update status
    check_health(&probes).await;

    let mut scheduler = WorkerScheduler::new(config.scheduler.clone(), probes);
    if let Some(worker) = intake_worker {
        scheduler = scheduler.with_intake(worker);
    }
    if config.mode.runs_watcher() {
        scheduler = scheduler.with_watcher(Watcher::new(
            notifications,
            intake.clone(),
            &config.watcher,
            &config.queue,
        ));
    }

    let scheduler = Arc::new(scheduler);
    let worker_handles = scheduler.start();

    let app = router(AppState::new(config.mode.as_str()));

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
    scheduler.shutdown(worker_handles).await;

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
        // Override with environment variables, e.g. AUGMENT__CACHE__URL
        .add_source(
            config::Environment::with_prefix("AUGMENT")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("watcher.extensions"),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

fn build_storage(config: &StorageConfig) -> Arc<dyn BlobStore> {
    match config.backend {
        StorageBackend::Fs => Arc::new(FsBlobStore::new(&config.root)),
        StorageBackend::Memory => {
            warn!("Using in-memory storage; nothing survives a restart");
            Arc::new(MemoryBlobStore::new())
        }
    }
}

/// Intake and notification queues.
fn build_queues(config: &QueueConfig) -> Result<(Arc<dyn MessageQueue>, Arc<dyn MessageQueue>)> {
    let queues: (Arc<dyn MessageQueue>, Arc<dyn MessageQueue>) = match config.backend {
        QueueBackend::Redis => {
            let open = |stream: &str| {
                RedisStreamQueue::new(
                    &config.url,
                    stream,
                    config.group.clone(),
                    config.consumer.clone(),
                    config.visibility_timeout(),
                )
                .with_context(|| format!("Failed to create queue {}", stream))
            };
            (
                Arc::new(open(&config.intake_stream)?),
                Arc::new(open(&config.notification_stream)?),
            )
        }
        QueueBackend::Memory => (
            Arc::new(MemoryQueue::new(&config.intake_stream, config.visibility_timeout())),
            Arc::new(MemoryQueue::new(
                &config.notification_stream,
                config.visibility_timeout(),
            )),
        ),
    };
    Ok(queues)
}

/// Check component health on startup.
async fn check_health(probes: &HealthProbes) {
    probes.check_all().await;

    let report = health().report();
    for component in &report.components {
        if component.healthy {
            info!("{} connection: healthy", component.name);
        } else {
            error!(
                "{} connection: unhealthy ({})",
                component.name,
                component.message.as_deref().unwrap_or("unknown")
            );
        }
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
