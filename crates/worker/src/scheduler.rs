//! Worker scheduler for background loops.

use blob_store::BlobStore;
use inference_client::InferenceClient;
use intake_queue::MessageQueue;
use seniority_cache::CacheClient;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use telemetry::{health, metrics};

use crate::config::SchedulerConfig;
use crate::consumer::IntakeWorker;
use crate::watcher::Watcher;

/// Backends probed by the periodic health check.
#[derive(Clone, Default)]
pub struct HealthProbes {
    pub cache: Option<CacheClient>,
    pub inference: Option<Arc<InferenceClient>>,
    pub storage: Option<Arc<dyn BlobStore>>,
    pub queue: Option<Arc<dyn MessageQueue>>,
}

impl HealthProbes {
    /// Pings every configured backend and records the result.
    pub async fn check_all(&self) {
        if let Some(cache) = &self.cache {
            let ok = seniority_cache::health::check_connection(cache).await;
            record(&health().cache, ok, "cache unreachable");
        }
        if let Some(inference) = &self.inference {
            let ok = inference_client::health::check_connection(inference).await;
            record(&health().inference, ok, "inference service unreachable");
        }
        if let Some(storage) = &self.storage {
            let ok = blob_store::health::check_connection(storage.as_ref()).await;
            record(&health().storage, ok, "storage unavailable");
        }
        if let Some(queue) = &self.queue {
            let ok = intake_queue::health::check_connection(queue.as_ref()).await;
            record(&health().queue, ok, "queue unreachable");
        }
    }
}

fn record(component: &telemetry::ComponentHealth, ok: bool, message: &str) {
    if ok {
        component.set_healthy();
    } else {
        component.set_unhealthy(message);
    }
}

/// Background worker scheduler.
///
/// All loops share one shutdown signal; [`shutdown`](Self::shutdown) flips
/// it, waits for the loops to finish their current iteration and then
/// closes the inference connection.
pub struct WorkerScheduler {
    config: SchedulerConfig,
    watcher: Option<Arc<Watcher>>,
    intake: Option<Arc<IntakeWorker>>,
    probes: HealthProbes,
    shutdown_tx: watch::Sender<bool>,
}

impl WorkerScheduler {
    pub fn new(config: SchedulerConfig, probes: HealthProbes) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            watcher: None,
            intake: None,
            probes,
            shutdown_tx,
        }
    }

    pub fn with_watcher(mut self, watcher: Watcher) -> Self {
        self.watcher = Some(Arc::new(watcher));
        self
    }

    pub fn with_intake(mut self, intake: IntakeWorker) -> Self {
        self.intake = Some(Arc::new(intake));
        self
    }

    /// A receiver for the shared shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Starts all background loops.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if let Some(watcher) = &self.watcher {
            let watcher = watcher.clone();
            let shutdown = self.subscribe();
            handles.push(tokio::spawn(async move {
                watcher.run(shutdown).await;
            }));
            info!("Watcher started");
        }

        if let Some(intake) = &self.intake {
            let intake = intake.clone();
            let shutdown = self.subscribe();
            handles.push(tokio::spawn(async move {
                intake.run(shutdown).await;
            }));
            info!("Intake worker started");
        }

        let scheduler = self.clone();
        let shutdown = self.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log(shutdown).await;
        }));

        let scheduler = self.clone();
        let shutdown = self.subscribe();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_checks(shutdown).await;
        }));

        info!("Background workers started");
        handles
    }

    /// Signals every loop to stop, waits for them, then closes inference.
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) {
        info!("Stopping background workers");
        self.shutdown_tx.send_replace(true);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }

        if let Some(inference) = &self.probes.inference {
            inference.close().await;
        }
        info!("Background workers stopped");
    }

    async fn run_metrics_log(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.metrics_log_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = metrics().snapshot();
            info!(
                units_processed = snapshot.units_processed,
                units_failed = snapshot.units_failed,
                records_read = snapshot.records_read,
                records_augmented = snapshot.records_augmented,
                records_unresolved = snapshot.records_unresolved,
                cache_hit_ratio = snapshot.cache_hit_ratio(),
                inference_requests = snapshot.inference_requests,
                inference_errors = snapshot.inference_errors,
                batches_written = snapshot.batches_written,
                batch_write_errors = snapshot.batch_write_errors,
                units_in_flight = snapshot.units_in_flight,
                "Metrics"
            );
        }
    }

    async fn run_health_checks(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.health_check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            self.probes.check_all().await;
        }
    }
}
