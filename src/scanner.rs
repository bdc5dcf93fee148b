//! Scan coordinator
//!
//! Drives a fixed pool of workers over the package universe. Each worker
//! pulls one identifier at a time from a shared closable queue and takes
//! the package end to end: resolve the latest source distribution,
//! download it, unpack its source members, analyze each one, and store a
//! single [`ScanOutcome`]. A background task snapshots the store
//! periodically; one final snapshot runs after the queue drains.
//!
//! Per-package failures are logged and never abort the pool. Only a
//! checkpoint write failure is fatal: it cancels the run rather than
//! risk silently losing accumulated progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::analyzer::{HttpAnalyzer, ImportAnalyzer};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolver::{MetadataResolver, PyPiResolver};
use crate::store::ResultStore;
use crate::types::{Event, ScanOutcome};
use crate::unpack::unpack_source_files_in;

/// Buffer size for the event broadcast channel
const EVENT_CHANNEL_BUFFER: usize = 256;

/// Buffer size for the package identifier queue
const QUEUE_BUFFER: usize = 64;

/// Aggregate counts for one coordinator run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Packages processed to a stored outcome during this run
    pub scanned: u64,
    /// Packages skipped because the store already held an outcome
    pub skipped: u64,
    /// Packages that aborted before their outcome could be stored
    pub failed: u64,
    /// Total outcomes in the store after the final snapshot
    pub stored: usize,
}

#[derive(Default)]
struct ScanCounters {
    scanned: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// The scan coordinator
///
/// Cheap to clone; clones share the result store, the HTTP client, and
/// the event channel.
#[derive(Clone)]
pub struct Scanner {
    config: Config,
    client: reqwest::Client,
    store: Arc<ResultStore>,
    resolver: Arc<dyn MetadataResolver>,
    analyzer: Arc<dyn ImportAnalyzer>,
    event_tx: broadcast::Sender<Event>,
}

impl Scanner {
    /// Create a scanner with injected resolver and analyzer capabilities
    pub fn new(
        config: Config,
        resolver: Arc<dyn MetadataResolver>,
        analyzer: Arc<dyn ImportAnalyzer>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_BUFFER);
        Ok(Self {
            config,
            client,
            store: Arc::new(ResultStore::new()),
            resolver,
            analyzer,
            event_tx,
        })
    }

    /// Create a scanner wired to the PyPI JSON API and the configured
    /// networked analysis service
    pub fn with_defaults(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let resolver: Arc<dyn MetadataResolver> = Arc::new(PyPiResolver::new(
            client.clone(),
            config.metadata_base_url.clone(),
        ));
        let analyzer: Arc<dyn ImportAnalyzer> =
            Arc::new(HttpAnalyzer::new(client.clone(), config.analyzer_url.clone()));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_BUFFER);
        Ok(Self {
            config,
            client,
            store: Arc::new(ResultStore::new()),
            resolver,
            analyzer,
            event_tx,
        })
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The shared result store
    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    /// Scan every package in `packages`, resuming from any existing
    /// checkpoint at the configured results path
    ///
    /// Workers drain the queue with no ordering guarantee across packages.
    /// Returns aggregate counts once the queue is drained, all workers
    /// have exited, and the final snapshot is on disk.
    ///
    /// # Errors
    ///
    /// Only checkpoint persistence failures (and setup failures) are
    /// fatal; per-package errors are absorbed into the summary.
    pub async fn run(&self, packages: Vec<String>) -> Result<ScanSummary> {
        let restored = self.store.load_if_exists(&self.config.results_path).await?;
        if restored > 0 {
            info!(packages = restored, "resuming from existing checkpoint");
        }

        let shutdown = CancellationToken::new();
        let counters = Arc::new(ScanCounters::default());

        let snapshot_task = self.spawn_snapshot_task(shutdown.clone());

        let (queue_tx, queue_rx) = mpsc::channel::<String>(QUEUE_BUFFER);
        let queue_rx = Arc::new(Mutex::new(queue_rx));

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for _ in 0..self.config.worker_count {
            let scanner = self.clone();
            let queue_rx = Arc::clone(&queue_rx);
            let shutdown = shutdown.clone();
            let counters = Arc::clone(&counters);
            workers.push(tokio::spawn(async move {
                scanner.worker_loop(queue_rx, shutdown, counters).await;
            }));
        }
        // Workers hold the only receiver handles; once they all exit the
        // channel closes and a blocked producer unblocks with an error.
        drop(queue_rx);

        // Feed the universe, then close the queue; workers observe closure
        // and exit after draining the remaining items.
        let producer: JoinHandle<std::result::Result<(), mpsc::error::SendError<String>>> =
            tokio::spawn(async move {
                for package in packages {
                    queue_tx.send(package).await?;
                }
                Ok(())
            });

        let produced = producer.await;
        let mut worker_panic = None;
        for worker in workers {
            if let Err(e) = worker.await {
                worker_panic.get_or_insert(e);
            }
        }

        // Cancel unconditionally before surfacing any failure, or a
        // panicked worker would leave the snapshot task running detached.
        shutdown.cancel();
        let snapshot_result = snapshot_task
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        // A mid-run checkpoint failure outranks the producer's send error:
        // the send only fails because the cancelled workers dropped the queue.
        snapshot_result?;
        if let Some(e) = worker_panic {
            return Err(Error::Other(e.to_string()));
        }
        if produced
            .map_err(|e| Error::Other(e.to_string()))?
            .is_err()
        {
            return Err(Error::QueueClosed);
        }

        let stored = self.store.snapshot(&self.config.results_path).await?;
        self.event_tx
            .send(Event::Checkpointed { packages: stored })
            .ok();

        let summary = ScanSummary {
            scanned: counters.scanned.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            stored,
        };
        info!(
            scanned = summary.scanned,
            skipped = summary.skipped,
            failed = summary.failed,
            stored = summary.stored,
            "scan complete"
        );
        Ok(summary)
    }

    /// Spawn the periodic snapshot task
    ///
    /// On a write failure the task cancels `shutdown` so workers stop
    /// pulling new packages, and surfaces the error through its handle.
    fn spawn_snapshot_task(&self, shutdown: CancellationToken) -> JoinHandle<Result<()>> {
        let store = Arc::clone(&self.store);
        let path = self.config.results_path.clone();
        let interval_duration = self.config.snapshot_interval();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick is immediate; skip it so the initial snapshot
            // isn't a no-op write racing the restore.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match store.snapshot(&path).await {
                            Ok(packages) => {
                                event_tx.send(Event::Checkpointed { packages }).ok();
                            }
                            Err(e) => {
                                error!(error = %e, "checkpoint write failed, aborting run");
                                shutdown.cancel();
                                return Err(e);
                            }
                        }
                    }
                    _ = shutdown.cancelled() => {
                        return Ok(());
                    }
                }
            }
        })
    }

    async fn worker_loop(
        &self,
        queue_rx: Arc<Mutex<mpsc::Receiver<String>>>,
        shutdown: CancellationToken,
        counters: Arc<ScanCounters>,
    ) {
        loop {
            let next = {
                let mut rx = queue_rx.lock().await;
                tokio::select! {
                    item = rx.recv() => item,
                    _ = shutdown.cancelled() => None,
                }
            };
            let Some(package) = next else {
                break;
            };
            if shutdown.is_cancelled() {
                break;
            }

            if self.store.contains(&package).await {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                self.event_tx
                    .send(Event::Skipped {
                        package: package.clone(),
                    })
                    .ok();
                continue;
            }

            match self.process_package(&package).await {
                Ok((imports, errors)) => {
                    counters.scanned.fetch_add(1, Ordering::Relaxed);
                    info!(result = "success", package = %package, "package scanned");
                    self.event_tx
                        .send(Event::Scanned {
                            package,
                            imports,
                            errors,
                        })
                        .ok();
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        result = "failure",
                        package = %package,
                        phase = e.phase(),
                        error = %e,
                        "package scan aborted"
                    );
                    self.event_tx
                        .send(Event::Failed {
                            package,
                            reason: e.to_string(),
                        })
                        .ok();
                }
            }
        }
    }

    /// Process one package end to end and store its outcome
    ///
    /// Any failure before the final insert leaves the store untouched, so
    /// the package stays eligible for retry on a later run. Soft analysis
    /// failures are absorbed into the outcome's error counts; hard
    /// analyzer failures abort the package. Returns the distinct import
    /// and error counts of the stored outcome.
    async fn process_package(&self, package: &str) -> Result<(usize, usize)> {
        let reference = self.resolver.latest_source(package).await?;
        let filename = reference
            .url
            .rsplit('/')
            .next()
            .unwrap_or(&reference.url)
            .to_string();

        let response = self.client.get(&reference.url).send().await?;
        if !response.status().is_success() {
            return Err(Error::DownloadStatus {
                url: reference.url,
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        let artifacts =
            unpack_source_files_in(&bytes, &filename, self.config.temp_dir.as_deref())?;

        let mut outcome = ScanOutcome {
            url: reference.url,
            version: reference.version,
            ..Default::default()
        };
        for artifact in artifacts {
            // The artifact is dropped (and its temp file removed) at the
            // end of this iteration, success or failure alike.
            let report = self.analyzer.analyze(artifact.path()).await?;
            if !report.error.is_empty() {
                outcome.record_error(&report.error);
            }
            for module in &report.imports {
                outcome.record_import(module);
            }
        }

        let counts = (outcome.imports.len(), outcome.errors.len());
        self.store.insert(package.to_string(), outcome).await;
        Ok(counts)
    }
}
