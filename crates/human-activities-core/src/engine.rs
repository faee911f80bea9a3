use crate::cancel::CancelToken;
use crate::config::{Config, Target, Unit};
use crate::error::Error;
use crate::observer::ScanObserver;
use crate::scanner::{self, ScanMethod, ScanOutcome};
use crate::storage::{Database, Directory};
use crate::views::DirectoryViews;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info};

const TEST_DELAY_MAX_SECS: u64 = 20;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub method: ScanMethod,
    /// Passed to the external finder and honored by its native fallback.
    pub ignore_file: Option<PathBuf>,
    /// Worker count, 0 for the available parallelism.
    pub num_threads: usize,
}

/// Input of one scan round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundConfig {
    pub targets: Vec<Target>,
    pub unit: Unit,
    pub threshold_days_ago: u32,
    /// Sleep 1–20 s per directory before storing it, to exercise front-end
    /// timing.
    pub test_delay: bool,
}

impl RoundConfig {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            targets: config.targets()?,
            unit: config.unit,
            threshold_days_ago: config.threshold_days_ago,
            test_delay: config.test,
        })
    }
}

#[derive(Debug, Default)]
pub struct RoundSummary {
    pub scanned: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Result a worker sends back for one directory.
enum ScanMessage {
    Scanned(Directory),
    Cancelled(String),
    Failed(String),
}

/// Measures every configured directory concurrently and keeps the cache and
/// the view model in step.
pub struct ScanEngine {
    db: Arc<Database>,
    options: EngineOptions,
    pool: rayon::ThreadPool,
}

impl ScanEngine {
    pub fn new(db: Arc<Database>, options: EngineOptions) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.num_threads)
            .thread_name(|i| format!("scan-worker-{}", i))
            .build()?;
        debug!("Scan pool started with {} workers", pool.current_num_threads());
        Ok(Self { db, options, pool })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs one round:
    /// 1. Reconcile the cache with the round's targets
    /// 2. Publish every target as pending with its cached value
    /// 3. Measure each directory on the pool, storing and publishing results
    ///    as they arrive, in any order
    ///
    /// `views` is only touched from the calling thread.
    pub fn run_round(
        &self,
        views: &mut DirectoryViews,
        round: &RoundConfig,
        cancel: &CancelToken,
        observer: &dyn ScanObserver,
    ) -> Result<RoundSummary, Error> {
        let start = Instant::now();
        let paths: Vec<String> = round.targets.iter().map(|t| t.path.clone()).collect();
        let directories = self.db.reconcile(&paths)?;
        info!("Scanning {} directories", directories.len());

        views.reset(&round.targets, round.unit, round.threshold_days_ago);
        views.load(directories.iter(), true);
        observer.on_round_started(views);

        let cutoff = scanner::threshold_cutoff(round.threshold_days_ago, SystemTime::now());
        let (tx, rx) = crossbeam_channel::unbounded::<ScanMessage>();
        let mut summary = RoundSummary::default();

        thread::scope(|s| {
            let directories = &directories;
            s.spawn(move || {
                self.pool.scope(|pool_scope| {
                    for directory in directories.iter() {
                        let tx = tx.clone();
                        pool_scope.spawn(move |_| {
                            let message =
                                self.scan_directory(directory, round, cutoff, cancel);
                            let _ = tx.send(message);
                        });
                    }
                });
            });

            for message in rx.iter() {
                match message {
                    ScanMessage::Scanned(directory) => {
                        summary.scanned += 1;
                        views.load([&directory], false);
                        observer.on_directory_scanned(&directory, views);
                    }
                    ScanMessage::Cancelled(_) => summary.cancelled += 1,
                    ScanMessage::Failed(path) => {
                        summary.failed += 1;
                        views.mark_failed(&path);
                    }
                }
            }
        });

        summary.duration = start.elapsed();
        observer.on_round_finished(views);
        info!(
            "Scan round finished in {:.2}s: {} scanned, {} cancelled, {} failed",
            summary.duration.as_secs_f64(),
            summary.scanned,
            summary.cancelled,
            summary.failed,
        );
        Ok(summary)
    }

    /// Runs rounds until cancelled, waiting `config.interval_sec` between
    /// them. A zero interval runs a single round.
    pub fn run(
        &self,
        views: &mut DirectoryViews,
        config: &Config,
        cancel: &CancelToken,
        observer: &dyn ScanObserver,
    ) -> Result<(), Error> {
        let interval = config.interval();
        loop {
            let round = RoundConfig::from_config(config)?;
            self.run_round(views, &round, cancel, observer)?;

            if cancel.is_cancelled() {
                info!("Scanning cancelled");
                return Ok(());
            }
            if interval.is_zero() {
                debug!("No scan interval configured, not rescheduling");
                return Ok(());
            }
            debug!("Next scan in {}s", interval.as_secs());
            if cancel.wait_timeout(interval) {
                info!("Scanning cancelled");
                return Ok(());
            }
        }
    }

    fn scan_directory(
        &self,
        directory: &Directory,
        round: &RoundConfig,
        cutoff: Option<SystemTime>,
        cancel: &CancelToken,
    ) -> ScanMessage {
        let path = directory.path.clone();
        let started = Instant::now();
        let outcome = scanner::measure(
            Path::new(&path),
            cutoff,
            cancel,
            self.options.method,
            self.options.ignore_file.as_deref(),
        );

        let size = match outcome {
            ScanOutcome::Completed(size) => size,
            ScanOutcome::Cancelled => {
                debug!("Scan of {} cancelled", path);
                return ScanMessage::Cancelled(path);
            }
        };

        if round.test_delay {
            let delay = test_delay();
            debug!("Test mode: delaying {} by {}s", path, delay.as_secs());
            if cancel.wait_timeout(delay) {
                return ScanMessage::Cancelled(path);
            }
        }

        match self.db.update_stats(directory, round.threshold_days_ago, &size) {
            Ok(updated) => {
                debug!(
                    "Scanned {} in {:.2}s: {} bytes, {} files",
                    path,
                    started.elapsed().as_secs_f64(),
                    size.size_bytes_all,
                    size.num_files_all,
                );
                ScanMessage::Scanned(updated)
            }
            Err(err) => {
                error!("Error storing stats for {}: {}", path, err);
                ScanMessage::Failed(path)
            }
        }
    }
}

fn test_delay() -> Duration {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default(),
    );
    Duration::from_secs(1 + hasher.finish() % TEST_DELAY_MAX_SECS)
}
