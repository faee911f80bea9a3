use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::ScanEngine;
use crate::observer::ScanObserver;
use crate::views::DirectoryViews;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

struct Running {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// Keeps the scan loop running on a background thread and restarts it when
/// the configuration changes or a rescan is requested.
pub struct Scheduler {
    engine: Arc<ScanEngine>,
    observer: Arc<dyn ScanObserver>,
    config: Config,
    running: Option<Running>,
}

impl Scheduler {
    pub fn start(engine: Arc<ScanEngine>, config: Config, observer: Arc<dyn ScanObserver>) -> Self {
        let mut scheduler = Self {
            engine,
            observer,
            config,
            running: None,
        };
        scheduler.spawn();
        scheduler
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancels the current round and starts over with `config`.
    pub fn reconfigure(&mut self, config: Config) {
        self.halt();
        self.config = config;
        self.spawn();
    }

    /// Starts a new round right away with the current configuration.
    pub fn rescan(&mut self) {
        self.halt();
        self.spawn();
    }

    /// `true` while a round is running or the loop is waiting for the next
    /// one.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancels the loop, waits for in-flight scans to unwind and tells the
    /// observer no more snapshots follow.
    pub fn stop(&mut self) {
        if self.halt() {
            self.observer.on_stopped();
        }
    }

    /// Cancels and joins the loop thread. Returns `true` if the loop was
    /// still live, i.e. it had not already reported stopping itself.
    fn halt(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        let live = !running.handle.is_finished();
        running.cancel.cancel();
        if running.handle.join().is_err() {
            error!("Scan thread panicked");
            return true;
        }
        debug!("Scan loop stopped");
        live
    }

    fn spawn(&mut self) {
        let cancel = CancelToken::new();
        let engine = Arc::clone(&self.engine);
        let observer = Arc::clone(&self.observer);
        let config = self.config.clone();
        let thread_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name("scan-loop".to_string())
            .spawn(move || {
                let mut views = DirectoryViews::new(config.unit, config.threshold_days_ago);
                if let Err(err) = engine.run(&mut views, &config, &thread_cancel, observer.as_ref()) {
                    error!("Scan loop stopped: {}", err);
                }
                if !thread_cancel.is_cancelled() {
                    observer.on_stopped();
                }
            });

        match spawned {
            Ok(handle) => self.running = Some(Running { cancel, handle }),
            Err(err) => {
                error!("Failed to start scan thread: {}", err);
                self.observer.on_stopped();
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
