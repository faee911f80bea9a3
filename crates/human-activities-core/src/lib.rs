pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod named_dirs;
pub mod observer;
pub mod platform;
pub mod scanner;
pub mod scheduler;
pub mod storage;
pub mod views;

pub use cancel::CancelToken;
pub use config::{Config, Mode, Target, Unit};
pub use engine::{EngineOptions, RoundConfig, RoundSummary, ScanEngine};
pub use error::Error;
pub use named_dirs::NamedDirs;
pub use observer::{snapshot_queue, ScanObserver, SilentObserver, SnapshotQueue, SnapshotReceiver};
pub use scheduler::Scheduler;
pub use storage::Database;
pub use views::{DirectoryView, DirectoryViews};
