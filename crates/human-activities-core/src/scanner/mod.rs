pub mod external;
pub mod ignore;
pub mod walk;

use crate::cancel::CancelToken;
use std::ops::AddAssign;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub use walk::{calc_dir_size, sum_files};

const SECONDS_PER_DAY: u64 = 86_400;

/// Aggregate of one directory subtree. The `new` buckets only count files
/// modified after the threshold cutoff and are zero when no cutoff is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirSize {
    pub size_bytes_all: u64,
    pub size_bytes_new: u64,
    pub num_files_all: u64,
    pub num_files_new: u64,
}

impl DirSize {
    pub fn add_file(&mut self, len: u64, modified: Option<SystemTime>, cutoff: Option<SystemTime>) {
        self.size_bytes_all += len;
        self.num_files_all += 1;
        if let (Some(modified), Some(cutoff)) = (modified, cutoff) {
            if modified > cutoff {
                self.size_bytes_new += len;
                self.num_files_new += 1;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_files_all == 0
    }
}

impl AddAssign for DirSize {
    fn add_assign(&mut self, other: Self) {
        self.size_bytes_all += other.size_bytes_all;
        self.size_bytes_new += other.size_bytes_new;
        self.num_files_all += other.num_files_all;
        self.num_files_new += other.num_files_new;
    }
}

/// Result of measuring a directory. An empty directory is `Completed` with a
/// zero `DirSize`; an aborted scan is `Cancelled` and carries no partial sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(DirSize),
    Cancelled,
}

impl ScanOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMethod {
    /// Recursive walk in-process.
    #[default]
    Native,
    /// List files with the external finder, falling back to a native listing
    /// when it is not installed.
    External,
}

/// Oldest modification time that still counts as new, `None` for zero days.
pub fn threshold_cutoff(threshold_days_ago: u32, now: SystemTime) -> Option<SystemTime> {
    if threshold_days_ago == 0 {
        return None;
    }
    let age = Duration::from_secs(u64::from(threshold_days_ago) * SECONDS_PER_DAY);
    Some(now.checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH))
}

pub fn measure(
    path: &Path,
    cutoff: Option<SystemTime>,
    cancel: &CancelToken,
    method: ScanMethod,
    ignore_file: Option<&Path>,
) -> ScanOutcome {
    match method {
        ScanMethod::Native => calc_dir_size(path, cutoff, cancel),
        ScanMethod::External => external::list_files(path, ignore_file).total(cutoff, cancel),
    }
}
