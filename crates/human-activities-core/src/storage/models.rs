use crate::config::Unit;
use crate::error::Error;

/// One measurement of a directory. `threshold_days_ago == 0` covers every
/// file; any other value covers files modified within that many days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub size_bytes: Option<i64>,
    pub num_files: Option<i64>,
    pub threshold_days_ago: i64,
}

/// A monitored directory and its cached stats, keyed by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub path: String,
    pub scanned_at: Option<String>,
    pub stats: Vec<Stat>,
}

impl Directory {
    pub fn stat(&self, threshold_days_ago: u32) -> Option<&Stat> {
        self.stats
            .iter()
            .find(|stat| stat.threshold_days_ago == i64::from(threshold_days_ago))
    }

    /// Cached value for the given unit and threshold, `None` when this
    /// directory was never measured with that threshold.
    pub fn value(&self, unit: Unit, threshold_days_ago: u32) -> Option<u64> {
        let stat = self.stat(threshold_days_ago)?;
        let value = match unit {
            Unit::SizeBytes => stat.size_bytes,
            Unit::NumFiles => stat.num_files,
        }?;
        u64::try_from(value).ok()
    }
}

/// Directories returned by reconciliation, in the requested order.
#[derive(Debug, Clone, Default)]
pub struct DirectorySet {
    directories: Vec<Directory>,
}

impl DirectorySet {
    pub fn new(directories: Vec<Directory>) -> Self {
        Self { directories }
    }

    /// Looks up a reconciled directory. Asking for a path that was not part
    /// of the reconciled set is a caller bug.
    pub fn get(&self, path: &str) -> Result<&Directory, Error> {
        self.directories
            .iter()
            .find(|dir| dir.path == path)
            .ok_or_else(|| Error::UnknownDirectory(path.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directory> {
        self.directories.iter()
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }

    pub fn into_vec(self) -> Vec<Directory> {
        self.directories
    }
}
