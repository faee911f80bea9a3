use super::{DirSize, ScanOutcome};
use crate::cancel::CancelToken;
use crate::platform;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{trace, warn};

/// Recursively sums the size and count of regular files under `path`.
///
/// Symlinks are neither counted nor followed and hidden entries are skipped.
/// A missing or unreadable directory measures as empty. The cancel token is
/// checked before every directory read and every entry; once it is set the
/// whole walk unwinds as `Cancelled`.
pub fn calc_dir_size(path: &Path, cutoff: Option<SystemTime>, cancel: &CancelToken) -> ScanOutcome {
    visit_dir(path, cutoff, cancel)
}

fn visit_dir(dir: &Path, cutoff: Option<SystemTime>, cancel: &CancelToken) -> ScanOutcome {
    if cancel.is_cancelled() {
        return ScanOutcome::Cancelled;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log_unreadable(dir, &err);
            return ScanOutcome::Completed(DirSize::default());
        }
    };

    let mut total = DirSize::default();
    for entry_result in entries {
        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                trace!("Error reading entry in directory {}: {}", dir.display(), err);
                continue;
            }
        };

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                trace!("Error getting metadata for {}: {}", path.display(), err);
                continue;
            }
        };

        if metadata.file_type().is_symlink() || platform::is_hidden(&path, &metadata) {
            continue;
        }

        if metadata.is_dir() {
            match visit_dir(&path, cutoff, cancel) {
                ScanOutcome::Completed(subtree) => total += subtree,
                ScanOutcome::Cancelled => return ScanOutcome::Cancelled,
            }
        } else if metadata.is_file() {
            total.add_file(metadata.len(), metadata.modified().ok(), cutoff);
        }
    }

    ScanOutcome::Completed(total)
}

fn log_unreadable(dir: &Path, err: &io::Error) {
    match err.kind() {
        io::ErrorKind::NotFound => warn!("Directory {} does not exist", dir.display()),
        io::ErrorKind::PermissionDenied => {
            warn!("Access denied reading directory {}: {}", dir.display(), err)
        }
        _ => warn!("Error reading directory {}: {}", dir.display(), err),
    }
}

/// Sums an already listed set of files. Symlinks and non-regular files in the
/// listing are ignored; entries that vanished since listing count as nothing.
pub fn sum_files<I>(files: I, cutoff: Option<SystemTime>, cancel: &CancelToken) -> ScanOutcome
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut total = DirSize::default();
    let mut files = files.into_iter();
    loop {
        // Checked before pulling the next path, which may block on a finder.
        if cancel.is_cancelled() {
            return ScanOutcome::Cancelled;
        }
        let Some(path) = files.next() else {
            break;
        };
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                total.add_file(metadata.len(), metadata.modified().ok(), cutoff);
            }
            Ok(_) => {}
            Err(err) => trace!("Error getting metadata for {}: {}", path.display(), err),
        }
    }
    ScanOutcome::Completed(total)
}
