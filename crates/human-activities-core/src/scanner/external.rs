use super::ignore::IgnorePatterns;
use super::{sum_files, DirSize, ScanOutcome};
use crate::cancel::CancelToken;
use crate::platform;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::SystemTime;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Finder binaries tried in order; Debian ships `fd` as `fdfind`.
const TOOL_NAMES: [&str; 2] = ["fd", "fdfind"];

/// Lazy listing of the regular files under one directory.
pub enum FileList {
    /// Paths streamed from the external finder.
    External(ToolOutput),
    Native(NativeFiles),
}

impl FileList {
    /// `true` when the external finder exited unsuccessfully.
    pub fn failed(&self) -> bool {
        match self {
            FileList::External(output) => output.failed(),
            FileList::Native(_) => false,
        }
    }

    /// Sums the listed files. A finder that fails part way contributes no
    /// files at all for this path.
    pub fn total(mut self, cutoff: Option<SystemTime>, cancel: &CancelToken) -> ScanOutcome {
        let outcome = sum_files(&mut self, cutoff, cancel);
        if outcome.is_cancelled() || !self.failed() {
            return outcome;
        }
        ScanOutcome::Completed(DirSize::default())
    }
}

impl Iterator for FileList {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        match self {
            FileList::External(output) => output.next(),
            FileList::Native(files) => files.next(),
        }
    }
}

pub fn find_tool() -> Option<PathBuf> {
    TOOL_NAMES.iter().find_map(|name| which::which(name).ok())
}

/// Lists regular files under `path`, delegating to the external finder when
/// one is installed. A missing or unstartable finder falls back to a native
/// listing.
pub fn list_files(path: &Path, ignore_file: Option<&Path>) -> FileList {
    match find_tool() {
        Some(tool) => run_tool(&tool, path, ignore_file),
        None => {
            debug!("No external finder installed, listing {} natively", path.display());
            FileList::Native(NativeFiles::new(path, ignore_file))
        }
    }
}

fn run_tool(tool: &Path, path: &Path, ignore_file: Option<&Path>) -> FileList {
    let mut command = Command::new(tool);
    command
        .arg("--type")
        .arg("f")
        .arg("--no-ignore-vcs")
        .arg("--absolute-path")
        .arg("--print0");
    if let Some(ignore_file) = ignore_file {
        command.arg("--ignore-file").arg(ignore_file);
    }
    command.arg(".").arg(path);
    trace!("Running {:?}", command);

    match ToolOutput::spawn(command, path) {
        Ok(output) => FileList::External(output),
        Err(err) => {
            warn!(
                "Failed to run {}: {}, listing {} natively",
                tool.display(),
                err,
                path.display()
            );
            FileList::Native(NativeFiles::new(path, ignore_file))
        }
    }
}

/// Iterator over the NUL-separated paths printed by a running finder.
///
/// The exit status is checked once the output is exhausted. Dropping the
/// iterator early kills the finder.
pub struct ToolOutput {
    root: PathBuf,
    child: Child,
    reader: BufReader<ChildStdout>,
    record: Vec<u8>,
    done: bool,
    failed: bool,
}

impl ToolOutput {
    pub fn spawn(mut command: Command, root: &Path) -> io::Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(io::ErrorKind::Other, "finder output not captured"));
            }
        };
        Ok(Self {
            root: root.to_path_buf(),
            child,
            reader: BufReader::new(stdout),
            record: Vec::new(),
            done: false,
            failed: false,
        })
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    fn finish(&mut self, kill: bool) {
        if self.done {
            return;
        }
        self.done = true;
        if kill {
            let _ = self.child.kill();
        }
        match self.child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                if !kill {
                    warn!("Finder exited with {} for {}", status, self.root.display());
                }
                self.failed = true;
            }
            Err(err) => {
                warn!("Error waiting for finder on {}: {}", self.root.display(), err);
                self.failed = true;
            }
        }
    }
}

impl Iterator for ToolOutput {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        while !self.done {
            self.record.clear();
            match self.reader.read_until(0, &mut self.record) {
                Ok(0) => self.finish(false),
                Ok(_) => {
                    if self.record.last() == Some(&0) {
                        self.record.pop();
                    }
                    if !self.record.is_empty() {
                        return Some(bytes_to_path(&self.record));
                    }
                }
                Err(err) => {
                    warn!("Error reading finder output for {}: {}", self.root.display(), err);
                    self.finish(true);
                    self.failed = true;
                }
            }
        }
        None
    }
}

impl Drop for ToolOutput {
    fn drop(&mut self) {
        if !self.done {
            debug!("Stopping finder for {}", self.root.display());
            self.finish(true);
        }
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Native listing applying the same rules as the walker: links are not
/// followed, hidden entries and ignored subtrees are pruned.
pub struct NativeFiles {
    root: PathBuf,
    ignore: IgnorePatterns,
    walker: walkdir::IntoIter,
}

impl NativeFiles {
    pub fn new(root: &Path, ignore_file: Option<&Path>) -> Self {
        let ignore = ignore_file.map(IgnorePatterns::load).unwrap_or_default();
        Self {
            root: root.to_path_buf(),
            ignore,
            walker: WalkDir::new(root).follow_links(false).into_iter(),
        }
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        if entry.path_is_symlink() {
            return true;
        }
        let hidden = match entry.metadata() {
            Ok(metadata) => platform::is_hidden(entry.path(), &metadata),
            Err(_) => platform::has_dot_name(entry.path()),
        };
        if hidden {
            return true;
        }
        if self.ignore.is_empty() {
            return false;
        }
        entry
            .path()
            .strip_prefix(&self.root)
            .map(|relative| self.ignore.matches(relative))
            .unwrap_or(false)
    }
}

impl Iterator for NativeFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    trace!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if self.is_excluded(&entry) {
                if entry.file_type().is_dir() {
                    self.walker.skip_current_dir();
                }
                continue;
            }
            if entry.file_type().is_file() {
                return Some(entry.into_path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn names(files: impl Iterator<Item = PathBuf>, root: &Path) -> BTreeSet<String> {
        files
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_output_splits_on_nul() {
        let mut command = Command::new("printf");
        command.arg(r"/a/one\0/a/two\0\0/a/three");
        let output = ToolOutput::spawn(command, Path::new("/a")).unwrap();
        let paths: Vec<PathBuf> = output.collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a/one"),
                PathBuf::from("/a/two"),
                PathBuf::from("/a/three"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tool_yields_nothing() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("file"), vec![0u8; 10]).unwrap();

        let mut files = run_tool(Path::new("false"), tmp.path(), None);
        assert!(matches!(files, FileList::External(_)));
        assert_eq!(files.by_ref().count(), 0);
        assert!(files.failed());
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_failing_part_way_counts_nothing() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, vec![0u8; 10]).unwrap();

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"printf '%s\0' "$0"; exit 3"#)
            .arg(&file);
        let files = FileList::External(ToolOutput::spawn(command, tmp.path()).unwrap());
        match files.total(None, &CancelToken::new()) {
            ScanOutcome::Completed(size) => assert!(size.is_empty()),
            ScanOutcome::Cancelled => panic!("listing was cancelled"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_tool_listing_is_summed() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, vec![0u8; 10]).unwrap();

        let mut command = Command::new("sh");
        command.arg("-c").arg(r#"printf '%s\0' "$0""#).arg(&file);
        let files = FileList::External(ToolOutput::spawn(command, tmp.path()).unwrap());
        match files.total(None, &CancelToken::new()) {
            ScanOutcome::Completed(size) => {
                assert_eq!(size.size_bytes_all, 10);
                assert_eq!(size.num_files_all, 1);
            }
            ScanOutcome::Cancelled => panic!("listing was cancelled"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_listing_stops_the_tool() {
        let tmp = tempdir().unwrap();
        let mut command = Command::new("sh");
        command.arg("-c").arg(r"printf '/x\0'; exec sleep 30");
        let files = FileList::External(ToolOutput::spawn(command, tmp.path()).unwrap());

        let cancel = CancelToken::new();
        cancel.cancel();
        let start = std::time::Instant::now();
        assert!(files.total(None, &cancel).is_cancelled());
        assert!(start.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_unstartable_tool_falls_back_to_native() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("file"), vec![0u8; 10]).unwrap();

        let files = run_tool(
            &tmp.path().join("no-such-finder"),
            tmp.path(),
            None,
        );
        assert!(matches!(files, FileList::Native(_)));
        assert_eq!(names(files, tmp.path()), BTreeSet::from(["file".to_string()]));
    }

    #[test]
    fn test_native_files_prunes_hidden_and_ignored() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("target").join("debug")).unwrap();
        fs::write(root.join("src").join("main.rs"), "fn main() {}").unwrap();
        fs::write(root.join(".git").join("HEAD"), "ref").unwrap();
        fs::write(root.join(".env"), "A=1").unwrap();
        fs::write(root.join("target").join("debug").join("app"), "bin").unwrap();
        fs::write(root.join("notes.txt"), "hi").unwrap();

        let ignore_file = tmp.path().join("ignore");
        fs::write(&ignore_file, "target/\n").unwrap();

        let listed = names(NativeFiles::new(&root, Some(&ignore_file)), &root);
        let expected: BTreeSet<String> = ["notes.txt", "src/main.rs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(listed, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_native_files_skips_symlinks() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(tmp.path().join("outside"), vec![0u8; 64]).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("outside"), root.join("link")).unwrap();
        std::os::unix::fs::symlink(tmp.path(), root.join("loop")).unwrap();

        assert_eq!(NativeFiles::new(&root, None).count(), 0);
    }
}
