use human_activities_core::storage::Directory;
use human_activities_core::{DirectoryViews, ScanObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Spinner showing how many directories of the round are done.
pub struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

fn done_message(views: &DirectoryViews) -> String {
    let done = views.iter().filter(|(_, view)| !view.pending).count();
    format!("Scanning... {}/{} directories", done, views.len())
}

impl ScanObserver for CliObserver {
    fn on_round_started(&self, views: &DirectoryViews) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(done_message(views));
        pb.enable_steady_tick(std::time::Duration::from_millis(80));

        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.replace(pb) {
            old.finish_and_clear();
        }
    }

    fn on_directory_scanned(&self, _directory: &Directory, views: &DirectoryViews) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_message(done_message(views));
        }
    }

    fn on_round_finished(&self, _views: &DirectoryViews) {
        self.finish_bar();
    }
}
