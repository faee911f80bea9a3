use crate::storage::Directory;
use crate::views::DirectoryViews;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Events a front-end subscribes to.
///
/// Called from the thread driving the scan round, never from workers.
/// All methods have default no-op implementations.
pub trait ScanObserver: Send + Sync {
    /// Every target is pending; values are whatever the cache already held.
    fn on_round_started(&self, _views: &DirectoryViews) {}
    fn on_directory_scanned(&self, _directory: &Directory, _views: &DirectoryViews) {}
    fn on_round_finished(&self, _views: &DirectoryViews) {}
    /// The scan loop ended, on its own or through `Scheduler::stop`, and
    /// publishes nothing more until it is started again.
    fn on_stopped(&self) {}
}

/// No-op observer for silent operation.
pub struct SilentObserver;

impl ScanObserver for SilentObserver {}

/// Observer that hands a full snapshot of the views to a consumer thread on
/// every event. The consumer sees every snapshot in order.
pub struct SnapshotQueue {
    tx: Sender<Option<DirectoryViews>>,
}

pub struct SnapshotReceiver {
    rx: Receiver<Option<DirectoryViews>>,
}

pub fn snapshot_queue() -> (SnapshotQueue, SnapshotReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (SnapshotQueue { tx }, SnapshotReceiver { rx })
}

impl SnapshotQueue {
    pub fn push(&self, views: &DirectoryViews) {
        let _ = self.tx.send(Some(views.snapshot()));
    }

    /// Wakes a consumer blocked in `recv` so it can shut down.
    pub fn close(&self) {
        let _ = self.tx.send(None);
    }
}

impl ScanObserver for SnapshotQueue {
    fn on_round_started(&self, views: &DirectoryViews) {
        self.push(views);
    }

    fn on_directory_scanned(&self, _directory: &Directory, views: &DirectoryViews) {
        self.push(views);
    }

    fn on_round_finished(&self, views: &DirectoryViews) {
        self.push(views);
    }

    fn on_stopped(&self) {
        self.close();
    }
}

impl SnapshotReceiver {
    /// Next snapshot, or `None` once the queue was closed or dropped.
    pub fn recv(&self) -> Option<DirectoryViews> {
        self.rx.recv().ok().flatten()
    }

    /// Like `recv`; a closed queue reports `Disconnected`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DirectoryViews, RecvTimeoutError> {
        self.rx
            .recv_timeout(timeout)?
            .ok_or(RecvTimeoutError::Disconnected)
    }

    pub fn iter(&self) -> impl Iterator<Item = DirectoryViews> + '_ {
        std::iter::from_fn(move || self.recv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Target, Unit};
    use std::thread;

    #[test]
    fn test_consumer_sees_every_snapshot_then_stops() {
        let (queue, receiver) = snapshot_queue();
        let mut views = DirectoryViews::new(Unit::SizeBytes, 0);
        let consumer = thread::spawn(move || receiver.iter().map(|v| v.len()).collect::<Vec<_>>());

        queue.on_round_started(&views);
        views.reset(
            &[Target {
                path: "/a".to_string(),
                label: "A".to_string(),
            }],
            Unit::SizeBytes,
            0,
        );
        queue.on_round_finished(&views);
        queue.push(&views);
        queue.close();

        assert_eq!(consumer.join().unwrap(), vec![0, 1, 1]);
    }

    #[test]
    fn test_recv_timeout_after_close() {
        let (queue, receiver) = snapshot_queue();
        queue.close();
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Disconnected
        );
    }

    #[test]
    fn test_stopping_unblocks_the_consumer() {
        let (queue, receiver) = snapshot_queue();
        let consumer = thread::spawn(move || receiver.iter().count());
        queue.on_round_finished(&DirectoryViews::new(Unit::SizeBytes, 0));
        queue.on_stopped();
        assert_eq!(consumer.join().unwrap(), 1);
    }

    #[test]
    fn test_recv_timeout_without_events() {
        let (_queue, receiver) = snapshot_queue();
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Timeout
        );
    }
}
