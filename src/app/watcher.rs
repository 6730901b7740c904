// LogRelay - app/watcher.rs
//
// Change watcher: turns filesystem notifications on the log root into
// change-processing calls on the tail monitor.
//
// Architecture:
//   - A `notify` subscription (non-recursive, on the log root directory)
//     translates each backend event into `FileChange` values and sends them
//     over an mpsc channel. Only create and modify kinds are forwarded;
//     overflow/rescan notices are dropped because the byte-offset comparison
//     in `TailMonitor::on_change` makes a missed notification self-healing.
//   - One background thread runs `run_dispatch_loop`, blocking on the channel
//     and calling `TailMonitor::on_change` synchronously. The next change is
//     not received until the previous one is fully processed, so slow reads
//     throttle event consumption.
//   - Shutdown drops the `notify` watcher, which drops the channel sender;
//     the dispatch loop sees the disconnect and exits cleanly. There is no
//     timeout on the blocking wait.
//
// Failure policy:
//   - Backend errors are logged and the loop continues.
//   - Per-change outcomes are logged by kind; none of them ends the loop.
//   - Failing to establish the subscription returns `WatchError`; the caller
//     logs it and carries on without live tailing.

use crate::app::monitor::{ChangeOutcome, TailMonitor};
use crate::util::error::WatchError;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

// =============================================================================
// Change events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
}

/// A relevant change to a file directly under the log root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Basename of the changed file.
    pub file_name: String,
    pub kind: ChangeKind,
}

/// Translate one `notify` event into the changes the monitor cares about.
pub fn translate_event(event: &Event) -> Vec<FileChange> {
    if event.need_rescan() {
        tracing::debug!("Watch: overflow/rescan notice dropped");
        return Vec::new();
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .map(|name| FileChange {
            file_name: name.to_string(),
            kind,
        })
        .collect()
}

// =============================================================================
// Dispatch loop
// =============================================================================

/// Counters reported when the dispatch loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Changes received from the channel.
    pub received: u64,
    /// Changes for the active file that were handed to the monitor.
    pub dispatched: u64,
    /// Dispatched changes whose processing failed.
    pub failures: u64,
}

/// Drain `rx` until every sender is gone, dispatching changes for the active
/// file into `monitor`.
///
/// Exposed so tests (and alternative event sources) can feed synthetic
/// changes without a real filesystem subscription.
pub fn run_dispatch_loop(rx: mpsc::Receiver<FileChange>, monitor: Arc<TailMonitor>) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    tracing::debug!(root = %monitor.log_root().display(), "Watch: dispatch loop running");

    while let Ok(change) = rx.recv() {
        summary.received += 1;

        if !monitor.is_active_file(&change.file_name) {
            continue;
        }
        summary.dispatched += 1;

        let outcome = monitor.on_change(&change.file_name);
        if matches!(outcome, ChangeOutcome::Failed(_)) {
            summary.failures += 1;
        }
        log_outcome(&change, &outcome);
    }

    tracing::debug!(
        received = summary.received,
        dispatched = summary.dispatched,
        failures = summary.failures,
        "Watch: event channel closed, dispatch loop exiting"
    );
    summary
}

fn log_outcome(change: &FileChange, outcome: &ChangeOutcome) {
    let file = change.file_name.as_str();
    match outcome {
        ChangeOutcome::Delivered {
            lines,
            bytes_read,
            truncated,
            capped,
        } => tracing::debug!(
            file,
            kind = ?change.kind,
            lines,
            bytes_read,
            truncated,
            capped,
            "Watch: new content delivered"
        ),
        ChangeOutcome::Failed(e) => {
            tracing::warn!(file, kind = ?change.kind, error = %e, "Watch: change processing failed")
        }
        ChangeOutcome::Rewound => tracing::debug!(file, "Watch: file truncated, nothing new yet"),
        other => tracing::trace!(file, outcome = ?other, "Watch: change ignored"),
    }
}

// =============================================================================
// ChangeWatcher
// =============================================================================

/// Owns the `notify` subscription and the dispatch thread for the lifetime
/// of the process. Dropping it (or calling `shutdown`) releases both exactly
/// once.
pub struct ChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    handle: Option<JoinHandle<DispatchSummary>>,
}

impl ChangeWatcher {
    /// Subscribe to create/modify events under `log_root` and start the
    /// dispatch thread feeding `monitor`.
    pub fn spawn(log_root: &Path, monitor: Arc<TailMonitor>) -> Result<Self, WatchError> {
        if !log_root.is_dir() {
            return Err(WatchError::RootNotFound {
                path: log_root.to_path_buf(),
            });
        }

        let (tx, rx) = mpsc::channel::<FileChange>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in translate_event(&event) {
                    // Receiver gone means shutdown is in progress.
                    if tx.send(change).is_err() {
                        return;
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Watch: backend error"),
        })
        .map_err(|e| WatchError::Subscribe {
            path: log_root.to_path_buf(),
            source: e,
        })?;

        watcher
            .watch(log_root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Subscribe {
                path: log_root.to_path_buf(),
                source: e,
            })?;

        let handle = std::thread::Builder::new()
            .name("logrelay-watch".to_string())
            .spawn(move || run_dispatch_loop(rx, monitor))
            .map_err(|e| WatchError::Spawn { source: e })?;

        tracing::info!(root = %log_root.display(), "Watch: log directory subscription started");

        Ok(Self {
            watcher: Some(watcher),
            handle: Some(handle),
        })
    }

    /// Whether the dispatch thread is still owned by this watcher.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Close the subscription and wait for the dispatch loop to exit.
    /// Subsequent calls are no-ops.
    pub fn shutdown(&mut self) -> Option<DispatchSummary> {
        // Dropping the watcher drops the channel sender held by its handler.
        drop(self.watcher.take());

        let handle = self.handle.take()?;
        match handle.join() {
            Ok(summary) => {
                tracing::info!(received = summary.received, "Watch: stopped");
                Some(summary)
            }
            Err(_) => {
                tracing::error!("Watch: dispatch thread panicked");
                None
            }
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
