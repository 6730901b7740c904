// LogRelay - app/monitor.rs
//
// Tail monitor: the control plane for live tailing of one file at a time.
//
// Architecture:
//   - `TailMonitor` owns the single source of truth for monitoring state
//     (`Idle` / `Monitoring(file)` / `Stopping` plus the stop latch) behind
//     one mutex. Every transition is a check-and-set under that lock.
//   - It is shared as `Arc<TailMonitor>` by the control API (start/stop from
//     request threads) and the watch dispatch thread (`on_change`).
//   - Reads go through the offset tracker and the incremental reader; each
//     new line is parsed and published through the `Broadcaster`.
//   - Offsets are seeded, removed and committed only while the state lock is
//     held. A chunk read concurrently with a stop or restart is dropped.
//
// Failure policy:
//   - `on_change` never returns an error: every per-event failure is a
//     `ChangeOutcome::Failed` value that the caller logs. No outcome changes
//     the monitoring state; only an explicit `stop` does.
//   - Truncated/rotated files (size < last offset) rewind the offset to 0;
//     the discarded tail is not replayed, only content written afterwards.
//
// Tail semantics: `start` seeds the offset with the file's current size, so
// history written before monitoring began is never delivered (`tail -f`).

use crate::app::broadcast::Broadcaster;
use crate::app::offsets::OffsetTracker;
use crate::app::reader;
use crate::core::model::TailEvent;
use crate::core::parser;
use crate::platform::fs as pfs;
use crate::util::error::TailError;
use crate::util::logging;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// State machine
// =============================================================================

/// Monitoring phase. Exactly one file may be active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Monitoring(String),
    /// Transitional: a stop has latched but not yet completed.
    Stopping,
}

#[derive(Debug)]
struct MonitorState {
    phase: Phase,
    /// Set by the first effective `stop`, cleared by `start`. Collapses
    /// duplicate or concurrent stops into one.
    stop_latched: bool,
}

/// Result of processing one change notification.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// Nothing is being monitored (idle or stopping).
    NotMonitoring,
    /// The change concerns a file other than the active one.
    OtherFile,
    /// The active file does not exist (yet).
    FileMissing,
    /// Size equals the last offset; nothing to read.
    Unchanged,
    /// The file shrank below the offset and has no new content since.
    Rewound,
    /// Monitoring was restarted while reading; the chunk was dropped.
    Superseded,
    /// New lines were published.
    Delivered {
        lines: usize,
        bytes_read: u64,
        /// The offset was rewound before reading.
        truncated: bool,
        /// The read hit the per-call ceiling; more remains for the next event.
        capped: bool,
    },
    /// A read failed; monitoring continues.
    Failed(TailError),
}

// =============================================================================
// TailMonitor
// =============================================================================

pub struct TailMonitor {
    log_root: PathBuf,
    enable_security: bool,
    state: Mutex<MonitorState>,
    offsets: OffsetTracker,
    broadcaster: Arc<dyn Broadcaster>,
}

impl TailMonitor {
    pub fn new(log_root: PathBuf, enable_security: bool, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            log_root,
            enable_security,
            state: Mutex::new(MonitorState {
                phase: Phase::Idle,
                stop_latched: false,
            }),
            offsets: OffsetTracker::new(),
            broadcaster,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state for committing a change to `file_name`, provided it is
    /// still the active file and its offset is still `stored`. Otherwise a
    /// stop or restart landed while the file was being read.
    fn lock_if_current(
        &self,
        file_name: &str,
        stored: u64,
    ) -> Result<MutexGuard<'_, MonitorState>, ChangeOutcome> {
        let state = self.lock_state();
        if !matches!(&state.phase, Phase::Monitoring(active) if active == file_name) {
            return Err(ChangeOutcome::NotMonitoring);
        }
        if self.offsets.get(file_name) != stored {
            return Err(ChangeOutcome::Superseded);
        }
        Ok(state)
    }

    fn emit(&self, event: TailEvent) -> TailEvent {
        self.broadcaster.publish(&event);
        event
    }

    pub fn log_root(&self) -> &Path {
        &self.log_root
    }

    /// Current phase snapshot.
    pub fn phase(&self) -> Phase {
        self.lock_state().phase.clone()
    }

    /// The file currently being monitored, if any.
    pub fn active_file(&self) -> Option<String> {
        match &self.lock_state().phase {
            Phase::Monitoring(name) => Some(name.clone()),
            _ => None,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        matches!(self.lock_state().phase, Phase::Monitoring(_))
    }

    /// True when monitoring is on and `file_name` is the active file.
    pub fn is_active_file(&self, file_name: &str) -> bool {
        matches!(&self.lock_state().phase, Phase::Monitoring(active) if active == file_name)
    }

    /// Offset tracker, exposed for inspection.
    pub fn offsets(&self) -> &OffsetTracker {
        &self.offsets
    }

    // -------------------------------------------------------------------------
    // Control operations
    // -------------------------------------------------------------------------

    /// Begin monitoring `file_name`, replacing any currently active file.
    ///
    /// The offset is seeded before the phase flips so the watch thread can
    /// never observe the new file with a stale offset. A file that does not
    /// exist yet starts at offset 0 and is picked up once created.
    pub fn start(&self, file_name: &str) -> TailEvent {
        if file_name.trim().is_empty() {
            tracing::warn!("Tail: start rejected, blank file name");
            return self.emit(TailEvent::Error {
                message: "File name must not be blank".to_string(),
            });
        }
        if self.enable_security && !pfs::is_safe_file_name(file_name) {
            tracing::warn!(file = file_name, "Tail: start rejected, illegal file name");
            return self.emit(TailEvent::Error {
                message: format!("Illegal file name: {file_name}"),
            });
        }

        let path = self.log_root.join(file_name);
        let initial = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let previous = {
            let mut state = self.lock_state();
            self.offsets.set(file_name, initial);
            state.stop_latched = false;
            std::mem::replace(&mut state.phase, Phase::Monitoring(file_name.to_string()))
        };

        if let Phase::Monitoring(prev) = &previous {
            if prev != file_name {
                tracing::info!(previous = %prev, next = file_name, "Tail: switching monitored file");
            }
        }
        tracing::info!(file = %path.display(), offset = initial, "Tail: monitoring started");

        self.emit(TailEvent::MonitoringStarted {
            file_name: file_name.to_string(),
            message: format!("Monitoring started: {file_name}"),
        })
    }

    /// Stop monitoring. Only the first call after a `start` (or the first call
    /// ever) is effective and yields `MonitoringStopped`; every other call
    /// yields `MonitoringAlreadyStopped` without side effects.
    pub fn stop(&self) -> TailEvent {
        let previous = {
            let mut state = self.lock_state();
            if state.stop_latched {
                None
            } else {
                state.stop_latched = true;
                let previous = std::mem::replace(&mut state.phase, Phase::Stopping);
                if let Phase::Monitoring(name) = &previous {
                    self.offsets.remove(name);
                }
                Some(previous)
            }
        };

        let Some(previous) = previous else {
            tracing::debug!("Tail: stop ignored, already stopped");
            return self.emit(TailEvent::MonitoringAlreadyStopped {
                message: "Monitoring is already stopped".to_string(),
            });
        };

        {
            // A `start` racing this stop may already have claimed the slot;
            // only finish the transition if it has not.
            let mut state = self.lock_state();
            if state.phase == Phase::Stopping {
                state.phase = Phase::Idle;
            }
        }

        tracing::info!(previous = ?previous, "Tail: monitoring stopped");
        self.emit(TailEvent::MonitoringStopped {
            message: "Monitoring stopped".to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Change processing
    // -------------------------------------------------------------------------

    /// Process a change notification for `file_name`.
    pub fn on_change(&self, file_name: &str) -> ChangeOutcome {
        match self.active_file() {
            None => return ChangeOutcome::NotMonitoring,
            Some(active) if active != file_name => return ChangeOutcome::OtherFile,
            Some(_) => {}
        }

        let path = self.log_root.join(file_name);
        let current_size = match std::fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ChangeOutcome::FileMissing,
            Err(e) => return ChangeOutcome::Failed(TailError::Stat { path, source: e }),
        };

        let stored = self.offsets.get(file_name);
        let truncated = current_size < stored;
        let offset = if truncated {
            tracing::info!(
                file = %path.display(),
                old_offset = stored,
                new_size = current_size,
                "Tail: file truncated or rotated, resetting offset to 0"
            );
            0
        } else {
            stored
        };

        if current_size <= offset {
            if !truncated {
                return ChangeOutcome::Unchanged;
            }
            let _state = match self.lock_if_current(file_name, stored) {
                Ok(guard) => guard,
                Err(outcome) => return outcome,
            };
            self.offsets.reset(file_name);
            return ChangeOutcome::Rewound;
        }

        let chunk = match reader::read_new(&path, offset, current_size) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return ChangeOutcome::Unchanged,
            Err(e) => return ChangeOutcome::Failed(TailError::Read { path, source: e }),
        };

        // Publishing and the offset update happen under the state lock, so a
        // `stop` is either fully before this chunk or fully after it.
        let _state = match self.lock_if_current(file_name, stored) {
            Ok(guard) => guard,
            Err(outcome) => return outcome,
        };

        let mut lines = 0usize;
        for raw in parser::split_lines(&chunk.text) {
            tracing::trace!(file = file_name, line = logging::preview(raw), "Tail: new line");
            self.broadcaster.publish(&TailEvent::NewLogLine {
                file_name: file_name.to_string(),
                line: parser::parse_line(raw),
            });
            lines += 1;
        }

        self.offsets.set(file_name, offset + chunk.bytes_consumed);

        ChangeOutcome::Delivered {
            lines,
            bytes_read: chunk.bytes_consumed,
            truncated,
            capped: chunk.capped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::broadcast::ChannelBroadcaster;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::sync::mpsc;

    struct Fixture {
        dir: tempfile::TempDir,
        monitor: Arc<TailMonitor>,
        rx: mpsc::Receiver<TailEvent>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = Arc::new(ChannelBroadcaster::new());
        let rx = broadcaster.subscribe();
        let monitor = Arc::new(TailMonitor::new(dir.path().to_path_buf(), true, broadcaster));
        Fixture { dir, monitor, rx }
    }

    fn append(path: &Path, text: &str) {
        let mut f = OpenOptions::new().create(true).append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    fn drain(rx: &mpsc::Receiver<TailEvent>) -> Vec<TailEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_start_seeds_offset_at_current_size() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "history line\n").unwrap();

        let event = fx.monitor.start("app.log");
        assert_eq!(event.type_name(), "monitoring_started");
        assert_eq!(fx.monitor.offsets().get("app.log"), 13);
        assert_eq!(fx.monitor.phase(), Phase::Monitoring("app.log".to_string()));
        assert_eq!(drain(&fx.rx), vec![event]);
    }

    #[test]
    fn test_start_rejects_blank_and_traversal() {
        let fx = fixture();
        assert_eq!(fx.monitor.start("  ").type_name(), "error");
        assert_eq!(fx.monitor.start("../etc/passwd").type_name(), "error");
        assert_eq!(fx.monitor.start("a\\b.log").type_name(), "error");
        assert_eq!(fx.monitor.phase(), Phase::Idle);
    }

    #[test]
    fn test_tail_delivers_only_new_lines_in_order() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "2024-01-01 00:00:00.000 INFO old\n").unwrap();
        fx.monitor.start("app.log");
        drain(&fx.rx);

        append(&path, "2024-01-01 00:00:01.000 INFO one\n\nplain two\r\n");
        let outcome = fx.monitor.on_change("app.log");
        assert!(matches!(outcome, ChangeOutcome::Delivered { lines: 2, .. }));

        let events = drain(&fx.rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            TailEvent::NewLogLine { file_name, line } => {
                assert_eq!(file_name, "app.log");
                assert_eq!(line.message(), Some("one"));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &events[1] {
            TailEvent::NewLogLine { line, .. } => assert_eq!(line.raw(), "plain two"),
            other => panic!("unexpected {other:?}"),
        }

        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(fx.monitor.offsets().get("app.log"), len);
        assert!(matches!(fx.monitor.on_change("app.log"), ChangeOutcome::Unchanged));
    }

    #[test]
    fn test_truncation_resets_offset_before_read() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "x".repeat(100)).unwrap();
        fx.monitor.start("app.log");
        fx.monitor.offsets().set("app.log", 500);
        drain(&fx.rx);

        let outcome = fx.monitor.on_change("app.log");
        match outcome {
            ChangeOutcome::Delivered {
                truncated,
                bytes_read,
                ..
            } => {
                assert!(truncated);
                assert_eq!(bytes_read, 100);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fx.monitor.offsets().get("app.log"), 100);
    }

    #[test]
    fn test_truncation_to_empty_rewinds() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "some content\n").unwrap();
        fx.monitor.start("app.log");
        fs::write(&path, "").unwrap();

        assert!(matches!(fx.monitor.on_change("app.log"), ChangeOutcome::Rewound));
        assert_eq!(fx.monitor.offsets().get("app.log"), 0);
        assert!(fx.monitor.is_monitoring());
    }

    #[test]
    fn test_on_change_ignored_when_idle_or_other_file() {
        let fx = fixture();
        assert!(matches!(fx.monitor.on_change("app.log"), ChangeOutcome::NotMonitoring));
        fx.monitor.start("app.log");
        assert!(matches!(fx.monitor.on_change("other.log"), ChangeOutcome::OtherFile));
    }

    #[test]
    fn test_missing_file_then_created() {
        let fx = fixture();
        fx.monitor.start("later.log");
        assert_eq!(fx.monitor.offsets().get("later.log"), 0);
        assert!(matches!(fx.monitor.on_change("later.log"), ChangeOutcome::FileMissing));

        fs::write(fx.dir.path().join("later.log"), "first\n").unwrap();
        assert!(matches!(
            fx.monitor.on_change("later.log"),
            ChangeOutcome::Delivered { lines: 1, .. }
        ));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let fx = fixture();
        fx.monitor.start("app.log");
        drain(&fx.rx);

        let first = fx.monitor.stop();
        let second = fx.monitor.stop();
        assert_eq!(first.type_name(), "monitoring_stopped");
        assert_eq!(second.type_name(), "monitoring_already_stopped");
        assert_eq!(fx.monitor.phase(), Phase::Idle);
        assert!(!fx.monitor.offsets().contains("app.log"));

        let types: Vec<_> = drain(&fx.rx).iter().map(TailEvent::type_name).collect();
        assert_eq!(types, vec!["monitoring_stopped", "monitoring_already_stopped"]);
    }

    #[test]
    fn test_start_after_stop_rearms_latch() {
        let fx = fixture();
        fx.monitor.start("a.log");
        fx.monitor.stop();
        fx.monitor.start("b.log");
        assert_eq!(fx.monitor.stop().type_name(), "monitoring_stopped");
    }

    #[test]
    fn test_start_switches_active_file_without_stop() {
        let fx = fixture();
        fx.monitor.start("a.log");
        fx.monitor.start("b.log");
        assert_eq!(fx.monitor.active_file().as_deref(), Some("b.log"));
        assert!(matches!(fx.monitor.on_change("a.log"), ChangeOutcome::OtherFile));
    }

    #[test]
    fn test_concurrent_stops_collapse_to_one() {
        let fx = fixture();
        fx.monitor.start("app.log");
        drain(&fx.rx);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let monitor = Arc::clone(&fx.monitor);
                std::thread::spawn(move || monitor.stop())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stopped = results
            .iter()
            .filter(|e| e.type_name() == "monitoring_stopped")
            .count();
        assert_eq!(stopped, 1);
        assert_eq!(results.len() - stopped, 15);
    }

    #[test]
    fn test_read_failure_keeps_monitoring() {
        let fx = fixture();
        // A directory with the monitored name: stat succeeds, open/read fails.
        let path = fx.dir.path().join("app.log");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), "x".repeat(64)).unwrap();
        fx.monitor.start("app.log");
        fx.monitor.offsets().set("app.log", 0);

        let outcome = fx.monitor.on_change("app.log");
        // Directory sizes are filesystem-specific; either nothing to read or a
        // failed read is acceptable, but never a state change.
        assert!(matches!(
            outcome,
            ChangeOutcome::Failed(_) | ChangeOutcome::Unchanged
        ));
        assert!(fx.monitor.is_monitoring());
    }

    #[test]
    fn test_capped_reads_resume_until_caught_up() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "").unwrap();
        fx.monitor.start("app.log");
        drain(&fx.rx);

        let total = 60_000usize;
        let body: String = (0..total)
            .map(|i| format!("2024-01-01 00:00:00.000 INFO entry {i:06} padding\n"))
            .collect();
        append(&path, &body);
        let size = fs::metadata(&path).unwrap().len();
        assert!(size > 2 * crate::util::constants::MAX_TAIL_READ_BYTES);

        let mut capped_flags = Vec::new();
        loop {
            match fx.monitor.on_change("app.log") {
                ChangeOutcome::Delivered {
                    capped, bytes_read, ..
                } => {
                    assert!(bytes_read <= crate::util::constants::MAX_TAIL_READ_BYTES);
                    capped_flags.push(capped);
                }
                ChangeOutcome::Unchanged => break,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(capped_flags, vec![true, true, false]);
        assert_eq!(fx.monitor.offsets().get("app.log"), size);

        let messages: Vec<String> = drain(&fx.rx)
            .into_iter()
            .filter_map(|e| match e {
                TailEvent::NewLogLine { line, .. } => line.message().map(str::to_string),
                _ => None,
            })
            .collect();
        assert_eq!(messages.len(), total);
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message, &format!("entry {i:06} padding"));
        }
    }

    #[test]
    fn test_monitoring_always_has_seeded_offset_under_start_stop_race() {
        let fx = fixture();
        let path = fx.dir.path().join("app.log");
        fs::write(&path, "history\n".repeat(100)).unwrap();
        let size = fs::metadata(&path).unwrap().len();

        for _ in 0..200 {
            fx.monitor.start("app.log");
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let stopper = {
                let monitor = Arc::clone(&fx.monitor);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    monitor.stop();
                })
            };
            let starter = {
                let monitor = Arc::clone(&fx.monitor);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    monitor.start("app.log");
                })
            };
            stopper.join().unwrap();
            starter.join().unwrap();

            if fx.monitor.is_active_file("app.log") {
                assert_eq!(fx.monitor.offsets().get("app.log"), size);
                assert!(matches!(
                    fx.monitor.on_change("app.log"),
                    ChangeOutcome::Unchanged
                ));
            }
        }
    }

    #[test]
    fn test_stale_chunk_is_not_committed() {
        let fx = fixture();
        fx.monitor.start("app.log");
        fx.monitor.offsets().set("app.log", 40);

        assert!(matches!(
            fx.monitor.lock_if_current("app.log", 10),
            Err(ChangeOutcome::Superseded)
        ));
        assert!(fx.monitor.lock_if_current("app.log", 40).is_ok());
        assert!(matches!(
            fx.monitor.lock_if_current("other.log", 40),
            Err(ChangeOutcome::NotMonitoring)
        ));
    }

    #[test]
    fn test_no_lines_published_after_stopped_event() {
        for _ in 0..20 {
            let fx = fixture();
            let path = fx.dir.path().join("app.log");
            fs::write(&path, "").unwrap();
            fx.monitor.start("app.log");
            append(&path, &"line\n".repeat(50_000));

            let reader = {
                let monitor = Arc::clone(&fx.monitor);
                std::thread::spawn(move || loop {
                    match monitor.on_change("app.log") {
                        ChangeOutcome::Delivered { .. } => continue,
                        _ => break,
                    }
                })
            };
            fx.monitor.stop();
            reader.join().unwrap();

            let types: Vec<_> = drain(&fx.rx).iter().map(TailEvent::type_name).collect();
            let stopped_at = types
                .iter()
                .position(|t| *t == "monitoring_stopped")
                .unwrap();
            assert!(types[stopped_at..].iter().all(|t| *t != "new_log_line"));
        }
    }
}
