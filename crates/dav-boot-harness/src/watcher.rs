//! Polling watcher for the guest debug log.
//!
//! The emulator owns the log file and writes it without coordinating with us, so every poll
//! re-reads the whole file from scratch and never keeps a handle or offset around. Anything that
//! goes wrong while reading (file not created yet, torn write, invalid UTF-8) just counts as "not
//! matched yet".

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Result of a single [`LogWatcher::wait_for`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOutcome {
    pub found: bool,
    pub elapsed: Duration,
}

impl WaitOutcome {
    pub fn is_found(&self) -> bool {
        self.found
    }
}

#[derive(Debug, Clone)]
pub struct LogWatcher {
    path: PathBuf,
    poll_interval: Duration,
}

impl LogWatcher {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until the log contains `target` or `timeout` has elapsed.
    ///
    /// The log is checked once more at the deadline, so a timeout is reported no later than one
    /// poll interval after `timeout`.
    pub fn wait_for(&self, target: &str, timeout: Duration) -> WaitOutcome {
        let start = Instant::now();
        // `None` when the timeout is too large to represent; such a wait only ends on a match.
        let deadline = start.checked_add(timeout);

        loop {
            if self.contains(target) {
                let elapsed = start.elapsed();
                debug!(marker = target, ?elapsed, "marker found in debug log");
                return WaitOutcome {
                    found: true,
                    elapsed,
                };
            }

            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(now),
                None => self.poll_interval,
            };
            if deadline.is_some() && remaining.is_zero() {
                let elapsed = start.elapsed();
                debug!(marker = target, ?elapsed, "timed out waiting for marker");
                return WaitOutcome {
                    found: false,
                    elapsed,
                };
            }

            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }

    fn contains(&self, target: &str) -> bool {
        match std::fs::read(&self.path) {
            Ok(contents) => String::from_utf8_lossy(&contents).contains(target),
            Err(err) => {
                trace!(path = %self.path.display(), %err, "debug log not readable yet");
                false
            }
        }
    }

    /// Last `max_bytes` of the log, lossily decoded. `None` if the log can't be read.
    pub fn snapshot_tail(&self, max_bytes: usize) -> Option<String> {
        let contents = std::fs::read(&self.path).ok()?;
        let start = contents.len().saturating_sub(max_bytes);
        Some(String::from_utf8_lossy(&contents[start..]).into_owned())
    }
}
