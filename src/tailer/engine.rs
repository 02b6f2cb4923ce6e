// SPDX-License-Identifier: Apache-2.0

//! The tail engine: reacts to file change notifications, drives incremental
//! reads, and dispatches keyword matches to the alert channel.
//!
//! All per-file state is owned by the engine and mutated only through
//! [`TailEngine::on_change`], which the driver loop calls from a single
//! dedicated thread. This serializes access to every cursor without locks:
//! two reads can never race on the same offset.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bounded_channel::BoundedSender;
use crate::matcher::match_line;
use crate::notifiers::Alert;
use crate::tailer::{FileCursor, TailConfig};
use crate::watcher::FileWatcher;

/// How long a single wait for watcher events may block before the engine
/// re-checks for cancellation. Bounds shutdown latency.
const EVENT_WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// Engine lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    Stopped,
}

/// TailEngine owns the cursor table for all watched files.
pub struct TailEngine {
    /// Keywords in priority order
    keywords: Vec<String>,
    /// Words copied into outgoing messages
    word_limit: usize,
    /// The configured paths; change events for other paths are ignored
    watched: HashSet<PathBuf>,
    /// Cursor per watched file, created on its first change notification
    cursors: HashMap<PathBuf, FileCursor>,
    /// Hand-off channel to the alert dispatcher
    alerts_tx: BoundedSender<Alert>,
    state: EngineState,
}

impl TailEngine {
    /// Create an engine for the given configuration. The configuration is
    /// assumed to be validated; the engine performs no checks of its own.
    pub fn new(config: &TailConfig, alerts_tx: BoundedSender<Alert>) -> Self {
        Self {
            keywords: config.keywords.clone(),
            word_limit: config.word_limit,
            watched: config.files.iter().cloned().collect(),
            cursors: HashMap::new(),
            alerts_tx,
            state: EngineState::Created,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Handle a change notification for a path.
    ///
    /// Consumes all bytes newly available on the file, passes every complete
    /// line through keyword matching, and enqueues one alert per match.
    /// Idempotent under duplicate or spurious notifications: with no new
    /// bytes nothing is dispatched. Notifications for paths outside the
    /// configured set are ignored.
    pub fn on_change(&mut self, path: &Path) {
        if self.state == EngineState::Stopped {
            debug!(file = ?path, "change notification after stop, ignoring");
            return;
        }

        if !self.watched.contains(path) {
            return;
        }

        if self.state == EngineState::Created {
            self.state = EngineState::Running;
        }

        let cursor = self
            .cursors
            .entry(path.to_path_buf())
            .or_insert_with(|| FileCursor::new(path));

        let lines = match cursor.consume_new_bytes() {
            Ok(lines) => lines,
            Err(e) => {
                // Transient by policy: keep the entry and retry the open on
                // the next notification for this path.
                warn!(file = ?path, error = %e, "file unavailable, will retry");
                return;
            }
        };

        for line in lines {
            let Some(m) = match_line(&line, &self.keywords, self.word_limit) else {
                continue;
            };

            debug!(file = ?path, keyword = m.keyword, line = %line, "keyword matched");

            let alert = Alert {
                source: path.to_path_buf(),
                keyword: m.keyword.to_string(),
                message: m.message,
            };

            if self.alerts_tx.send_blocking(alert).is_err() {
                // Dispatcher is gone; only happens during shutdown
                debug!("alert channel closed, dropping match");
                return;
            }
        }
    }

    /// Release all file handles and refuse further work. Terminal; safe to
    /// call more than once.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.cursors.clear();
        self.state = EngineState::Stopped;
        info!("tail engine stopped");
    }

    /// Drive the engine from a watcher until cancellation.
    ///
    /// Runs on a dedicated OS thread: waits for watcher events with a
    /// bounded timeout so the cancellation token is observed promptly, and
    /// feeds every event path through [`TailEngine::on_change`].
    pub fn run(mut self, mut watcher: Box<dyn FileWatcher + Send>, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                debug!("cancellation received, stopping tail engine");
                break;
            }

            match watcher.recv_timeout(EVENT_WAIT_INTERVAL) {
                Ok(events) => {
                    for event in events {
                        for path in &event.paths {
                            self.on_change(path);
                        }
                    }
                }
                // TODO: swap in a PollWatcher when native watcher errors persist
                Err(e) => {
                    warn!(error = %e, "watcher error");
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }

        self.stop();
    }
}
