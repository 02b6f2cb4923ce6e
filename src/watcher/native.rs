// SPDX-License-Identifier: Apache-2.0

//! Native file change watcher using the `notify` crate.
//!
//! Uses OS-level file system notifications:
//! - Linux: inotify
//! - macOS: FSEvents
//! - Windows: ReadDirectoryChangesW
//!
//! Watched files are registered through their parent directory so that
//! rotation (remove + recreate) of a watched file is still observed.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::traits::{FileEvent, FileEventKind, FileWatcher, WatcherError};

/// Native file change watcher using OS-level notifications.
pub struct NativeWatcher {
    watcher: RecommendedWatcher,
    receiver: Mutex<Receiver<Result<Event, notify::Error>>>,
    /// Directories already registered with the OS watcher
    watched_dirs: Vec<PathBuf>,
}

impl NativeWatcher {
    /// Create a new native watcher with the specified debounce interval.
    pub fn new(debounce: Duration) -> Result<Self, WatcherError> {
        let (tx, rx) = channel();

        let config = Config::default().with_poll_interval(debounce);

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            config,
        )
        .map_err(|e| WatcherError::Init(e.to_string()))?;

        Ok(Self {
            watcher,
            receiver: Mutex::new(rx),
            watched_dirs: Vec::new(),
        })
    }

    /// Convert a notify event to our FileEvent type
    fn convert_event(event: Event) -> Option<FileEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => FileEventKind::Create,
            EventKind::Modify(_) => FileEventKind::Modify,
            EventKind::Remove(_) => FileEventKind::Remove,
            EventKind::Access(_) => return None, // Ignore access events
            EventKind::Other => FileEventKind::Other,
            EventKind::Any => FileEventKind::Other,
        };

        if event.paths.is_empty() {
            return None;
        }

        Some(FileEvent::new(kind, event.paths))
    }
}

impl FileWatcher for NativeWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        // Watch the parent directory rather than the file itself; inotify
        // watches on a file are lost when the file is replaced.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        if self.watched_dirs.contains(&dir) {
            return Ok(());
        }

        self.watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::Watch(e.to_string()))?;
        self.watched_dirs.push(dir);

        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        let mut events = Vec::new();

        let receiver = self
            .receiver
            .lock()
            .map_err(|e| WatcherError::Channel(format!("mutex poisoned: {}", e)))?;

        // First wait for at least one event with timeout
        match receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                if let Some(file_event) = Self::convert_event(event) {
                    events.push(file_event);
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("File watcher error: {}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                return Ok(events);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(WatcherError::Channel("watcher channel disconnected".into()));
            }
        }

        // Drop the lock before calling try_recv again
        drop(receiver);

        // Then drain any additional pending events
        events.extend(self.try_recv()?);

        Ok(events)
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        let mut events = Vec::new();

        let receiver = self
            .receiver
            .lock()
            .map_err(|e| WatcherError::Channel(format!("mutex poisoned: {}", e)))?;

        loop {
            match receiver.try_recv() {
                Ok(Ok(event)) => {
                    if let Some(file_event) = Self::convert_event(event) {
                        events.push(file_event);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!("File watcher error: {}", e);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(WatcherError::Channel("watcher channel disconnected".into()));
                }
            }
        }

        Ok(events)
    }

    fn is_native(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "linux")]
        {
            "inotify"
        }
        #[cfg(target_os = "macos")]
        {
            "FSEvents"
        }
        #[cfg(target_os = "windows")]
        {
            "ReadDirectoryChangesW"
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            "native"
        }
    }
}
