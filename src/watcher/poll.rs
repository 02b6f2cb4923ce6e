// SPDX-License-Identifier: Apache-2.0

//! Polling-based file watcher as a fallback for systems where native
//! file system notifications are unavailable or unreliable (e.g., NFS).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::traits::{FileEvent, FileWatcher, WatcherError};

/// File metadata for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    /// Last modification time
    modified: SystemTime,
    /// File size in bytes
    size: u64,
}

impl FileState {
    fn from_metadata(metadata: &fs::Metadata) -> Option<Self> {
        Some(Self {
            modified: metadata.modified().ok()?,
            size: metadata.len(),
        })
    }
}

/// Polling-based file watcher.
///
/// Periodically stats every registered file to detect appends, truncation,
/// creation, and removal. A file that is missing at registration time is not
/// an error; a create event is emitted once it appears.
pub struct PollWatcher {
    /// Files being watched
    watched_files: Vec<PathBuf>,
    /// Known file states from last poll; absent key means the file was not
    /// present at the last poll
    file_states: HashMap<PathBuf, FileState>,
    /// Poll interval
    poll_interval: Duration,
    /// Last poll time
    last_poll: Instant,
    /// Pending events from last poll
    pending_events: Vec<FileEvent>,
}

impl PollWatcher {
    /// Create a new poll watcher for the given files.
    pub fn new(files: &[&Path], poll_interval: Duration) -> Result<Self, WatcherError> {
        let watched_files: Vec<PathBuf> = files.iter().map(|p| p.to_path_buf()).collect();

        let mut watcher = Self {
            watched_files,
            file_states: HashMap::new(),
            poll_interval,
            // Ensure first poll runs immediately
            last_poll: Instant::now() - poll_interval,
            pending_events: Vec::new(),
        };

        // Initial scan to populate file states; events from this scan report
        // files that already exist so the consumer can start tracking them.
        watcher.scan_all();

        Ok(watcher)
    }

    /// Stat every watched file and record change events
    fn scan_all(&mut self) {
        let mut events = Vec::new();

        for path in &self.watched_files {
            let new_state = fs::metadata(path)
                .ok()
                .filter(|m| m.is_file())
                .and_then(|m| FileState::from_metadata(&m));

            let old_state = self.file_states.get(path).cloned();
            match (old_state, new_state) {
                (None, Some(state)) => {
                    events.push(FileEvent::create(path.clone()));
                    self.file_states.insert(path.clone(), state);
                }
                (Some(old), Some(state)) => {
                    if old != state {
                        events.push(FileEvent::modify(path.clone()));
                        self.file_states.insert(path.clone(), state);
                    }
                }
                (Some(_), None) => {
                    events.push(FileEvent::remove(path.clone()));
                    self.file_states.remove(path);
                }
                (None, None) => {}
            }
        }

        self.pending_events.extend(events);
        self.last_poll = Instant::now();
    }

    /// Check if a poll is due
    fn should_poll(&self) -> bool {
        self.last_poll.elapsed() >= self.poll_interval
    }

    /// Perform a poll if due
    fn poll_if_needed(&mut self) {
        if self.should_poll() {
            self.scan_all();
        }
    }
}

impl FileWatcher for PollWatcher {
    fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        let path = path.to_path_buf();

        if !self.watched_files.contains(&path) {
            self.watched_files.push(path);
        }

        // Rescan to pick up the new file
        self.scan_all();
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Vec<FileEvent>, WatcherError> {
        let deadline = Instant::now() + timeout;

        loop {
            self.poll_if_needed();

            if !self.pending_events.is_empty() {
                return Ok(std::mem::take(&mut self.pending_events));
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            // Sleep until next poll or timeout, whichever is sooner
            let time_to_next_poll = self.poll_interval.saturating_sub(self.last_poll.elapsed());
            let time_to_deadline = deadline.saturating_duration_since(Instant::now());
            let sleep_duration = time_to_next_poll.min(time_to_deadline);

            if !sleep_duration.is_zero() {
                std::thread::sleep(sleep_duration);
            }
        }
    }

    fn try_recv(&mut self) -> Result<Vec<FileEvent>, WatcherError> {
        self.poll_if_needed();

        Ok(std::mem::take(&mut self.pending_events))
    }

    fn is_native(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "poll"
    }
}

#[cfg(test)]
mod tests {
    use super::super::traits::FileEventKind;
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_poll_watcher_create() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        let watcher = PollWatcher::new(&[&path], Duration::from_millis(100));
        assert!(watcher.is_ok());
    }

    #[test]
    fn test_poll_watcher_reports_existing_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        File::create(&path).unwrap();

        let mut watcher = PollWatcher::new(&[&path], Duration::from_millis(50)).unwrap();

        let events = watcher.try_recv().unwrap();
        assert!(events.iter().any(|e| e.kind == FileEventKind::Create));

        // No further events without a change
        std::thread::sleep(Duration::from_millis(60));
        let events = watcher.try_recv().unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_poll_watcher_detects_late_file_creation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");

        let mut watcher = PollWatcher::new(&[&path], Duration::from_millis(50)).unwrap();
        let _ = watcher.try_recv();

        File::create(&path).unwrap();

        std::thread::sleep(Duration::from_millis(60));
        let events = watcher.try_recv().unwrap();

        let has_create = events.iter().any(|e| e.kind == FileEventKind::Create);
        assert!(has_create, "Should have create event");
    }

    #[test]
    fn test_poll_watcher_detects_file_modify() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");

        {
            let mut file = File::create(&path).unwrap();
            file.write_all(b"initial\n").unwrap();
        }

        let mut watcher = PollWatcher::new(&[&path], Duration::from_millis(50)).unwrap();

        // Clear initial events
        let _ = watcher.try_recv();

        std::thread::sleep(Duration::from_millis(100));

        {
            let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"more content\n").unwrap();
        }

        std::thread::sleep(Duration::from_millis(60));
        let events = watcher.try_recv().unwrap();

        assert!(!events.is_empty(), "Should detect file modification");
        let has_modify = events.iter().any(|e| e.kind == FileEventKind::Modify);
        assert!(has_modify, "Should have modify event");
    }

    #[test]
    fn test_poll_watcher_detects_file_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");

        File::create(&path).unwrap();

        let mut watcher = PollWatcher::new(&[&path], Duration::from_millis(50)).unwrap();

        // Clear initial events
        let _ = watcher.try_recv();

        fs::remove_file(&path).unwrap();

        std::thread::sleep(Duration::from_millis(60));
        let events = watcher.try_recv().unwrap();

        assert!(!events.is_empty(), "Should detect file removal");
        let has_remove = events.iter().any(|e| e.kind == FileEventKind::Remove);
        assert!(has_remove, "Should have remove event");
    }

    #[test]
    fn test_poll_watcher_is_not_native() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.log");
        let watcher = PollWatcher::new(&[&path], Duration::from_millis(100)).unwrap();
        assert!(!watcher.is_native());
        assert_eq!(watcher.backend_name(), "poll");
    }
}
