// SPDX-License-Identifier: Apache-2.0

//! Incremental reader for a single tailed file.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// FileCursor owns the read state for one watched file: the lazily opened
/// handle, the byte offset of the last consumed byte, and the bytes of an
/// unterminated trailing line carried between reads.
///
/// The offset always equals "bytes already scanned for keywords": no byte
/// range is consumed twice and none is skipped, except across an external
/// truncation or rotation of the file (see [`FileCursor::consume_new_bytes`]).
pub struct FileCursor {
    /// Path to the file, stable for the process lifetime
    path: PathBuf,
    /// The open file handle; None until the first read, or after an error
    file: Option<File>,
    /// Byte position of the last byte consumed
    offset: u64,
    /// Bytes read since the last newline, not yet a complete line
    partial: Vec<u8>,
    /// Whether the initial end-of-file seek has happened
    initialized: bool,
    /// Identity (device + inode) of the file last opened, where the
    /// platform exposes one
    identity: Option<(u64, u64)>,
}

/// Stable identity of a file for rotation detection. On Unix this is the
/// device and inode pair; elsewhere no identity is available and rotation
/// is detected by the size check alone.
fn file_identity(meta: &fs::Metadata) -> Option<(u64, u64)> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Some((meta.dev(), meta.ino()))
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        None
    }
}

impl FileCursor {
    /// Create a cursor for a file. The file is not opened until the first
    /// call to [`FileCursor::consume_new_bytes`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            offset: 0,
            partial: Vec::new(),
            initialized: false,
            identity: None,
        }
    }

    /// Open (or re-open) the file from its path and record its identity.
    fn reopen(&mut self) -> io::Result<()> {
        let file = File::open(&self.path)?;
        self.identity = file_identity(&file.metadata()?);
        self.file = Some(file);
        Ok(())
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current offset
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read all bytes newly available since the last call and return the
    /// complete lines they form, in order. The trailing segment without a
    /// newline is buffered and prepended to the next call's read.
    ///
    /// The first call opens the file and seeds the offset to the current end
    /// of file: content written before watching started is never scanned.
    ///
    /// When the file shrank below the current offset, or the path now refers
    /// to a different file (rotation), the cursor re-opens it and resumes
    /// from offset 0. Any buffered partial line from before the rotation is
    /// discarded; the line spanning the rotation instant may be lost but is
    /// never duplicated.
    ///
    /// An inaccessible file yields an error and drops the handle; the next
    /// call retries the open, so unavailability is never fatal to the caller.
    pub fn consume_new_bytes(&mut self) -> io::Result<Vec<String>> {
        let meta = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) => {
                self.file = None;
                return Err(e);
            }
        };
        let len = meta.len();

        if !self.initialized {
            self.reopen()?;
            self.offset = len;
            self.initialized = true;
            debug!(file = ?self.path, offset = len, "tailing from end of file");
            return Ok(Vec::new());
        }

        if len < self.offset || self.was_replaced(&meta) {
            info!(
                file = ?self.path,
                old_offset = self.offset,
                new_size = len,
                "file truncated or rotated, resetting offset"
            );
            self.reopen()?;
            self.offset = 0;
            self.partial.clear();
        }

        if len == self.offset {
            return Ok(Vec::new());
        }

        if self.file.is_none() {
            self.reopen()?;
        }
        let file = match self.file.as_mut() {
            Some(f) => f,
            None => return Ok(Vec::new()),
        };

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        let read = match file.read_to_end(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.file = None;
                return Err(e);
            }
        };

        self.offset += read as u64;
        self.partial.extend_from_slice(&buf);

        Ok(self.split_complete_lines())
    }

    /// Split the buffered bytes at newline boundaries. Everything up to the
    /// final newline becomes complete lines; the rest stays buffered.
    fn split_complete_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(pos) = self.partial[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            let mut line = &self.partial[start..end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
        }

        self.partial.drain(..start);
        lines
    }

    /// Detect whether the path now points at a different file than the one
    /// last opened (rotation by rename + recreate). On platforms without a
    /// stable file identity this reports false and the size check above is
    /// the only rotation signal.
    fn was_replaced(&self, path_meta: &fs::Metadata) -> bool {
        match (self.identity, file_identity(path_meta)) {
            (Some(opened), Some(current)) => opened != current,
            _ => false,
        }
    }

    /// Close the file handle
    pub fn close(&mut self) {
        self.file = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, data: &[u8]) {
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn test_first_read_skips_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"old line 1\nold line 2\n");

        let mut cursor = FileCursor::new(&path);
        let lines = cursor.consume_new_bytes().unwrap();
        assert!(lines.is_empty());
        assert_eq!(cursor.offset(), 22);
    }

    #[test]
    fn test_reads_appended_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"old\n");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        append(&path, b"line 1\nline 2\n");
        let lines = cursor.consume_new_bytes().unwrap();
        assert_eq!(lines, vec!["line 1", "line 2"]);
    }

    #[test]
    fn test_empty_read_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"x\n");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        append(&path, b"line\n");
        assert_eq!(cursor.consume_new_bytes().unwrap(), vec!["line"]);
        assert!(cursor.consume_new_bytes().unwrap().is_empty());
        assert!(cursor.consume_new_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_partial_line_carried_across_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        append(&path, b"first half");
        assert!(cursor.consume_new_bytes().unwrap().is_empty());

        append(&path, b" second half\nnext\n");
        let lines = cursor.consume_new_bytes().unwrap();
        assert_eq!(lines, vec!["first half second half", "next"]);
    }

    #[test]
    fn test_crlf_line_endings_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        append(&path, b"windows line\r\n");
        assert_eq!(cursor.consume_new_bytes().unwrap(), vec!["windows line"]);
    }

    #[test]
    fn test_truncation_resets_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"a long line of history\n");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();
        assert!(cursor.offset() > 0);

        // Truncate in place and write fresh, shorter content
        fs::write(&path, b"new\n").unwrap();

        let lines = cursor.consume_new_bytes().unwrap();
        assert_eq!(lines, vec!["new"]);
        assert_eq!(cursor.offset(), 4);
    }

    #[test]
    fn test_truncation_discards_partial_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"seed data that makes the file long\n");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        append(&path, b"dangling fragment");
        cursor.consume_new_bytes().unwrap();

        fs::write(&path, b"after\n").unwrap();
        let lines = cursor.consume_new_bytes().unwrap();
        assert_eq!(lines, vec!["after"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_rotation_by_rename_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, b"pre\n");

        let mut cursor = FileCursor::new(&path);
        cursor.consume_new_bytes().unwrap();

        // Rotate: rename away, recreate with content longer than the old
        // offset so the size check alone would not fire.
        fs::rename(&path, dir.path().join("app.log.1")).unwrap();
        append(&path, b"fresh file with plenty of content\n");

        let lines = cursor.consume_new_bytes().unwrap();
        assert_eq!(lines, vec!["fresh file with plenty of content"]);
    }

    #[test]
    fn test_missing_file_is_reported_and_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");

        let mut cursor = FileCursor::new(&path);
        assert!(cursor.consume_new_bytes().is_err());

        // File appears later; first successful read seeds to end of file
        append(&path, b"ignored history\n");
        assert!(cursor.consume_new_bytes().unwrap().is_empty());

        append(&path, b"seen\n");
        assert_eq!(cursor.consume_new_bytes().unwrap(), vec!["seen"]);
    }
}
