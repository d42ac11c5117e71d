//! History log
//!
//! An append-only text file, one input line per physical line. Before each
//! interactive prompt the file is re-read and any lines appended by other
//! shells since the last look are merged into the editor's recall memory.
//! The merge is best effort: concurrent writers may cause a line to be
//! loaded twice, and that is tolerated rather than corrected.

use crate::diagnostics::Diagnostics;
use crate::editor::LineReader;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct HistoryLog {
    path: Option<PathBuf>,
    /// Lazily opened append handle. std opens files close-on-exec, so child
    /// processes never inherit it.
    file: Option<File>,
    /// Line count of the file as of the last merge
    watermark: usize,
    enabled: bool,
}

impl HistoryLog {
    pub fn new(path: Option<PathBuf>, enabled: bool) -> Self {
        HistoryLog {
            path,
            file: None,
            watermark: 0,
            enabled,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Point the log at a new file. The watermark restarts at zero so the
    /// next [`HistoryLog::sync`] loads the whole file.
    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.file = None;
        self.path = path;
        self.watermark = 0;
    }

    fn active_path(&self) -> Option<&Path> {
        if self.enabled { self.path.as_deref() } else { None }
    }

    /// Open the append handle if it is not open yet.
    ///
    /// On failure the log reports once and forgets its path, leaving
    /// history disabled for the rest of the session.
    pub fn open(&mut self, diagnostics: &mut dyn Diagnostics) -> bool {
        if self.file.is_some() {
            return true;
        }
        let Some(path) = self.active_path() else {
            return false;
        };
        match OpenOptions::new().append(true).create(true).open(path) {
            Ok(file) => {
                debug!(path = %path.display(), "history file opened");
                self.file = Some(file);
                true
            }
            Err(e) => {
                diagnostics.line(&format!("history({}): {}", path.display(), e));
                warn!(path = %path.display(), error = %e, "history disabled");
                self.path = None;
                false
            }
        }
    }

    /// Append freshly read input. Blank lines and comment-only lines are
    /// skipped.
    pub fn log(&mut self, bytes: &[u8], diagnostics: &mut dyn Diagnostics) {
        if !self.open(diagnostics) {
            return;
        }
        if is_blank_or_comment(bytes) {
            return;
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(bytes) {
            let path = self.path.as_deref().unwrap_or(Path::new(""));
            diagnostics.line(&format!("history({}): {}", path.display(), e));
            warn!(error = %e, "history write failed; history disabled");
            self.file = None;
            self.path = None;
            return;
        }
        // Our own lines are already in recall memory; step over them.
        self.watermark += bytes.iter().filter(|b| **b == b'\n').count().max(1);
    }

    /// Merge lines other writers appended since the last merge.
    ///
    /// A file that got shorter was truncated or replaced, so the merge
    /// starts over from its first line.
    pub fn sync(&mut self, recall: &mut dyn LineReader) {
        let Some(path) = self.active_path() else {
            return;
        };
        let contents = match fs::read(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "history file not readable");
                return;
            }
        };

        let lines = contents.iter().filter(|b| **b == b'\n').count();
        if lines < self.watermark {
            debug!(lines, watermark = self.watermark, "history file shrank; resyncing");
            self.watermark = 0;
        }

        let fresh = lines - self.watermark;
        for line in contents.split(|b| *b == b'\n').skip(self.watermark).take(fresh) {
            recall.add_recall(&String::from_utf8_lossy(line));
        }
        if fresh > 0 {
            debug!(fresh, "merged history lines");
        }
        self.watermark = lines;
    }
}

/// Whether `bytes` is a line not worth logging: only blanks before the end
/// of line or a comment.
fn is_blank_or_comment(bytes: &[u8]) -> bool {
    for b in bytes {
        match b {
            b'#' | b'\n' => return true,
            b' ' | b'\t' => continue,
            _ => return false,
        }
    }
    true
}
