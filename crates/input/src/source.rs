//! Input sources
//!
//! A [`Source`] owns a buffer window `pos..end` over its internal buffer and
//! knows how to refill it. There are exactly two backings, see [`Backing`].
//! Pushed-back characters live on a small bounded stack; while that stack is
//! in use the main window is parked and resumes once the stack drains.

use crate::config::RunFlags;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};
use tracing::debug;

/// Most characters that may sit on the pushback stack at once
pub const MAX_UNGET: usize = 2;

/// What a source reads from once its window runs dry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// A file descriptor, or the line editor for the interactive stdin
    Descriptor,
    /// A fixed string; never refilled
    Text,
}

#[derive(Debug)]
pub struct Source {
    name: String,
    backing: Backing,
    file: Option<File>,
    /// Reads on the primary stream go through the line editor when
    /// interactive
    primary: bool,
    exhausted: bool,
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    unget: Vec<u8>,
    /// Window position parked while the pushback stack is in use
    parked: Option<usize>,
    /// Pushed-back bytes still to come that were already echoed once
    unechoed: usize,
    pub(crate) flags: RunFlags,
}

impl Source {
    /// A source reading from `fd`, which it closes when done. Unnamed
    /// sources are called `fd N`.
    pub fn from_descriptor(fd: OwnedFd, name: Option<&str>, buffer_size: usize) -> Self {
        let raw = fd.as_raw_fd();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("fd {}", raw));
        Source {
            name,
            backing: Backing::Descriptor,
            file: Some(File::from(fd)),
            primary: raw == libc::STDIN_FILENO,
            exhausted: false,
            buf: vec![0; buffer_size.max(1)],
            pos: 0,
            end: 0,
            unget: Vec::with_capacity(MAX_UNGET),
            parked: None,
            unechoed: 0,
            flags: RunFlags::empty(),
        }
    }

    /// A source over a fixed text; unnamed sources are named by the text
    pub fn from_text(text: &str, name: Option<&str>) -> Self {
        Source {
            name: name.unwrap_or(text).to_string(),
            backing: Backing::Text,
            file: None,
            primary: false,
            exhausted: text.is_empty(),
            buf: text.as_bytes().to_vec(),
            pos: 0,
            end: text.len(),
            unget: Vec::with_capacity(MAX_UNGET),
            parked: None,
            unechoed: 0,
            flags: RunFlags::empty(),
        }
    }

    /// A primary-stream source with no descriptor; every fill comes from the
    /// line editor.
    #[cfg(test)]
    pub(crate) fn for_line_editor(name: &str, buffer_size: usize) -> Self {
        Source {
            name: name.to_string(),
            backing: Backing::Descriptor,
            file: None,
            primary: true,
            exhausted: false,
            buf: vec![0; buffer_size.max(1)],
            pos: 0,
            end: 0,
            unget: Vec::with_capacity(MAX_UNGET),
            parked: None,
            unechoed: 0,
            flags: RunFlags::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backing(&self) -> Backing {
        self.backing
    }

    pub fn flags(&self) -> RunFlags {
        self.flags
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Exhausted with nothing left in the window or on the pushback stack
    pub fn is_finished(&self) -> bool {
        self.exhausted && self.pos >= self.end && self.unget.is_empty()
    }

    /// Characters currently on the pushback stack
    pub fn pending_pushback(&self) -> usize {
        self.unget.len()
    }

    pub(crate) fn take_buffered(&mut self) -> Option<u8> {
        if self.pos < self.end {
            let c = self.buf[self.pos];
            self.pos += 1;
            Some(c)
        } else {
            None
        }
    }

    /// Pop the pushback stack; the parked window resumes when it empties.
    pub(crate) fn drain_pushback(&mut self) -> Option<u8> {
        let c = self.unget.pop()?;
        if self.unget.is_empty()
            && let Some(pos) = self.parked.take()
        {
            self.pos = pos;
        }
        Some(c)
    }

    /// Return `c` to the front of the stream.
    ///
    /// Cheapest first: step the window back when the byte before the cursor
    /// is `c` (not while echoing, which would echo it twice); push onto an
    /// already active pushback stack; otherwise park the window and start
    /// the stack with `c`.
    ///
    /// # Panics
    ///
    /// Panics if the pushback stack would exceed [`MAX_UNGET`].
    pub(crate) fn pushback(&mut self, c: u8) {
        let echo = self.flags.contains(RunFlags::ECHO_INPUT);
        if !self.unget.is_empty() {
            assert!(
                self.unget.len() < MAX_UNGET,
                "pushback overflow on {}: more than {} characters",
                self.name,
                MAX_UNGET
            );
            self.unget.push(c);
        } else if self.pos > 0 && self.buf[self.pos - 1] == c && !echo {
            self.pos -= 1;
        } else {
            debug_assert!(self.parked.is_none());
            self.parked = Some(self.pos);
            self.pos = self.end;
            self.unget.push(c);
        }
        if echo {
            self.unechoed += 1;
        }
    }

    /// Bookkeeping for a byte handed to the lexer. Returns whether it should
    /// be echoed.
    pub(crate) fn consumed(&mut self) -> bool {
        if !self.flags.contains(RunFlags::ECHO_INPUT) {
            return false;
        }
        if self.unechoed > 0 {
            self.unechoed -= 1;
            return false;
        }
        true
    }

    /// Drop whatever is buffered or pushed back.
    pub(crate) fn discard(&mut self) {
        self.unget.clear();
        self.parked = None;
        self.unechoed = 0;
        self.pos = self.end;
    }

    /// Fixed text has nothing more to give.
    pub(crate) fn exhaust(&mut self) {
        self.exhausted = true;
    }

    /// Read the next chunk from the descriptor into the window.
    pub(crate) fn read_window(&mut self) -> io::Result<usize> {
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let n = file.read(&mut self.buf)?;
        self.pos = 0;
        self.end = n;
        Ok(n)
    }

    /// Replace the window with `line` plus a newline, growing the buffer by
    /// doubling when needed. Returns the window length.
    pub(crate) fn load_line(&mut self, line: &str) -> usize {
        let n = line.len() + 1;
        if self.buf.len() < n {
            let mut size = self.buf.len().max(1);
            while size < n {
                size *= 2;
            }
            self.buf.resize(size, 0);
        }
        self.buf[..n - 1].copy_from_slice(line.as_bytes());
        self.buf[n - 1] = b'\n';
        self.pos = 0;
        self.end = n;
        n
    }

    pub(crate) fn window(&self) -> &[u8] {
        &self.buf[self.pos..self.end]
    }

    #[cfg(test)]
    pub(crate) fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    /// Release the descriptor and mark the source exhausted for good.
    pub(crate) fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(source = %self.name, "descriptor closed");
        }
        self.exhausted = true;
        self.flags.remove(RunFlags::INTERACTIVE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(src: &mut Source) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(c) = src.take_buffered().or_else(|| src.drain_pushback()) {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_rewind_fast_path() {
        let mut src = Source::from_text("ab", None);
        assert_eq!(src.take_buffered(), Some(b'a'));
        src.pushback(b'a');
        assert_eq!(src.pending_pushback(), 0);
        assert_eq!(drain(&mut src), b"ab");
    }

    #[test]
    fn test_splice_when_byte_differs() {
        let mut src = Source::from_text("ab", None);
        assert_eq!(src.take_buffered(), Some(b'a'));
        src.pushback(b'x');
        assert_eq!(src.pending_pushback(), 1);
        assert_eq!(src.take_buffered(), None);
        assert_eq!(src.drain_pushback(), Some(b'x'));
        // The parked window resumes where it stopped.
        assert_eq!(src.take_buffered(), Some(b'b'));
    }

    #[test]
    fn test_stack_is_lifo() {
        let mut src = Source::from_text("ab", None);
        src.take_buffered();
        src.pushback(b'x');
        src.pushback(b'y');
        assert_eq!(src.drain_pushback(), Some(b'y'));
        assert_eq!(src.drain_pushback(), Some(b'x'));
        assert_eq!(src.take_buffered(), Some(b'b'));
    }

    #[test]
    #[should_panic(expected = "pushback overflow")]
    fn test_overflow_is_fatal() {
        let mut src = Source::from_text("", None);
        for c in b"xyz" {
            src.pushback(*c);
        }
    }

    #[test]
    fn test_echo_mode_never_rewinds() {
        let mut src = Source::from_text("ab", None);
        src.flags = RunFlags::ECHO_INPUT;
        assert_eq!(src.take_buffered(), Some(b'a'));
        assert!(src.consumed());
        src.pushback(b'a');
        assert_eq!(src.pending_pushback(), 1);
        // The pushed-back byte is not echoed a second time.
        assert_eq!(src.drain_pushback(), Some(b'a'));
        assert!(!src.consumed());
        assert_eq!(src.take_buffered(), Some(b'b'));
        assert!(src.consumed());
    }

    #[test]
    fn test_load_line_doubles_buffer() {
        let mut src = Source::for_line_editor("tty", 4);
        let n = src.load_line("echo hello");
        assert_eq!(n, 11);
        assert_eq!(src.buffer_len(), 16);
        assert_eq!(src.window(), b"echo hello\n");
    }

    #[test]
    fn test_empty_text_is_exhausted_at_creation() {
        assert!(Source::from_text("", None).is_exhausted());
        assert!(!Source::from_text("x", None).is_exhausted());
    }

    #[test]
    fn test_default_names() {
        assert_eq!(Source::from_text("echo hi", None).name(), "echo hi");
        assert_eq!(Source::from_text("echo hi", Some("-c")).name(), "-c");

        let file = tempfile::tempfile().unwrap();
        let fd = OwnedFd::from(file);
        let raw = fd.as_raw_fd();
        let src = Source::from_descriptor(fd, None, 16);
        assert_eq!(src.name(), format!("fd {}", raw));
        assert!(!src.is_primary());
    }

}
