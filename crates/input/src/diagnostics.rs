//! Diagnostic sink
//!
//! Input echo (`-v`), command printing (`-x`), warnings and interactive
//! error reports are user-facing output, so they go through a
//! [`Diagnostics`] sink rather than `tracing`. The default sink is a
//! line-buffered stderr.

use std::cell::RefCell;
use std::io::{self, LineWriter, Stderr, Write};
use std::rc::Rc;

pub trait Diagnostics {
    /// Echo raw input bytes
    fn echo(&mut self, bytes: &[u8]);

    /// Emit one complete line (a trailing newline is added)
    fn line(&mut self, text: &str);
}

/// Line-buffered standard error
pub struct StderrSink {
    out: LineWriter<Stderr>,
}

impl StderrSink {
    pub fn new() -> Self {
        StderrSink {
            out: LineWriter::new(io::stderr()),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics for StderrSink {
    fn echo(&mut self, bytes: &[u8]) {
        let _ = self.out.write_all(bytes);
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
    }
}

/// In-memory sink; clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Rc<RefCell<Vec<String>>>,
    echoed: Rc<RefCell<Vec<u8>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn echoed(&self) -> Vec<u8> {
        self.echoed.borrow().clone()
    }

    /// Number of lines starting with `warning:`
    pub fn warnings(&self) -> usize {
        self.lines
            .borrow()
            .iter()
            .filter(|l| l.starts_with("warning:"))
            .count()
    }
}

impl Diagnostics for BufferSink {
    fn echo(&mut self, bytes: &[u8]) {
        self.echoed.borrow_mut().extend_from_slice(bytes);
    }

    fn line(&mut self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_clones_share_state() {
        let sink = BufferSink::new();
        let mut writer = sink.clone();
        writer.echo(b"ab");
        writer.line("warning: null character ignored");
        writer.line("plain");
        assert_eq!(sink.echoed(), b"ab");
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.warnings(), 1);
    }
}
