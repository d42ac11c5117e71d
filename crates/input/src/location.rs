//! Source location tracking for the lexer.
//!
//! The tracker keeps a [`Span`] that moves forward one character at a time
//! and can be moved back when the lexer pushes a character back. Recent
//! positions are remembered so that a retreat restores the span exactly,
//! including across tab stops and newlines.

use std::collections::VecDeque;

/// Columns advance to the next multiple of this on a tab
pub const TAB_STOP: usize = 8;

/// How many previous spans are remembered for exact rollback
const TRAIL_DEPTH: usize = 16;

/// A line/column range. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first_line: usize,
    pub last_line: usize,
    pub first_column: usize,
    pub last_column: usize,
}

impl Span {
    /// Line 1, column 0
    pub const fn start() -> Self {
        Span {
            first_line: 1,
            last_line: 1,
            first_column: 0,
            last_column: 0,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::start()
    }
}

#[derive(Debug, Default)]
pub struct Tracker {
    span: Span,
    trail: VecDeque<Span>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn reset(&mut self) {
        self.span = Span::start();
        self.trail.clear();
    }

    /// Start a new token at the current position
    pub fn begin_token(&mut self) {
        self.span.first_line = self.span.last_line;
        self.span.first_column = self.span.last_column;
    }

    /// Account for one consumed character
    pub fn advance(&mut self, c: u8) {
        if self.trail.len() == TRAIL_DEPTH {
            self.trail.pop_front();
        }
        self.trail.push_back(self.span);

        let span = &mut self.span;
        match c {
            b'\t' => span.last_column = (span.last_column / TAB_STOP + 1) * TAB_STOP,
            b'\n' => {
                span.first_column = 0;
                span.last_column = 0;
                span.last_line += 1;
            }
            _ => span.last_column += 1,
        }
    }

    /// Undo the most recent [`Tracker::advance`]
    ///
    /// Falls back to stepping one line or column back when the trail is
    /// empty: at column 0 the previous character ended a line.
    pub fn retreat(&mut self) {
        if let Some(previous) = self.trail.pop_back() {
            self.span = previous;
            return;
        }

        let span = &mut self.span;
        if span.last_column == 0 {
            span.last_line = span.last_line.saturating_sub(1);
            if span.first_line > span.last_line {
                span.first_line = span.last_line;
            }
        } else {
            span.last_column -= 1;
            if span.first_column > span.last_column {
                span.first_column = span.last_column;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_characters_advance_columns() {
        let mut t = Tracker::new();
        for c in b"abc" {
            t.advance(*c);
        }
        assert_eq!(t.span().last_column, 3);
        assert_eq!(t.span().first_column, 0);
        assert_eq!(t.span().last_line, 1);
    }

    #[test]
    fn test_tab_rounds_up_to_stop() {
        let mut t = Tracker::new();
        t.advance(b'a');
        t.advance(b'\t');
        assert_eq!(t.span().last_column, 8);
        t.advance(b'\t');
        assert_eq!(t.span().last_column, 16);
    }

    #[test]
    fn test_newline_resets_column() {
        let mut t = Tracker::new();
        t.advance(b'x');
        t.advance(b'\n');
        let span = t.span();
        assert_eq!(span.last_line, 2);
        assert_eq!(span.first_line, 1);
        assert_eq!(span.last_column, 0);
        assert_eq!(span.first_column, 0);
    }

    #[test]
    fn test_advance_then_retreat_is_identity() {
        for c in [b'a', b'\t', b'\n', b' ', b'#'] {
            let mut t = Tracker::new();
            for prefix in b"ab\tc" {
                t.advance(*prefix);
            }
            t.begin_token();
            let before = t.span();
            t.advance(c);
            t.retreat();
            assert_eq!(t.span(), before, "char {:?}", c as char);
        }
    }

    #[test]
    fn test_fallback_rule_without_trail() {
        let mut t = Tracker::new();
        t.advance(b'a');
        t.advance(b'b');
        t.reset();
        // Column 0 after reset: stepping back crosses a line boundary.
        t.retreat();
        assert_eq!(t.span().last_line, 0);
        assert_eq!(t.span().first_line, 0);
    }

    #[test]
    fn test_fallback_clamps_first_column() {
        let mut t = Tracker::new();
        t.advance(b'a');
        t.advance(b'b');
        t.begin_token();
        t.trail.clear();
        t.retreat();
        assert_eq!(t.span().last_column, 1);
        assert_eq!(t.span().first_column, 1);
    }
}
