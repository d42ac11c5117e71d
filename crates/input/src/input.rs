//! The input context
//!
//! [`Input`] is the explicit process-wide state of the engine: the stack of
//! active sources, the lexer's location, the first pending parse error, the
//! history log and the collaborators (line editor, diagnostic sink,
//! interrupt flag). Run entry points push a source, run the command loop
//! against it and pop it again on every exit path.
//!
//! ```rust,ignore
//! use xs_input::{Input, InputConfig, RunFlags};
//!
//! let mut input = Input::new(InputConfig::from_env());
//! let result = input.run_from_string("echo hi", None, RunFlags::empty(), &mut shell)?;
//! ```

use crate::config::{InputConfig, RunFlags};
use crate::diagnostics::{Diagnostics, StderrSink};
use crate::dispatch::{self, Dispatch, Evaluator, Value};
use crate::editor::{EditorRead, LineReader};
use crate::error::Signal;
use crate::grammar::{self, GrammarFn, Tree};
use crate::history::HistoryLog;
use crate::location::{Span, Tracker};
use crate::signals::Interrupts;
use crate::source::{Backing, Source};
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use tracing::debug;

/// Outcome of one [`Input::parse`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Tree(Tree),
    EndOfInput,
}

pub struct Input {
    config: InputConfig,
    sources: Vec<Source>,
    location: Tracker,
    first_error: Option<String>,
    /// Set by the grammar while a command continues onto another line
    continued: bool,
    prompt: String,
    continuation: String,
    grammar: GrammarFn,
    history: HistoryLog,
    editor: Option<Box<dyn LineReader>>,
    diagnostics: Box<dyn Diagnostics>,
    interrupts: Interrupts,
}

impl Input {
    pub fn new(config: InputConfig) -> Self {
        let history = HistoryLog::new(config.history.clone(), config.history_enabled);
        Input {
            prompt: config.prompt.clone(),
            continuation: config.continuation_prompt.clone(),
            config,
            sources: Vec::new(),
            location: Tracker::new(),
            first_error: None,
            continued: false,
            grammar: grammar::parse_line,
            history,
            editor: None,
            diagnostics: Box::new(StderrSink::new()),
            interrupts: Interrupts::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Diagnostics + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    /// Install the line editor used by the interactive primary stream
    pub fn with_editor(mut self, editor: Box<dyn LineReader>) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_grammar(mut self, grammar: GrammarFn) -> Self {
        self.grammar = grammar;
        self
    }

    /// Share an interrupt flag, e.g. one the line editor also raises
    pub fn with_interrupts(mut self, interrupts: Interrupts) -> Self {
        self.interrupts = interrupts;
        self
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn diagnostics_mut(&mut self) -> &mut dyn Diagnostics {
        self.diagnostics.as_mut()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Number of sources on the stack
    pub fn depth(&self) -> usize {
        self.sources.len()
    }

    /// The innermost source
    pub fn current_source(&self) -> Option<&Source> {
        self.sources.last()
    }

    pub fn is_interactive(&self) -> bool {
        self.sources
            .last()
            .is_some_and(|s| s.flags().contains(RunFlags::INTERACTIVE))
    }

    /// Point history at a new file (or none). The watermark restarts and the
    /// editor's recall memory is refilled right away.
    pub fn set_history_path(&mut self, path: Option<PathBuf>) {
        debug!(path = ?path, "history path changed");
        self.history.set_path(path);
        if let Some(editor) = self.editor.as_deref_mut() {
            self.history.sync(editor);
        }
    }

    pub fn set_history_enabled(&mut self, enabled: bool) {
        self.history.set_enabled(enabled);
    }

    /// Open the history file and load it into recall memory.
    pub fn init_history(&mut self) {
        self.history.open(self.diagnostics.as_mut());
        if let Some(editor) = self.editor.as_deref_mut() {
            self.history.sync(editor);
        }
    }

    // ---- lexer interface ----

    pub fn span(&self) -> Span {
        self.location.span()
    }

    pub fn begin_token(&mut self) {
        self.location.begin_token();
    }

    /// Tell the prompt logic whether the current command continues past
    /// this line
    pub fn set_continued(&mut self, continued: bool) {
        self.continued = continued;
    }

    /// Record a parse error at the current location. Only the first error of
    /// a parse is kept.
    pub fn record_error(&mut self, message: &str) {
        if self.first_error.is_none() {
            self.first_error = Some(self.locate(message));
        }
    }

    /// Forget a pending parse error.
    pub fn reset_parser(&mut self) {
        self.first_error = None;
        self.continued = false;
    }

    /// Drop whatever the innermost source has buffered or pushed back, so
    /// an abandoned command does not leak into the next parse.
    pub fn discard_pending(&mut self) {
        if let Some(top) = self.sources.last_mut() {
            top.discard();
        }
    }

    /// Prefix `message` with the current location: a column range when
    /// interactive, `name:lines:columns` otherwise.
    pub fn locate(&self, message: &str) -> String {
        let span = self.location.span();
        match self.sources.last() {
            Some(top) if !top.flags().contains(RunFlags::INTERACTIVE) => format!(
                "{}:{}-{}:{}-{} {}",
                top.name(),
                span.first_line,
                span.last_line,
                span.first_column,
                span.last_column,
                message
            ),
            _ => format!(
                "columns {}-{} {}",
                span.first_column, span.last_column, message
            ),
        }
    }

    /// Next character of the innermost source, or `None` at end of input.
    ///
    /// NUL bytes are dropped with a warning each.
    pub fn get_char(&mut self) -> Result<Option<u8>, Signal> {
        loop {
            let buffered = self.sources.last_mut().and_then(Source::take_buffered);
            let c = match buffered {
                Some(c) => c,
                None => match self.fill()? {
                    Some(c) => c,
                    None => return Ok(None),
                },
            };
            if c == 0 {
                let warning = format!("warning: {}", self.locate("null character ignored"));
                self.diagnostics.line(&warning);
                continue;
            }
            if let Some(top) = self.sources.last_mut()
                && top.consumed()
            {
                self.diagnostics.echo(&[c]);
            }
            self.location.advance(c);
            return Ok(Some(c));
        }
    }

    /// Return `c` to the front of the innermost source.
    ///
    /// # Panics
    ///
    /// Panics when more than [`crate::source::MAX_UNGET`] characters are
    /// pushed back in a row.
    pub fn pushback(&mut self, c: u8) {
        self.location.retreat();
        if let Some(top) = self.sources.last_mut() {
            top.pushback(c);
        }
    }

    fn fill(&mut self) -> Result<Option<u8>, Signal> {
        let Some(top) = self.sources.last_mut() else {
            return Ok(None);
        };
        if let Some(c) = top.drain_pushback() {
            return Ok(Some(c));
        }
        if top.is_exhausted() {
            return Ok(None);
        }
        match top.backing() {
            Backing::Text => {
                top.exhaust();
                Ok(None)
            }
            Backing::Descriptor => {
                let use_editor = top.flags().contains(RunFlags::INTERACTIVE)
                    && top.is_primary()
                    && self.editor.is_some();
                if use_editor {
                    self.fill_from_editor()
                } else {
                    self.fill_from_descriptor()
                }
            }
        }
    }

    fn fill_from_descriptor(&mut self) -> Result<Option<u8>, Signal> {
        let Some(top) = self.sources.last_mut() else {
            return Ok(None);
        };
        loop {
            match top.read_window() {
                Ok(0) => {
                    debug!(source = top.name(), "end of input");
                    top.close();
                    return Ok(None);
                }
                Ok(n) => {
                    debug!(source = top.name(), bytes = n, "filled from descriptor");
                    if top.flags().contains(RunFlags::INTERACTIVE) {
                        self.history.log(top.window(), self.diagnostics.as_mut());
                    }
                    return Ok(top.take_buffered());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    self.interrupts.dispatch()?;
                }
                Err(e) => {
                    let message = format!("{}: {}", top.name(), e);
                    top.close();
                    return Err(Signal::error("$&fdfill", message));
                }
            }
        }
    }

    fn fill_from_editor(&mut self) -> Result<Option<u8>, Signal> {
        let line = loop {
            match self.call_line_editor()? {
                EditorRead::Line(line) => break line,
                EditorRead::Interrupted => continue,
                EditorRead::Eof => {
                    if let Some(top) = self.sources.last_mut() {
                        top.close();
                    }
                    return Ok(None);
                }
            }
        };

        if !line.is_empty()
            && let Some(editor) = self.editor.as_deref_mut()
        {
            editor.add_recall(&line);
        }
        let Some(top) = self.sources.last_mut() else {
            return Ok(None);
        };
        top.load_line(&line);
        if top.flags().contains(RunFlags::INTERACTIVE) {
            self.history.log(top.window(), self.diagnostics.as_mut());
        }
        Ok(top.take_buffered())
    }

    /// One blocking line-editor call, with interrupts dispatched afterwards.
    fn call_line_editor(&mut self) -> Result<EditorRead, Signal> {
        let Some(editor) = self.editor.as_deref_mut() else {
            return Ok(EditorRead::Eof);
        };
        self.history.sync(editor);

        let prompt = if self.continued {
            &self.continuation
        } else {
            &self.prompt
        };
        let read = {
            let _call = self.interrupts.enter_blocking_call();
            if self.interrupts.is_pending() {
                EditorRead::Interrupted
            } else {
                editor.read_line(prompt)
            }
        };
        self.interrupts.dispatch()?;
        Ok(read)
    }

    // ---- parsing ----

    /// Parse one tree from the innermost source.
    ///
    /// `None` prompts fall back to the configured ones. An exhausted source
    /// yields [`Parsed::EndOfInput`] without running the grammar.
    pub fn parse(
        &mut self,
        prompt: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<Parsed, Signal> {
        if let Some(pending) = &self.first_error {
            return Err(Signal::Internal(format!(
                "parse entered with a pending error: {}",
                pending
            )));
        }
        self.location.reset();
        let Some(top) = self.sources.last() else {
            return Err(Signal::Internal("parse with no active source".to_string()));
        };
        if top.is_finished() {
            return Ok(Parsed::EndOfInput);
        }

        self.prompt = prompt.unwrap_or(&self.config.prompt).to_string();
        self.continuation = continuation
            .unwrap_or(&self.config.continuation_prompt)
            .to_string();
        self.continued = false;

        let grammar = self.grammar;
        let result = grammar(self);
        let pending = self.first_error.take();
        let tree = result?;
        if let Some(message) = pending {
            return Err(Signal::error("$&parse", message));
        }
        match tree {
            Some(tree) => Ok(Parsed::Tree(tree)),
            None => Err(Signal::error("$&parse", self.locate("syntax error"))),
        }
    }

    /// Parse exactly one tree from `source`.
    pub fn parse_input(&mut self, source: Source) -> Result<Tree, Signal> {
        let mut input = StackGuard::push(self, source);
        let tree = match input.parse(None, None)? {
            Parsed::Tree(tree) => tree,
            Parsed::EndOfInput => return Ok(Tree::Empty),
        };
        if input.get_char()?.is_some() {
            return Err(Signal::error("$&parse", "more than one value in term"));
        }
        Ok(tree)
    }

    pub fn parse_string(&mut self, text: &str) -> Result<Tree, Signal> {
        self.parse_input(Source::from_text(text, None))
    }

    // ---- run entry points ----

    /// Push `source`, run the command loop over it, and pop it again
    pub fn run_source(
        &mut self,
        mut source: Source,
        flags: RunFlags,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Value, Signal> {
        source.flags = flags;
        let dispatch = Dispatch::from_flags(flags);
        let interactive = flags.contains(RunFlags::INTERACTIVE);
        let mut input = StackGuard::push(self, source);
        dispatch::command_loop(&mut input, evaluator, dispatch, interactive)
    }

    pub fn run_from_descriptor(
        &mut self,
        fd: OwnedFd,
        name: Option<&str>,
        flags: RunFlags,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Value, Signal> {
        let source = Source::from_descriptor(fd, name, self.config.buffer_size);
        self.run_source(source, flags, evaluator)
    }

    pub fn run_from_string(
        &mut self,
        text: &str,
        name: Option<&str>,
        flags: RunFlags,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Value, Signal> {
        self.run_source(Source::from_text(text, name), flags, evaluator)
    }
}

/// Keeps a pushed source on the stack for the guard's lifetime. Dropping the
/// guard, on success, error or panic, pops the stack back to where it was.
struct StackGuard<'a> {
    input: &'a mut Input,
    depth: usize,
}

impl<'a> StackGuard<'a> {
    fn push(input: &'a mut Input, source: Source) -> Self {
        let depth = input.sources.len();
        debug!(source = source.name(), depth, "source pushed");
        input.sources.push(source);
        StackGuard { input, depth }
    }
}

impl Deref for StackGuard<'_> {
    type Target = Input;

    fn deref(&self) -> &Input {
        self.input
    }
}

impl DerefMut for StackGuard<'_> {
    fn deref_mut(&mut self) -> &mut Input {
        self.input
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        while self.input.sources.len() > self.depth {
            if let Some(source) = self.input.sources.pop() {
                debug!(source = source.name(), "source popped");
            }
        }
        // A nested run must not leave its error behind for the caller's parse.
        self.input.first_error = None;
    }
}
