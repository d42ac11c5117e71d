//! Line-editor bridge
//!
//! The input engine talks to the line editor through [`LineReader`]: one
//! blocking `read_line` per fill, plus recall-memory appends. The
//! production implementation wraps `rustyline` and hosts completion and
//! quoting; tests substitute a scripted reader.

use crate::completion::{self, Namespace};
use crate::quoting;
use crate::signals::Interrupts;
use crate::terminal;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of one blocking line-editor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorRead {
    /// A complete line, without its terminating newline
    Line(String),
    /// The call was interrupted; the caller should ask again
    Interrupted,
    /// True end of input
    Eof,
}

/// A line-based read-with-prompt service
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> EditorRead;

    /// Add a line to the editor's recall memory
    fn add_recall(&mut self, line: &str);
}

/// Completion and quoting callbacks for rustyline
pub struct ShellHelper {
    namespace: Box<dyn Namespace>,
}

impl ShellHelper {
    pub fn new(namespace: Box<dyn Namespace>) -> Self {
        ShellHelper { namespace }
    }

    /// Replacement start and quoted candidates for the word ending at `pos`,
    /// with filenames resolved against `cwd`
    fn candidates(&self, line: &str, pos: usize, cwd: &Path) -> (usize, Vec<Pair>) {
        let start = quoting::word_start(line, pos);
        let fragment = quoting::dequote(&line[start..pos]);

        // The header is dropped; rustyline inserts the common prefix itself.
        let names = match completion::complete(&fragment, self.namespace.as_ref(), cwd) {
            Some(found) => found.candidates,
            None => completion::filename_completions(&fragment, cwd),
        };

        let single = names.len() == 1;
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                replacement: quoting::quote(&name, single),
                display: name,
            })
            .collect();
        (start, pairs)
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let cwd = std::env::current_dir().unwrap_or_default();
        Ok(self.candidates(line, pos, &cwd))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// [`LineReader`] backed by rustyline
///
/// rustyline reads Ctrl-C as a key in raw mode, so no SIGINT arrives; the
/// reader raises the interrupt flag itself to get the same effect.
pub struct RustylineReader {
    editor: Editor<ShellHelper, DefaultHistory>,
    interrupts: Interrupts,
}

impl RustylineReader {
    pub fn new(namespace: Box<dyn Namespace>, interrupts: Interrupts) -> rustyline::Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper::new(namespace)));
        Ok(RustylineReader { editor, interrupts })
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str) -> EditorRead {
        let before = terminal::geometry();
        terminal::refresh();
        if terminal::geometry() != before {
            debug!(geometry = ?terminal::geometry(), "terminal resized");
        }

        match self.editor.readline(prompt) {
            Ok(line) => EditorRead::Line(line),
            Err(ReadlineError::Interrupted) => {
                self.interrupts.raise();
                EditorRead::Interrupted
            }
            #[cfg(unix)]
            Err(ReadlineError::WindowResized) => EditorRead::Interrupted,
            Err(ReadlineError::Io(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                EditorRead::Interrupted
            }
            Err(ReadlineError::Eof) => EditorRead::Eof,
            Err(e) => {
                warn!(error = %e, "line editor failed; treating as end of input");
                EditorRead::Eof
            }
        }
    }

    fn add_recall(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            debug!(error = %e, "could not add recall entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::diagnostics::BufferSink;
    use crate::grammar::Tree;
    use crate::input::Input;
    use std::path::PathBuf;

    struct Empty;

    impl Namespace for Empty {
        fn search_path(&self) -> Vec<PathBuf> {
            Vec::new()
        }

        fn names(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn complete_in(cwd: &Path, line: &str) -> (usize, Vec<String>) {
        let helper = ShellHelper::new(Box::new(Empty));
        let (start, pairs) = helper.candidates(line, line.len(), cwd);
        (start, pairs.into_iter().map(|p| p.replacement).collect())
    }

    #[test]
    fn test_filename_with_space_is_quoted_for_the_lexer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my file"), "").unwrap();

        let line = "cat my";
        let (start, replacements) = complete_in(dir.path(), line);
        assert_eq!(start, 4);
        assert_eq!(replacements, vec!["'my file'"]);

        let completed = format!("{}{}", &line[..start], replacements[0]);
        let mut input = Input::new(InputConfig::new()).with_diagnostics(BufferSink::new());
        assert_eq!(
            input.parse_string(&completed).unwrap(),
            Tree::Command(vec!["cat".to_string(), "my file".to_string()])
        );
    }

    #[test]
    fn test_open_quote_is_replaced_with_the_word() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my file"), "").unwrap();
        std::fs::write(dir.path().join("my notes"), "").unwrap();

        let (start, replacements) = complete_in(dir.path(), "cat 'my");
        assert_eq!(start, 4);
        assert_eq!(replacements, vec!["'my file", "'my notes"]);
    }

    #[test]
    fn test_plain_filename_needs_no_quotes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(complete_in(dir.path(), "cat no"), (4, vec!["notes.txt".to_string()]));
    }
}
