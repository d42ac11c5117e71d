//! xs input: the character source layer of the xs shell
//!
//! Everything between a file descriptor (or a string, or the line editor)
//! and the grammar: buffered sources with bounded pushback, location
//! tracking, the interactive line-editor bridge with completion and
//! quoting, the shared history file, and the source stack that run entry
//! points push onto and pop from.
//!
//! # Modules
//!
//! - `input`: the [`Input`] context, lexer primitives, parse and run entry points
//! - `source`: descriptor- and text-backed sources with pushback
//! - `location`: line/column spans that move back exactly on pushback
//! - `editor`: the [`LineReader`] seam and its rustyline implementation
//! - `completion`, `quoting`: completion candidates and their quoting
//! - `history`: the append-only history log shared between shells
//! - `dispatch`: evaluation modes and the command loops
//! - `grammar`: a small line grammar producing [`Tree`]s

pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod grammar;
pub mod history;
pub mod input;
pub mod location;
pub mod quoting;
pub mod signals;
pub mod source;
pub mod terminal;

pub use completion::{Completions, Namespace};
pub use config::{InputConfig, RunFlags};
pub use diagnostics::{BufferSink, Diagnostics, StderrSink};
pub use dispatch::{Dispatch, EvalMode, Evaluator, Value, exit_status, is_true, true_value};
pub use editor::{EditorRead, LineReader, RustylineReader};
pub use error::Signal;
pub use grammar::{GrammarFn, Tree};
pub use history::HistoryLog;
pub use input::{Input, Parsed};
pub use location::Span;
pub use signals::Interrupts;
pub use source::{Backing, MAX_UNGET, Source};
