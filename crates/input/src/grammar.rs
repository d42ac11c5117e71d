//! Reference grammar
//!
//! The engine only needs something that pulls characters through
//! [`Input::get_char`] and returns one tree per call. This grammar is
//! deliberately small: words separated by blanks, commands separated by `;`,
//! one line per tree, `#` comments, and single-quoted strings in which `''`
//! stands for a literal quote. A quoted string may span lines.

use crate::error::Signal;
use crate::input::Input;
use crate::quoting;
use std::fmt;

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    /// A blank or comment-only line
    Empty,
    /// One simple command: the command word followed by its arguments
    Command(Vec<String>),
    /// Commands separated by `;`
    Sequence(Vec<Tree>),
}

impl Tree {
    pub fn is_empty(&self) -> bool {
        matches!(self, Tree::Empty)
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Empty => Ok(()),
            Tree::Command(words) => {
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    if word.is_empty() || quoting::needs_quoting(word) {
                        f.write_str(&quoting::escape(word))?;
                    } else {
                        f.write_str(word)?;
                    }
                }
                Ok(())
            }
            Tree::Sequence(trees) => {
                for (i, tree) in trees.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", tree)?;
                }
                Ok(())
            }
        }
    }
}

/// Grammar entry point. `Ok(None)` means the parse failed; the reason has
/// been recorded with [`Input::record_error`].
pub type GrammarFn = fn(&mut Input) -> Result<Option<Tree>, Signal>;

/// Parse one line into a tree.
pub fn parse_line(input: &mut Input) -> Result<Option<Tree>, Signal> {
    let mut commands = Vec::new();
    let mut words = Vec::new();

    loop {
        let Some(c) = input.get_char()? else {
            break;
        };
        match c {
            b' ' | b'\t' => continue,
            b'\n' => break,
            b';' => finish_command(&mut commands, &mut words),
            b'#' => {
                skip_comment(input)?;
                break;
            }
            _ => {
                input.pushback(c);
                input.begin_token();
                match read_word(input)? {
                    Some(word) => words.push(word),
                    None => return Ok(None),
                }
            }
        }
    }
    finish_command(&mut commands, &mut words);

    let tree = match commands.len() {
        0 => Tree::Empty,
        1 => commands.remove(0),
        _ => Tree::Sequence(commands),
    };
    Ok(Some(tree))
}

fn finish_command(commands: &mut Vec<Tree>, words: &mut Vec<String>) {
    if !words.is_empty() {
        commands.push(Tree::Command(std::mem::take(words)));
    }
}

fn skip_comment(input: &mut Input) -> Result<(), Signal> {
    while let Some(c) = input.get_char()? {
        if c == b'\n' {
            break;
        }
    }
    Ok(())
}

fn read_word(input: &mut Input) -> Result<Option<String>, Signal> {
    let mut word = Vec::new();
    while let Some(c) = input.get_char()? {
        match c {
            b' ' | b'\t' | b'\n' | b';' => {
                input.pushback(c);
                break;
            }
            quoting::QUOTE_BYTE => {
                if !read_quoted(input, &mut word)? {
                    return Ok(None);
                }
            }
            _ => word.push(c),
        }
    }
    Ok(Some(String::from_utf8_lossy(&word).into_owned()))
}

/// Read the rest of a quoted string; the opening quote is already consumed.
/// Returns false when input ended inside the quotes.
fn read_quoted(input: &mut Input, word: &mut Vec<u8>) -> Result<bool, Signal> {
    loop {
        let Some(c) = input.get_char()? else {
            input.record_error("eof in quoted string");
            return Ok(false);
        };
        match c {
            quoting::QUOTE_BYTE => match input.get_char()? {
                Some(quoting::QUOTE_BYTE) => word.push(quoting::QUOTE_BYTE),
                Some(next) => {
                    input.pushback(next);
                    return Ok(true);
                }
                None => return Ok(true),
            },
            b'\n' => {
                input.set_continued(true);
                word.push(c);
            }
            _ => word.push(c),
        }
    }
}
