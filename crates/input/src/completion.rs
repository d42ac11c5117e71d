//! Command, variable and filename completion
//!
//! Candidates are gathered in a fixed order: commands found on the search
//! path, then variables (for a `$` fragment) or functions, then plain
//! filenames. Filenames are only added here when something else matched;
//! otherwise the caller falls back to its own filename listing.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Functions are stored in the namespace under this prefix
pub const FUNCTION_PREFIX: &str = "fn-";

/// Leading character of a variable reference
pub const VARIABLE_SIGIL: char = '$';

/// The slice of the variable namespace completion needs.
pub trait Namespace {
    /// Directories searched for commands, in order
    fn search_path(&self) -> Vec<PathBuf>;

    /// Every defined name, including `fn-` function storage
    fn names(&self) -> Vec<String>;
}

/// Result of a completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completions {
    /// Common prefix of all candidates (the candidate itself when there is
    /// only one, the fragment when they share nothing)
    pub header: String,
    pub candidates: Vec<String>,
}

impl Completions {
    /// Header followed by every candidate
    pub fn into_list(self) -> Vec<String> {
        let mut list = Vec::with_capacity(self.candidates.len() + 1);
        list.push(self.header);
        list.extend(self.candidates);
        list
    }
}

/// Complete `fragment`, resolving relative filenames against `cwd`.
///
/// Returns `None` for an empty fragment and when nothing matched.
pub fn complete(fragment: &str, namespace: &dyn Namespace, cwd: &Path) -> Option<Completions> {
    if fragment.is_empty() {
        return None;
    }

    let mut candidates = Vec::new();

    if !fragment.contains('/') {
        let pattern = format!("{}*", fragment);
        for dir in namespace.search_path() {
            candidates.extend(glob_dir(&dir, &pattern));
        }
    }

    let names: BTreeSet<String> = namespace.names().into_iter().collect();
    if let Some(rest) = fragment.strip_prefix(VARIABLE_SIGIL) {
        candidates.extend(
            names
                .iter()
                .filter(|name| !name.starts_with(FUNCTION_PREFIX) && name.starts_with(rest))
                .map(|name| format!("{}{}", VARIABLE_SIGIL, name)),
        );
    } else {
        candidates.extend(
            names
                .iter()
                .filter_map(|name| name.strip_prefix(FUNCTION_PREFIX))
                .filter(|name| name.starts_with(fragment))
                .map(str::to_string),
        );
    }

    if candidates.is_empty() {
        return None;
    }
    candidates.extend(filename_completions(fragment, cwd));

    let header = match candidates.as_slice() {
        [only] => only.clone(),
        _ => {
            let prefix = common_prefix(&candidates);
            if prefix.is_empty() {
                fragment.to_string()
            } else {
                prefix
            }
        }
    };
    Some(Completions { header, candidates })
}

/// Filenames beginning with `fragment`, keeping the directory part as typed.
pub fn filename_completions(fragment: &str, cwd: &Path) -> Vec<String> {
    let (dir_part, base) = match fragment.rfind('/') {
        Some(slash) => (&fragment[..=slash], &fragment[slash + 1..]),
        None => ("", fragment),
    };

    let expanded = crate::quoting::expand_home(dir_part);
    let dir = if expanded.is_empty() {
        cwd.to_path_buf()
    } else {
        cwd.join(expanded.as_ref())
    };

    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with(base))
        .filter(|name| base.starts_with('.') || !name.starts_with('.'))
        .map(|name| format!("{}{}", dir_part, name))
        .collect();
    names.sort();
    names
}

/// Base names in `dir` matching the wildcard `pattern`, sorted.
fn glob_dir(dir: &Path, pattern: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let pattern: Vec<char> = pattern.chars().collect();
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| {
            let name: Vec<char> = name.chars().collect();
            // Dotfiles only match an explicit leading dot.
            (pattern.first() == Some(&'.') || name.first() != Some(&'.'))
                && wildcard_match(&pattern, &name)
        })
        .collect();
    names.sort();
    names
}

/// Match `*`, `?` and `[...]` (with `!` / `^` negation and ranges).
fn wildcard_match(pattern: &[char], name: &[char]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some(('*', rest)) => (0..=name.len()).any(|skip| wildcard_match(rest, &name[skip..])),
        Some(('?', rest)) => !name.is_empty() && wildcard_match(rest, &name[1..]),
        Some(('[', rest)) => {
            let Some((&c, name_rest)) = name.split_first() else {
                return false;
            };
            match match_class(rest, c) {
                Some((true, after)) => wildcard_match(after, name_rest),
                Some((false, _)) => false,
                // No closing bracket: a literal '['.
                None => c == '[' && wildcard_match(rest, name_rest),
            }
        }
        Some((&p, rest)) => name.first() == Some(&p) && wildcard_match(rest, &name[1..]),
    }
}

/// Match `c` against a bracket class whose `[` is already consumed.
/// Returns the verdict and the pattern after the closing `]`.
fn match_class(class: &[char], c: char) -> Option<(bool, &[char])> {
    let (negated, mut body) = match class.first() {
        Some('!') | Some('^') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut matched = false;
    let mut first = true;
    loop {
        match body {
            [] => return None,
            [']', rest @ ..] if !first => return Some((matched != negated, rest)),
            [lo, '-', hi, rest @ ..] if *hi != ']' => {
                matched |= *lo <= c && c <= *hi;
                body = rest;
            }
            [x, rest @ ..] => {
                matched |= *x == c;
                body = rest;
            }
        }
        first = false;
    }
}

fn common_prefix(words: &[String]) -> String {
    let Some((first, rest)) = words.split_first() else {
        return String::new();
    };
    let mut len = first.len();
    for word in rest {
        len = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    first[..len].to_string()
}
