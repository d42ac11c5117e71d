//! Quoting and dequoting of completed words
//!
//! The shell's only quote is `'`; inside quotes a literal quote is written
//! twice. Completed words are quoted as a whole when they contain any
//! character the lexer would otherwise treat specially.

use std::borrow::Cow;
use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

pub const QUOTE: char = '\'';

/// [`QUOTE`] as the lexer sees it
pub const QUOTE_BYTE: u8 = b'\'';

/// Characters that force a completed word into quotes
pub const SPECIAL_CHARS: &str = " \t\n\\'`$><;|&{()}";

/// Characters that separate words for completion
pub const WORD_BREAK_CHARS: &str = " \t\n\\'`><=;|&{()}";

/// Expand a leading `~/` or `~name/` textually.
///
/// `~name` is looked up in the password database; unknown users and a bare
/// `~` are left as written.
pub fn expand_home(text: &str) -> Cow<'_, str> {
    let Some(rest) = text.strip_prefix('~') else {
        return Cow::Borrowed(text);
    };
    let (user, tail) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };

    let home = if user.is_empty() {
        if tail.is_empty() {
            return Cow::Borrowed(text);
        }
        home::home_dir()
    } else {
        user_home(user)
    };

    match home {
        Some(dir) => Cow::Owned(format!("{}{}", dir.display(), tail)),
        None => Cow::Borrowed(text),
    }
}

/// Home directory of `name` from the password database
fn user_home(name: &str) -> Option<PathBuf> {
    let cname = CString::new(name).ok()?;
    let mut buf = vec![0 as libc::c_char; 4096];
    let mut pwd: libc::passwd = unsafe { std::mem::MaybeUninit::zeroed().assume_init() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe {
        libc::getpwnam_r(
            cname.as_ptr(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };
    if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
        return None;
    }

    // pw_dir points into `buf`, which is still alive here.
    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(PathBuf::from(OsStr::from_bytes(dir.to_bytes())))
}

pub fn needs_quoting(text: &str) -> bool {
    text.chars().any(|c| SPECIAL_CHARS.contains(c))
}

/// Quote a word for the lexer: wrap in quotes if needed, doubling
/// embedded quotes.
pub fn escape(text: &str) -> String {
    if !needs_quoting(text) {
        return text.to_string();
    }
    let mut out = open_quoted(text);
    out.push(QUOTE);
    out
}

fn open_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(QUOTE);
    for c in text.chars() {
        if c == QUOTE {
            out.push(QUOTE);
        }
        out.push(c);
    }
    out
}

/// Quote a completion candidate for insertion into the line.
///
/// The closing quote is only written when `single_match` is set and the
/// text does not name a directory, so the user can keep typing a path.
pub fn quote(text: &str, single_match: bool) -> String {
    let text = expand_home(text);
    if !needs_quoting(&text) {
        return text.into_owned();
    }
    let mut out = open_quoted(&text);
    if single_match && !Path::new(text.as_ref()).is_dir() {
        out.push(QUOTE);
    }
    out
}

/// Remove one level of quoting: `''` becomes `'`, a lone `'` is dropped.
pub fn dequote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == QUOTE {
            if chars.peek() == Some(&QUOTE) {
                chars.next();
                out.push(QUOTE);
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Byte offset where the word ending at `pos` starts.
///
/// Break characters inside an open quote do not end the word; an opening
/// quote belongs to the word it starts.
pub fn word_start(line: &str, pos: usize) -> usize {
    let pos = pos.min(line.len());
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in line[..pos].char_indices() {
        if c == QUOTE {
            quoted = !quoted;
        } else if !quoted && WORD_BREAK_CHARS.contains(c) {
            start = i + c.len_utf8();
        }
    }
    start
}
