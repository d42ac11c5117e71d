//! Terminal geometry cache
//!
//! rustyline tracks the window size on its own; this cache is for
//! collaborators that lay out output themselves.
//!
//! [`refresh`] is safe to call from a signal handler: it performs one
//! `ioctl` and stores the result in atomics. No allocation, no locks.

use std::sync::atomic::{AtomicU16, Ordering};

static ROWS: AtomicU16 = AtomicU16::new(0);
static COLUMNS: AtomicU16 = AtomicU16::new(0);

/// Re-query the size of the terminal on stdout and update the cache.
/// Leaves the cache untouched when stdout is not a terminal.
pub fn refresh() {
    let mut ws: libc::winsize = unsafe { std::mem::MaybeUninit::zeroed().assume_init() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if rc == 0 && ws.ws_col > 0 {
        ROWS.store(ws.ws_row, Ordering::Relaxed);
        COLUMNS.store(ws.ws_col, Ordering::Relaxed);
    }
}

/// Cached `(rows, columns)`, if a terminal size was ever observed
pub fn geometry() -> Option<(u16, u16)> {
    let columns = COLUMNS.load(Ordering::Relaxed);
    if columns == 0 {
        return None;
    }
    Some((ROWS.load(Ordering::Relaxed), columns))
}

/// Refresh the cache whenever the window changes size
#[cfg(unix)]
pub fn install_resize_handler() -> std::io::Result<()> {
    refresh();
    // SAFETY: `refresh` only issues an ioctl and stores into atomics.
    unsafe { signal_hook::low_level::register(signal_hook::consts::SIGWINCH, refresh)? };
    Ok(())
}
