//! Interrupt bookkeeping
//!
//! Signal handlers only set an atomic flag (async-signal-safe). The flag is
//! consulted and cleared at explicit dispatch points: after a blocking line
//! editor call and when a descriptor read is interrupted. Nothing that
//! touches source buffers ever runs in signal context.

use crate::error::Signal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The process-level "interrupt pending" flag plus the "blocking call in
/// progress" marker.
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    pending: Arc<AtomicBool>,
    in_call: Arc<AtomicBool>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT to the pending flag
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<()> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.pending))?;
        tracing::debug!("SIGINT routed to the interrupt flag");
        Ok(())
    }

    /// Mark an interrupt as pending, as the signal handler would
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether a blocking line-editor call is currently in progress
    pub fn in_blocking_call(&self) -> bool {
        self.in_call.load(Ordering::Acquire)
    }

    /// Mark the start of a blocking call; the marker clears when the guard drops.
    pub fn enter_blocking_call(&self) -> BlockingCall<'_> {
        self.in_call.store(true, Ordering::Release);
        BlockingCall { interrupts: self }
    }

    /// Turn a pending interrupt into [`Signal::Interrupt`], clearing it
    pub fn dispatch(&self) -> Result<(), Signal> {
        if self.pending.swap(false, Ordering::AcqRel) {
            tracing::debug!("dispatching pending interrupt");
            return Err(Signal::Interrupt);
        }
        Ok(())
    }
}

/// Guard returned by [`Interrupts::enter_blocking_call`]
#[derive(Debug)]
pub struct BlockingCall<'a> {
    interrupts: &'a Interrupts,
}

impl Drop for BlockingCall<'_> {
    fn drop(&mut self) {
        self.interrupts.in_call.store(false, Ordering::Release);
    }
}
