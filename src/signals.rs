//! Installs `SIGINT`/`SIGTERM` handlers that set a "draining" flag owned by
//! the run that installed them. Once set, the flag never clears for the
//! lifetime of that run.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Create a fresh draining flag and register `SIGINT`/`SIGTERM` to set it.
/// Intended to be called once at the top of each `scheduler::run`: every
/// call rebinds the process's signal handlers to the newly returned flag,
/// so a later run's signals never touch an earlier run's flag.
pub fn install() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))
        .context("registering SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag))
        .context("registering SIGTERM handler")?;
    Ok(flag)
}

/// Read the current value of a draining flag.
pub fn is_draining(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Set a draining flag directly. Used by the scheduler loop itself once
/// the queue is empty and no slots remain occupied, so that the reaper
/// thread can stop polling.
pub fn set_draining(flag: &AtomicBool) {
    flag.store(true, Ordering::SeqCst)
}
