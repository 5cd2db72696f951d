//! Monotonic elapsed-seconds source, initialized once per process.

use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// A handle onto the process-wide reference instant.
///
/// There is exactly one reference instant per process; [`Clock::init`] sets
/// it the first time it's called and is a no-op afterward.
pub struct Clock;

impl Clock {
    /// Set the reference instant to now, if it hasn't been set already.
    pub fn init() {
        START.get_or_init(Instant::now);
    }

    /// Seconds elapsed since [`Clock::init`] was first called.
    ///
    /// Panics if called before `init`, since every caller in this crate
    /// initializes the clock at startup before spawning any other activity.
    pub fn elapsed() -> f64 {
        START
            .get()
            .expect("Clock::init must be called before Clock::elapsed")
            .elapsed()
            .as_secs_f64()
    }
}
