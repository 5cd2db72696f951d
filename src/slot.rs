//! The slot table: one entry per unit of parallelism, each holding at most
//! one active child's metadata.

use crate::queue::Task;
use std::sync::{Arc, Mutex};

/// The supervisor's classification of how a task ended. Distinct from the
/// child's own raw wait status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Timeout,
    Memout,
    NaturalExit,
}

impl Outcome {
    /// The `<STATUS>` token used in the report line protocol.
    pub fn as_report_str(self) -> &'static str {
        match self {
            Outcome::Timeout => "TIMEOUT",
            Outcome::Memout => "MEMOUT",
            // `Running` should never reach report formatting; finalize()
            // always rewrites it to `NaturalExit` first if nothing else
            // already classified it.
            Outcome::Running | Outcome::NaturalExit => "EXIT",
        }
    }
}

/// One worker slot. Empty when `pid.is_none()`.
#[derive(Default)]
pub struct Slot {
    pub task: Option<Task>,
    pub pid: Option<i32>,
    pub start_time: f64,
    pub last_limit_check: f64,
    pub outcome: Option<Outcome>,
    pub ko_counter: u32,
    pub raw_wait_status: i32,
    pub runtime_secs: f64,
    pub peak_rss_kib: u64,
    /// True from exec until the reaper records exit; flipped by the
    /// reaper as its last write for this slot.
    pub running: bool,
}

impl Slot {
    fn empty() -> Self {
        Slot::default()
    }

    /// Reset a slot to Empty, clearing every counter. Invoked both at
    /// startup and whenever a finalized slot is cleared for reuse.
    pub fn clear(&mut self) {
        *self = Slot::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.pid.is_none()
    }
}

/// Fixed-size array of slots, shared between the scheduler thread and the
/// reaper thread behind a mutex per slot.
pub type SlotTable = Vec<Arc<Mutex<Slot>>>;

pub fn new_slot_table(num_processes: usize) -> SlotTable {
    (0..num_processes)
        .map(|_| Arc::new(Mutex::new(Slot::empty())))
        .collect()
}
