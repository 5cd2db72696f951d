//! Background activity that non-blockingly collects exited children and
//! records their raw wait status and runtime into their slot.

use crate::clock::Clock;
use crate::signals;
use crate::slot::SlotTable;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Brief pause between empty poll attempts, to avoid spinning the CPU
/// while waiting for a child to exit or for new children to be dispatched.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(20);

fn raw_status_of(status: &WaitStatus) -> i32 {
    // Reconstruct the waitpid(2) encoding so the report line's RETVAL
    // field matches what a shell or another waitpid caller would see.
    match *status {
        WaitStatus::Exited(_, code) => (code & 0xff) << 8,
        WaitStatus::Signaled(_, signal, core_dumped) => {
            let sig = signal as i32;
            sig | if core_dumped { 0x80 } else { 0 }
        }
        _ => 0,
    }
}

/// Run the reaper loop. Intended to run on its own background thread;
/// returns once `signals::is_draining(&draining)` is set and no children
/// remain to reap at all (ECHILD from `waitpid`).
///
/// `WaitStatus::StillAlive` only means "no child changed state since the
/// last poll" — children may well still be alive and running (e.g. a
/// soft-interrupted task that hasn't exited yet). It must never be treated
/// as "no children remain"; only `ECHILD` (waitpid has nothing left to
/// wait for) means that.
pub fn run(slots: SlotTable, draining: Arc<AtomicBool>) {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => {
                thread::sleep(IDLE_POLL_INTERVAL);
            }
            Ok(status @ (WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _))) => {
                record_exit(&slots, pid, raw_status_of(&status));
            }
            Ok(_other) => {
                // Stopped/continued notifications: not terminal, keep polling.
            }
            Err(nix::errno::Errno::ECHILD) => {
                if signals::is_draining(&draining) {
                    return;
                }
                thread::sleep(IDLE_POLL_INTERVAL);
            }
            Err(nix::errno::Errno::EINTR) => continue,
            Err(err) => {
                log::warn!("reaper: unexpected waitpid error: {err}");
                thread::sleep(IDLE_POLL_INTERVAL);
            }
        }
    }
}

fn record_exit(slots: &SlotTable, pid: Pid, raw_status: i32) {
    let now = Clock::elapsed();
    for slot in slots {
        let mut guard = slot.lock().unwrap();
        if guard.running && guard.pid == Some(pid.as_raw()) {
            guard.runtime_secs = now - guard.start_time;
            guard.raw_wait_status = raw_status;
            // `running` is written last: the scheduler only trusts
            // `raw_wait_status`/`runtime_secs` once it observes `running
            // == false`.
            guard.running = false;
            return;
        }
    }
    log::warn!("reaper: reaped pid {pid} that is not owned by any running slot");
}
