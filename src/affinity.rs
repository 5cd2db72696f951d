//! Best-effort CPU affinity pinning.

use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;

/// Restrict `pid`'s runnable CPU set to `[first_cpu, first_cpu + n_cpus)`.
///
/// Errors from the OS (invalid CPU index, process already gone, permission
/// denied) are logged and otherwise ignored: affinity is a scheduling hint,
/// not a correctness requirement, and the caller is expected to have chosen
/// a legal range.
pub fn pin(pid: i32, first_cpu: usize, n_cpus: usize) {
    let mut set = CpuSet::new();
    for cpu in first_cpu..first_cpu + n_cpus {
        if let Err(err) = set.set(cpu) {
            log::debug!("affinity: cpu index {cpu} out of range for pid {pid}: {err}");
            return;
        }
    }
    if let Err(err) = sched_setaffinity(Pid::from_raw(pid), &set) {
        log::debug!("affinity: failed to pin pid {pid} to cpus [{first_cpu}, {}): {err}", first_cpu + n_cpus);
    }
}
