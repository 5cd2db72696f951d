//! The main cooperative loop: finalizes completed slots, enforces limits
//! on running slots, forwards the draining signal, and fills empty slots
//! with new tasks.

use crate::clock::Clock;
use crate::queue::Task;
use crate::slot::{new_slot_table, Outcome, SlotTable};
use crate::{affinity, procstat, reaper, report, signals, spawner};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One second, the polling granularity named explicitly in `spec.md` §4.8.
/// A design choice, not a correctness requirement (`spec.md` §9).
const LIMIT_CHECK_INTERVAL_SECS: f64 = 1.0;

/// Escalation threshold: the fifth soft-interrupt attempt upgrades to an
/// uncatchable kill.
const HARD_KILL_AT_KO_COUNT: u32 = 5;

/// Pause between full slot-table passes when nothing changed, to avoid
/// spinning the CPU (`spec.md` §5: "10-100 ms is reasonable, unspecified").
const LOOP_PACING: Duration = Duration::from_millis(20);

pub struct Config {
    pub num_processes: usize,
    pub threads_per_process: usize,
    pub timelim_secs: f64,
    pub memlim_kib: i64,
    pub output_dir: PathBuf,
    pub recurse_children: bool,
    pub quiet: bool,
}

/// Run the scheduler to completion: drains `tasks`, dispatching onto
/// `config.num_processes` slots, until the queue is empty and every slot is
/// idle (or until draining cuts the run short). Blocks until the reaper
/// thread has joined.
pub fn run(config: Config, mut tasks: VecDeque<Task>) {
    Clock::init();
    let total_tasks = tasks.len();
    let mut done_count = 0usize;

    let slots: SlotTable = new_slot_table(config.num_processes);

    let draining_flag = match signals::install() {
        Ok(flag) => flag,
        Err(err) => {
            log::warn!("failed to install signal handlers: {err} - SIGINT/SIGTERM will not be caught");
            Arc::new(AtomicBool::new(false))
        }
    };

    let reaper_slots = slots.clone();
    let reaper_draining = Arc::clone(&draining_flag);
    let reaper_handle = thread::spawn(move || reaper::run(reaper_slots, reaper_draining));

    loop {
        let draining = signals::is_draining(&draining_flag);
        let mut any_occupied = false;

        for (index, slot) in slots.iter().enumerate() {
            let mut guard = slot.lock().unwrap();

            if guard.pid.is_some() {
                any_occupied = true;

                if !guard.running {
                    finalize_slot(&mut guard, &config, &mut done_count, total_tasks);
                    // Falls through to the dispatch check below: a slot
                    // just vacated this iteration is eligible to be
                    // refilled in the same pass, matching the reference
                    // implementation's single per-slot sweep.
                } else {
                    enforce_slot(&mut guard, &config, draining);
                }
            }

            if draining {
                continue;
            }

            if guard.is_empty() {
                if let Some(task) = tasks.pop_front() {
                    dispatch_task(&mut guard, task, index, &config);
                    any_occupied |= guard.pid.is_some();
                }
            }
        }

        if !any_occupied && tasks.is_empty() {
            signals::set_draining(&draining_flag);
            break;
        }

        if draining && !any_occupied {
            break;
        }

        thread::sleep(LOOP_PACING);
    }

    reaper_handle.join().expect("reaper thread panicked");
}

fn finalize_slot(
    guard: &mut crate::slot::Slot,
    config: &Config,
    done_count: &mut usize,
    total_tasks: usize,
) {
    let outcome = match guard.outcome {
        Some(o @ (Outcome::Timeout | Outcome::Memout)) => o,
        _ => Outcome::NaturalExit,
    };
    let instance_id = guard
        .task
        .as_ref()
        .map(|t| t.instance_id)
        .expect("finalized slot must have a task");

    report::emit_result(
        &config.output_dir,
        instance_id,
        outcome,
        guard.raw_wait_status,
        guard.runtime_secs,
        guard.peak_rss_kib,
        config.quiet,
    );
    *done_count += 1;
    report::emit_end(instance_id, *done_count, total_tasks, config.quiet);

    guard.clear();
}

fn enforce_slot(guard: &mut crate::slot::Slot, config: &Config, draining: bool) {
    let Some(pid) = guard.pid else { return };

    if draining {
        send_signal(pid, Signal::SIGINT);
        return;
    }

    let now = Clock::elapsed();
    if now - guard.last_limit_check < LIMIT_CHECK_INTERVAL_SECS {
        return;
    }
    guard.last_limit_check = now;

    if config.timelim_secs > 0.0 && now - guard.start_time > config.timelim_secs {
        guard.outcome = Some(Outcome::Timeout);
        send_signal(pid, Signal::SIGINT);
        guard.ko_counter += 1;
    } else {
        let rss = procstat::sample_rss(pid, config.recurse_children);
        guard.peak_rss_kib = guard.peak_rss_kib.max(rss);
        if config.memlim_kib > 0 && guard.peak_rss_kib as i64 > config.memlim_kib {
            guard.outcome = Some(Outcome::Memout);
            send_signal(pid, Signal::SIGINT);
            guard.ko_counter += 1;
        }
    }

    if guard.ko_counter >= HARD_KILL_AT_KO_COUNT {
        send_signal(pid, Signal::SIGKILL);
    }
}

fn dispatch_task(guard: &mut crate::slot::Slot, task: Task, index: usize, config: &Config) {
    let instance_id = task.instance_id;
    let instance_dir = report::instance_dir(&config.output_dir, instance_id);
    if let Err(err) = std::fs::create_dir_all(&instance_dir) {
        log::warn!(
            "instance {instance_id}: cannot create directory `{}`: {err} - skipping",
            instance_dir.display()
        );
        // Leave the slot empty; this task is abandoned, not retried, and
        // never reported, per spec.md §7.
        return;
    }

    let log_path = report::log_path(&config.output_dir, instance_id);
    match spawner::spawn(&task.argv, &log_path) {
        Ok(pid) => {
            report::emit_begin(instance_id, config.quiet);
            let raw_pid = pid.as_raw();
            affinity::pin(
                raw_pid,
                config.threads_per_process * index,
                config.threads_per_process,
            );
            let now = Clock::elapsed();
            guard.task = Some(task);
            guard.pid = Some(raw_pid);
            guard.start_time = now;
            guard.last_limit_check = now;
            guard.outcome = Some(Outcome::Running);
            guard.ko_counter = 0;
            guard.running = true;
        }
        Err(err) => {
            log::warn!("instance {instance_id}: failed to start: {err} - skipping");
        }
    }
}

fn send_signal(pid: i32, sig: Signal) {
    if let Err(err) = signal::kill(Pid::from_raw(pid), sig) {
        log::debug!("sending {sig:?} to pid {pid}: {err}");
    }
}

/// Pin the supervisor process itself to the two CPUs immediately following
/// all worker slots' CPU ranges, as described in `spec.md` §5.
pub fn pin_self(num_processes: usize, threads_per_process: usize) {
    affinity::pin(
        std::process::id() as i32,
        threads_per_process * num_processes,
        2,
    );
}
