//! End-to-end scenarios against real spawned processes, mirroring the
//! literal scenarios enumerated in the supervisor's testable properties.

use runwatchd::scheduler::{self, Config};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::tempdir;

fn base_config(output_dir: PathBuf, num_processes: usize) -> Config {
    Config {
        num_processes,
        threads_per_process: 1,
        timelim_secs: 0.0,
        memlim_kib: 0,
        output_dir,
        recurse_children: false,
        quiet: true,
    }
}

fn task(instance_id: i64, argv: &[&str]) -> runwatchd::queue::Task {
    runwatchd::queue::Task {
        instance_id,
        argv: argv.iter().map(|s| s.to_string()).collect(),
    }
}

fn read_log(dir: &Path, instance_id: i64) -> String {
    fs::read_to_string(dir.join(instance_id.to_string()).join("rw"))
        .unwrap_or_else(|_| panic!("missing log for instance {instance_id}"))
}

#[test]
fn scenario_1_true_exits_zero() {
    let dir = tempdir().unwrap();
    let mut config = base_config(dir.path().to_path_buf(), 1);
    config.quiet = true;
    let tasks = VecDeque::from([task(1, &["/bin/true"])]);

    scheduler::run(config, tasks);

    let log = read_log(dir.path(), 1);
    assert!(log.contains("RUNWATCH_RESULT EXIT RETVAL 0"));
}

#[test]
fn scenario_2_sleep_times_out() {
    let dir = tempdir().unwrap();
    let mut config = base_config(dir.path().to_path_buf(), 1);
    config.timelim_secs = 1.0;
    let tasks = VecDeque::from([task(1, &["/bin/sleep", "10"])]);

    let start = Instant::now();
    scheduler::run(config, tasks);
    let elapsed = start.elapsed().as_secs_f64();

    let log = read_log(dir.path(), 1);
    assert!(log.contains("RUNWATCH_RESULT TIMEOUT"));
    assert!(elapsed >= 1.0, "expected runtime >= 1s, got {elapsed}");
    assert!(elapsed < 8.0, "expected runtime < ~8s, got {elapsed}");
}

#[test]
fn scenario_4_ten_tasks_three_slots() {
    let dir = tempdir().unwrap();
    let config = base_config(dir.path().to_path_buf(), 3);
    let tasks: VecDeque<_> = (1..=10).map(|id| task(id, &["/bin/true"])).collect();

    scheduler::run(config, tasks);

    for id in 1..=10 {
        let log = read_log(dir.path(), id);
        assert!(
            log.contains("RUNWATCH_RESULT EXIT RETVAL 0"),
            "instance {id} log missing a clean exit report: {log}"
        );
    }
}

#[test]
fn scenario_5_unresponsive_child_is_force_killed() {
    let dir = tempdir().unwrap();
    let mut config = base_config(dir.path().to_path_buf(), 1);
    config.timelim_secs = 1.0;
    // Ignores SIGINT; only SIGKILL (via the escalation counter) will end it.
    let tasks = VecDeque::from([task(
        1,
        &["/bin/sh", "-c", "trap '' INT; sleep 30"],
    )]);

    let start = Instant::now();
    scheduler::run(config, tasks);
    let elapsed = start.elapsed().as_secs_f64();

    let log = read_log(dir.path(), 1);
    assert!(log.contains("RUNWATCH_RESULT TIMEOUT"));
    // One soft interrupt per ~1s tick, hard kill on the 5th: bounded well
    // under the 30s the child would otherwise sleep for.
    assert!(elapsed < 15.0, "expected forced termination well under 15s, got {elapsed}");
}

#[test]
fn scenario_6_recurse_children_toggles_memout() {
    // A parent that forks a memory-hungry child and waits for it. `yes`
    // avoids embedded NUL bytes (which `/dev/zero` would produce and which
    // would truncate the shell's command-substitution variable).
    let argv = [
        "/bin/sh",
        "-c",
        "/bin/sh -c 'a=$(yes | head -c 20000000); sleep 2' & wait",
    ];

    let without_recurse = {
        let dir = tempdir().unwrap();
        let mut config = base_config(dir.path().to_path_buf(), 1);
        config.memlim_kib = 10 * 1024;
        config.recurse_children = false;
        scheduler::run(config, VecDeque::from([task(1, &argv)]));
        read_log(dir.path(), 1)
    };
    assert!(
        !without_recurse.contains("MEMOUT"),
        "expected no MEMOUT without --recurse-children, got: {without_recurse}"
    );

    let with_recurse = {
        let dir = tempdir().unwrap();
        let mut config = base_config(dir.path().to_path_buf(), 1);
        config.memlim_kib = 10 * 1024;
        config.recurse_children = true;
        scheduler::run(config, VecDeque::from([task(1, &argv)]));
        read_log(dir.path(), 1)
    };
    assert!(
        with_recurse.contains("MEMOUT"),
        "expected MEMOUT with --recurse-children, got: {with_recurse}"
    );
}

#[test]
fn directory_creation_failure_is_skipped_without_a_report() {
    let dir = tempdir().unwrap();
    // Make the output directory itself unwritable so mkdir -p fails.
    let unwritable = dir.path().join("locked");
    fs::create_dir(&unwritable).unwrap();
    let mut perms = fs::metadata(&unwritable).unwrap().permissions();
    std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o500);
    fs::set_permissions(&unwritable, perms).unwrap();

    let config = base_config(unwritable.clone(), 1);
    let tasks = VecDeque::from([task(1, &["/bin/true"])]);
    scheduler::run(config, tasks);

    assert!(!unwritable.join("1").exists());
}
