//! Report line formatting and per-task log directory writing.

use crate::slot::Outcome;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `<output_dir>/<instance_id>/`
pub fn instance_dir(output_dir: &Path, instance_id: i64) -> PathBuf {
    output_dir.join(instance_id.to_string())
}

/// `<output_dir>/<instance_id>/rw`
pub fn log_path(output_dir: &Path, instance_id: i64) -> PathBuf {
    instance_dir(output_dir, instance_id).join("rw")
}

/// Build the report line body (without the leading instance id), exactly
/// as it appears in the per-task log file.
pub fn format_report_body(outcome: Outcome, raw_wait_status: i32, runtime_secs: f64, peak_rss_kib: u64) -> String {
    format!(
        "RUNWATCH_RESULT {} RETVAL {} TIME_SECS {} MEMPEAK_KBS {}",
        outcome.as_report_str(),
        raw_wait_status,
        runtime_secs,
        peak_rss_kib,
    )
}

/// Append a line to the per-task log file. Best-effort: failures are
/// logged and otherwise swallowed, per `spec.md` §7 ("log-file write
/// failure... the supervisor does not retry or error out").
pub fn append_log_line(output_dir: &Path, instance_id: i64, line: &str) {
    let path = log_path(output_dir, instance_id);
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| writeln!(f, "{line}"));
    if let Err(err) = result {
        log::warn!("instance {instance_id}: failed to append to log `{}`: {err}", path.display());
    }
}

/// Emit `<instance_id> BEGIN` to stdout, unless quiet.
pub fn emit_begin(instance_id: i64, quiet: bool) {
    if !quiet {
        println!("{instance_id} BEGIN");
    }
}

/// Emit the full report line (with leading instance id) to stdout, unless
/// quiet, and append the same line (without the instance id) to the
/// per-task log.
pub fn emit_result(
    output_dir: &Path,
    instance_id: i64,
    outcome: Outcome,
    raw_wait_status: i32,
    runtime_secs: f64,
    peak_rss_kib: u64,
    quiet: bool,
) {
    let body = format_report_body(outcome, raw_wait_status, runtime_secs, peak_rss_kib);
    if !quiet {
        println!("{instance_id} {body}");
    }
    append_log_line(output_dir, instance_id, &body);
}

/// Emit `<instance_id> END (<done>/<total> done)` to stdout, unless quiet.
pub fn emit_end(instance_id: i64, done: usize, total: usize, quiet: bool) {
    if !quiet {
        println!("{instance_id} END ({done}/{total} done)");
    }
}
