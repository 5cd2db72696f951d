//! Reads `/proc/<pid>/stat` for resident set size, in KiB.

use nix::unistd::{sysconf, SysconfVar};
use std::fs;

/// Field index of `rss` in `/proc/<pid>/stat`, counting fields *after* the
/// closing paren of `comm` (so `state` is field 0).
///
/// `pid comm state ppid pgrp session tty_nr tpgid flags minflt cminflt
/// majflt cmajflt utime stime cutime cstime priority nice num_threads
/// itrealvalue starttime vsize rss`
const RSS_FIELD_AFTER_COMM: usize = 21;

fn page_size_kib() -> u64 {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(bytes)) if bytes > 0 => bytes as u64 / 1024,
        _ => 4, // the overwhelmingly common default (4 KiB pages)
    }
}

/// Parse the rss field (in pages) out of the contents of a `/proc/<pid>/stat`
/// file. `comm` is parenthesized and may itself contain spaces or nested
/// parens, so we locate it by its last `)` rather than by naive whitespace
/// splitting of the whole line.
fn parse_rss_pages(stat_contents: &str) -> Option<u64> {
    let close_paren = stat_contents.rfind(')')?;
    let rest = &stat_contents[close_paren + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    fields
        .get(RSS_FIELD_AFTER_COMM)
        .and_then(|s| s.parse::<i64>().ok())
        .map(|rss| rss.max(0) as u64)
}

fn children_of(pid: i32) -> Vec<i32> {
    let path = format!("/proc/{pid}/task/{pid}/children");
    match fs::read_to_string(&path) {
        Ok(contents) => contents
            .split_whitespace()
            .filter_map(|tok| tok.parse::<i32>().ok())
            .collect(),
        Err(err) => {
            log::debug!("procstat: cannot read `{path}` (process likely exited): {err}");
            Vec::new()
        }
    }
}

/// Sample the resident set size of `pid`, in KiB. Returns `0` if the
/// process is already gone rather than erroring: races with process exit
/// are expected, not exceptional.
///
/// When `recurse` is true, also sums the RSS of all descendant processes,
/// discovered via `/proc/<pid>/task/<pid>/children`. A child that vanishes
/// mid-read contributes `0`.
pub fn sample_rss(pid: i32, recurse: bool) -> u64 {
    let stat_path = format!("/proc/{pid}/stat");
    let rss_kib = match fs::read_to_string(&stat_path) {
        Ok(contents) => parse_rss_pages(&contents)
            .map(|pages| pages * page_size_kib())
            .unwrap_or(0),
        Err(err) => {
            log::debug!("procstat: cannot read `{stat_path}` (process likely exited): {err}");
            0
        }
    };

    if !recurse {
        return rss_kib;
    }

    children_of(pid)
        .into_iter()
        .fold(rss_kib, |acc, child| acc + sample_rss(child, recurse))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comm() {
        let line = "1234 (sleep) S 1 1234 1234 0 -1 4194304 120 0 0 0 0 0 0 0 20 0 1 0 \
                     98765 4612096 1234 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 2 0 0 0 0 0";
        assert_eq!(parse_rss_pages(line), Some(1234));
    }

    #[test]
    fn comm_with_spaces_and_parens_does_not_shift_fields() {
        let line = "1234 (my (weird) program name) S 1 1234 1234 0 -1 4194304 120 0 0 0 0 0 0 0 \
                     20 0 1 0 98765 4612096 777 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 2 0 0 0 0 0";
        assert_eq!(parse_rss_pages(line), Some(777));
    }

    #[test]
    fn malformed_line_yields_none() {
        assert_eq!(parse_rss_pages("not a stat line at all"), None);
    }

    #[test]
    fn nonexistent_pid_yields_zero() {
        // PID 2^30 is never a live process in any test environment.
        assert_eq!(sample_rss(1 << 30, false), 0);
    }
}
