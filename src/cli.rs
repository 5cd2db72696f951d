//! Command-line surface.

use clap::Parser;
use std::path::PathBuf;

/// Batch process supervisor: runs a list of commands as child processes
/// under enforced CPU, wall-time, and memory constraints.
#[derive(Parser, Debug)]
#[command(name = "runwatchd", version, about)]
pub struct Args {
    /// Parallelism: number of worker slots.
    #[arg(short = 'p', long = "processes", default_value_t = 1)]
    pub processes: usize,

    /// CPUs per slot, used for affinity pinning.
    #[arg(short = 't', long = "threads-per-process", default_value_t = 1)]
    pub threads_per_process: usize,

    /// Per-task wall-clock limit in seconds. Zero or negative disables it.
    #[arg(short = 'T', long = "timelim", default_value_t = 0.0)]
    pub timelim: f64,

    /// Per-task RSS limit in KiB. Zero or negative disables it.
    #[arg(short = 'M', long = "memlim", default_value_t = 0)]
    pub memlim: i64,

    /// Base output directory for per-task log directories.
    #[arg(short = 'd', long = "directory", default_value = ".")]
    pub directory: PathBuf,

    /// Include descendant processes' RSS in the memory sample.
    #[arg(short = 'r', long = "recurse-children", default_value_t = false)]
    pub recurse_children: bool,

    /// Suppress stdout report lines.
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    pub quiet: bool,

    /// Task file: one task per line, `<instance_id> <argv...>`.
    pub task_file: Option<PathBuf>,
}

impl Args {
    /// Mirrors the original tool's behavior: running with no positional
    /// argument prints usage and exits 0, rather than clap's usual
    /// missing-required-argument error. `task_file` is therefore optional
    /// at the type level so we can intercept this case ourselves.
    pub fn parse_or_usage() -> Option<Self> {
        let rewritten: Vec<String> = std::env::args().map(|a| normalize_np_alias(&a)).collect();
        let args = Args::parse_from(rewritten);
        if args.task_file.is_none() {
            Args::print_usage();
            return None;
        }
        Some(args)
    }

    fn print_usage() {
        println!(
            "Usage: runwatchd <tasks_file> [-p|-np|--processes <num_parallel_processes>] \
             [-t|--threads-per-process <num_threads_per_process>] \
             [-T|--timelim <timelimit_seconds>] [-M|--memlim <rss_memlimit_kilobytes>] \
             [-d|--directory <output_log_directory>] [-r|--recurse-children] [-q|--quiet]"
        );
        println!(
            "Each line in <tasks_file> must begin with a unique instance id (e.g. the current \
             line number) followed by a whitespace and then the command to execute."
        );
    }
}

/// The original tool also accepts the non-standard single-dash spelling
/// `-np` for `--processes` (`-n<VALUE>` would otherwise be ambiguous with
/// clap's short-option grouping), so we rewrite it to the long form before
/// handing argv to clap.
fn normalize_np_alias(arg: &str) -> String {
    if arg == "-np" {
        "--processes".to_string()
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn np_alias_is_rewritten() {
        assert_eq!(normalize_np_alias("-np"), "--processes");
        assert_eq!(normalize_np_alias("-p"), "-p");
    }

    #[test]
    fn defaults_match_spec() {
        let args = Args::parse_from(["runwatchd", "tasks.txt"]);
        assert_eq!(args.processes, 1);
        assert_eq!(args.threads_per_process, 1);
        assert_eq!(args.timelim, 0.0);
        assert_eq!(args.memlim, 0);
        assert_eq!(args.directory, PathBuf::from("."));
        assert!(!args.recurse_children);
        assert!(!args.quiet);
        assert_eq!(args.task_file, Some(PathBuf::from("tasks.txt")));
    }

    #[test]
    fn short_flags_parse() {
        let args = Args::parse_from([
            "runwatchd", "-p", "4", "-t", "2", "-T", "30", "-M", "10240", "-d", "/tmp/out", "-r",
            "-q", "tasks.txt",
        ]);
        assert_eq!(args.processes, 4);
        assert_eq!(args.threads_per_process, 2);
        assert_eq!(args.timelim, 30.0);
        assert_eq!(args.memlim, 10240);
        assert_eq!(args.directory, PathBuf::from("/tmp/out"));
        assert!(args.recurse_children);
        assert!(args.quiet);
    }
}
