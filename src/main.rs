//! A batch process supervisor: runs a list of user-supplied commands as
//! child processes under enforced CPU, wall-time, and memory constraints,
//! with a bounded level of parallelism.

use anyhow::Result;
use runwatchd::{cli, queue, scheduler};

fn main() -> Result<()> {
    env_logger::init();

    let Some(args) = cli::Args::parse_or_usage() else {
        return Ok(());
    };
    let task_file = args.task_file.clone().expect("checked by parse_or_usage");

    // Pin this process to the slot range immediately following all worker
    // slots, as the reference implementation does.
    scheduler::pin_self(args.processes, args.threads_per_process);

    let tasks = queue::parse(&task_file)?;
    log::info!("loaded {} task(s) from `{}`", tasks.len(), task_file.display());

    let config = scheduler::Config {
        num_processes: args.processes.max(1),
        threads_per_process: args.threads_per_process,
        timelim_secs: args.timelim,
        memlim_kib: args.memlim,
        output_dir: args.directory,
        recurse_children: args.recurse_children,
        quiet: args.quiet,
    };

    scheduler::run(config, tasks);

    Ok(())
}
