//! Forks, redirects stdout/stderr into the task's log file, and execs the
//! command. See the parent-side caller in `scheduler.rs` for affinity
//! pinning and slot bookkeeping.

use anyhow::{Context, Result};
use nix::unistd::{dup2, execvp, fork, ForkResult, Pid};
use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Fork and exec `argv` with fd 1 and 2 redirected onto `log_path` (opened
/// append, created with user-write permission if missing). Returns the
/// child's pid in the parent.
///
/// An exec failure in the child is not reported back to the parent: the
/// child simply exits non-zero, and the parent observes this through the
/// normal reap path, reporting `EXIT` with that non-zero status (see
/// `spec.md` §7 — the supervisor does not distinguish exec failure from an
/// ordinary non-zero exit).
pub fn spawn(argv: &[String], log_path: &Path) -> Result<Pid> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o700)
        .open(log_path)
        .with_context(|| format!("opening log file `{}`", log_path.display()))?;
    let log_fd = log_file.as_raw_fd();

    let cargv: Vec<CString> = argv
        .iter()
        .map(|s| CString::new(s.as_str()))
        .collect::<std::result::Result<_, _>>()
        .context("task argument contains a NUL byte")?;

    // SAFETY: between `fork` and `execvp`/`_exit`, the child only calls
    // async-signal-safe functions (dup2, execvp, libc exit). No heap
    // allocation or locking happens on this path.
    match unsafe { fork() }.context("fork")? {
        ForkResult::Child => {
            let _ = dup2(log_fd, 1);
            let _ = dup2(log_fd, 2);
            let program = match cargv.first() {
                Some(p) => p,
                None => {
                    // Empty argv: nothing to exec. Exit non-zero so the
                    // parent reports an ordinary EXIT failure.
                    unsafe { libc_exit(127) };
                }
            };
            // execvp only returns on failure.
            let _ = execvp(program, &cargv);
            unsafe { libc_exit(126) };
        }
        ForkResult::Parent { child } => Ok(child),
    }
}

/// A minimal, allocation-free process exit for the post-fork child path.
/// Avoids pulling in `std::process::exit`'s broader cleanup machinery,
/// which is not guaranteed safe to run in a freshly-forked, single-threaded
/// child that hasn't exec'd.
unsafe fn libc_exit(code: i32) -> ! {
    nix::libc::_exit(code);
}
