//! Library surface for the batch process supervisor, split out from the
//! `runwatchd` binary so integration tests can exercise the scheduler,
//! queue parser, and report formatter directly.

pub mod affinity;
pub mod cli;
pub mod clock;
pub mod procstat;
pub mod queue;
pub mod reaper;
pub mod report;
pub mod scheduler;
pub mod signals;
pub mod slot;
pub mod spawner;
