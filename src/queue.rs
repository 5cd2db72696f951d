//! Reads the task file and produces the ordered, front-to-back task queue.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// A single task: a unique instance id plus its argument vector. Immutable
/// after parsing. `argv[0]` is the program to exec; `argv` may be empty,
/// in which case the task will fail to exec (see the scheduler's dispatch
/// step).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub instance_id: i64,
    pub argv: Vec<String>,
}

/// Parse a task file: one task per line, `<instance_id> <argv0> <argv1> ...`,
/// whitespace-separated. Parsing stops at the first line whose first token
/// does not parse as an integer (tasks already parsed are kept), logging a
/// warning that names the offending line.
pub fn parse(path: &Path) -> Result<VecDeque<Task>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading task file `{}`", path.display()))?;
    Ok(parse_str(&contents))
}

fn parse_str(contents: &str) -> VecDeque<Task> {
    let mut tasks = VecDeque::new();
    for (line_no, line) in contents.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            log::warn!("task file: blank line {} - stopping parse here", line_no + 1);
            break;
        };
        let Ok(instance_id) = first.parse::<i64>() else {
            log::warn!(
                "task file: line {} does not start with an integer instance id ({first:?}) - stopping parse here",
                line_no + 1
            );
            break;
        };
        let argv: Vec<String> = tokens.map(str::to_string).collect();
        tasks.push_back(Task { instance_id, argv });
    }
    tasks
}
