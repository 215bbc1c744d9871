use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::models::{Project, TimeEntry};

impl fmt::Display for TimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_running() {
            "running"
        } else {
            "not running"
        };
        write!(f, "{} [{}]", self.description, state)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Project names keyed by id, built once per prompt.
pub struct ProjectNames<'a> {
    names: HashMap<u64, &'a str>,
}

impl<'a> ProjectNames<'a> {
    pub fn new(projects: &'a [Project]) -> Self {
        let mut names = HashMap::with_capacity(projects.len());
        for project in projects {
            names.entry(project.id).or_insert(project.name.as_str());
        }
        Self { names }
    }

    pub fn get(&self, id: u64) -> Option<&'a str> {
        self.names.get(&id).copied()
    }
}

pub fn entry_line(entry: &TimeEntry, names: &ProjectNames<'_>) -> String {
    match entry.pid.and_then(|pid| names.get(pid)) {
        Some(project) => format!("{entry} @{project}"),
        None => entry.to_string(),
    }
}

pub fn running_line(entry: &TimeEntry) -> String {
    format!(
        "Currently running: {} ({})",
        entry.description,
        format_elapsed(entry.duration())
    )
}

pub fn format_elapsed(duration: Duration) -> String {
    let mut seconds = duration.as_secs();
    if duration.subsec_millis() >= 500 {
        seconds += 1;
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
