use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CREATED_WITH: &str = "rofi-toggl";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Workspace {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    pub id: u64,
    pub wid: u64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
}

/// Whether an entry is still accumulating time on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Running,
    Stopped {
        stop: Option<DateTime<Utc>>,
        seconds: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub id: u64,
    pub wid: u64,
    pub pid: Option<u64>,
    pub billable: bool,
    pub description: String,
    pub start: DateTime<Utc>,
    pub state: EntryState,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        matches!(self.state, EntryState::Running)
    }

    pub fn stop(&self) -> Option<DateTime<Utc>> {
        match self.state {
            EntryState::Running => None,
            EntryState::Stopped { stop, .. } => stop,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration_at(Utc::now())
    }

    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            EntryState::Running => (now - self.start).to_std().unwrap_or_default(),
            EntryState::Stopped { seconds, .. } => Duration::from_secs(seconds),
        }
    }
}

/// The entry shape the v8 API sends: a negative `duration` marks a running
/// entry (its value is minus the start epoch).
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimeEntry {
    pub id: u64,
    #[serde(default)]
    pub wid: u64,
    #[serde(default)]
    pub pid: Option<u64>,
    #[serde(default)]
    pub billable: bool,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    pub duration: i64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("time entry {id} has a negative duration but a stop time")]
pub struct InvalidEntry {
    pub id: u64,
}

impl TryFrom<RawTimeEntry> for TimeEntry {
    type Error = InvalidEntry;

    fn try_from(raw: RawTimeEntry) -> Result<Self, Self::Error> {
        let state = if raw.duration < 0 {
            if raw.stop.is_some() {
                return Err(InvalidEntry { id: raw.id });
            }
            EntryState::Running
        } else {
            EntryState::Stopped {
                stop: raw.stop,
                seconds: raw.duration.unsigned_abs(),
            }
        };

        Ok(TimeEntry {
            id: raw.id,
            wid: raw.wid,
            pid: raw.pid,
            billable: raw.billable,
            description: raw.description.unwrap_or_default(),
            start: raw.start,
            state,
        })
    }
}

/// A time entry that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftEntry {
    pub description: String,
    pub billable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u64>,
    pub created_with: String,
}

impl DraftEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            billable: false,
            pid: None,
            created_with: CREATED_WITH.to_string(),
        }
    }

    /// Seeds a new entry from an old one. The project is not carried over.
    pub fn from_existing(entry: &TimeEntry) -> Self {
        Self {
            billable: entry.billable,
            ..Self::new(entry.description.clone())
        }
    }
}

/// Running entry first, otherwise the one that started last.
pub fn most_recent(entries: &[TimeEntry]) -> Option<&TimeEntry> {
    entries
        .iter()
        .find(|entry| entry.is_running())
        .or_else(|| entries.iter().max_by_key(|entry| entry.start))
}
