//! In-memory stand-ins for the Toggl API and the menu program.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, TimeZone, Utc};

use crate::menu::{Menu, MenuError, Prompt};
use crate::models::{DraftEntry, EntryState, Profile, Project, TimeEntry, Workspace};
use crate::toggl::{TogglError, TrackingApi};

pub fn running_entry(id: u64, description: &str) -> TimeEntry {
    TimeEntry {
        id,
        wid: 1,
        pid: None,
        billable: false,
        description: description.to_string(),
        start: Utc::now() - Duration::minutes(12),
        state: EntryState::Running,
    }
}

/// A one hour entry that stopped at `stop_hour`:00 on 2026-03-02.
pub fn stopped_entry(id: u64, description: &str, stop_hour: u32) -> TimeEntry {
    let stop = Utc.with_ymd_and_hms(2026, 3, 2, stop_hour, 0, 0).unwrap();
    TimeEntry {
        id,
        wid: 1,
        pid: None,
        billable: false,
        description: description.to_string(),
        start: stop - Duration::hours(1),
        state: EntryState::Stopped {
            stop: Some(stop),
            seconds: 3600,
        },
    }
}

#[derive(Default)]
struct FakeState {
    profile: Option<Profile>,
    projects: HashMap<u64, Vec<Project>>,
    current: Option<TimeEntry>,
    recent: Option<Vec<TimeEntry>>,
    fail_project_creation: bool,
    started: Vec<DraftEntry>,
    stopped: Vec<u64>,
    created_projects: Vec<(u64, String)>,
}

#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_workspaces(self, workspaces: &[(u64, &str)]) -> Self {
        self.state().profile = Some(Profile {
            workspaces: workspaces
                .iter()
                .map(|(id, name)| Workspace {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
        });
        self
    }

    pub fn with_projects(self, workspace_id: u64, projects: &[(u64, &str)]) -> Self {
        let projects = projects
            .iter()
            .map(|(id, name)| Project {
                id: *id,
                wid: workspace_id,
                name: name.to_string(),
                color: None,
            })
            .collect();
        self.state().projects.insert(workspace_id, projects);
        self
    }

    pub fn with_current(self, entry: TimeEntry) -> Self {
        self.state().current = Some(entry);
        self
    }

    pub fn with_recent(self, entries: Vec<TimeEntry>) -> Self {
        self.state().recent = Some(entries);
        self
    }

    pub fn failing_project_creation(self) -> Self {
        self.state().fail_project_creation = true;
        self
    }

    pub fn started(&self) -> Vec<DraftEntry> {
        self.state().started.clone()
    }

    pub fn stopped(&self) -> Vec<u64> {
        self.state().stopped.clone()
    }

    pub fn created_projects(&self) -> Vec<(u64, String)> {
        self.state().created_projects.clone()
    }
}

impl TrackingApi for FakeApi {
    fn fetch_profile(&self) -> Result<Profile, TogglError> {
        self.state()
            .profile
            .clone()
            .ok_or_else(|| TogglError::Network("profile unavailable".to_string()))
    }

    fn fetch_projects(&self, workspace_id: u64) -> Result<Vec<Project>, TogglError> {
        self.state()
            .projects
            .get(&workspace_id)
            .cloned()
            .ok_or_else(|| TogglError::ServerError(format!("workspace {workspace_id} failed")))
    }

    fn fetch_current_entry(&self) -> Result<TimeEntry, TogglError> {
        self.state().current.clone().ok_or(TogglError::NoRunningEntry)
    }

    fn fetch_recent_entries(&self) -> Result<Vec<TimeEntry>, TogglError> {
        self.state()
            .recent
            .clone()
            .ok_or_else(|| TogglError::Network("recent entries unavailable".to_string()))
    }

    fn create_project(&self, workspace_id: u64, name: &str) -> Result<Project, TogglError> {
        let mut state = self.state();
        if state.fail_project_creation {
            return Err(TogglError::ServerError("Toggl API error: 500".to_string()));
        }
        state.created_projects.push((workspace_id, name.to_string()));
        Ok(Project {
            id: 900 + state.created_projects.len() as u64,
            wid: workspace_id,
            name: name.to_string(),
            color: None,
        })
    }

    fn start_entry(&self, draft: &DraftEntry) -> Result<TimeEntry, TogglError> {
        let mut state = self.state();
        state.started.push(draft.clone());
        Ok(TimeEntry {
            id: 500 + state.started.len() as u64,
            pid: draft.pid,
            billable: draft.billable,
            ..running_entry(0, &draft.description)
        })
    }

    fn stop_entry(&self, entry_id: u64) -> Result<TimeEntry, TogglError> {
        let mut state = self.state();
        state.stopped.push(entry_id);
        let description = state
            .current
            .iter()
            .chain(state.recent.iter().flatten())
            .find(|entry| entry.id == entry_id)
            .map(|entry| entry.description.clone())
            .unwrap_or_default();
        Ok(TimeEntry {
            state: EntryState::Stopped {
                stop: Some(Utc::now()),
                seconds: 720,
            },
            ..running_entry(entry_id, &description)
        })
    }

    fn update_current_entry(&self, description: &str) -> Result<TimeEntry, TogglError> {
        let mut state = self.state();
        let current = state.current.as_mut().ok_or(TogglError::NoRunningEntry)?;
        current.description = description.to_string();
        Ok(current.clone())
    }
}

/// Answers prompts from a queue and records everything it was shown.
#[derive(Default)]
pub struct ScriptedMenu {
    answers: RefCell<VecDeque<Result<String, MenuError>>>,
    prompts: RefCell<Vec<Prompt>>,
    messages: RefCell<Vec<String>>,
}

impl ScriptedMenu {
    pub fn answering(answers: &[&str]) -> Self {
        let menu = Self::default();
        for answer in answers {
            menu.push(Ok(answer.to_string()));
        }
        menu
    }

    pub fn push(&self, answer: Result<String, MenuError>) {
        self.answers.borrow_mut().push_back(answer);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Menu for ScriptedMenu {
    fn choose(&self, prompt: &Prompt) -> Result<String, MenuError> {
        self.prompts.borrow_mut().push(prompt.clone());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(MenuError::Dismissed))
    }

    fn message(&self, text: &str) -> Result<(), MenuError> {
        self.messages.borrow_mut().push(text.to_string());
        Ok(())
    }
}
