use tracing::{debug, info, warn};

use crate::menu::{Menu, MenuError};
use crate::models::{DraftEntry, Project, TimeEntry, Workspace};
use crate::prefetch::Prefetch;
use crate::selection::{
    Action, Selection, SelectionError, select_action, select_from_recent, select_project,
    select_workspace,
};
use crate::toggl::{TogglError, TrackingApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started(TimeEntry),
    Stopped(TimeEntry),
    NothingRunning,
    Cancelled,
}

impl Outcome {
    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Started(entry) => Some(format!("Started: {entry}")),
            Outcome::Stopped(entry) => Some(format!("Stopped: {entry}")),
            Outcome::NothingRunning => Some("No currently running time entry".to_string()),
            Outcome::Cancelled => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to start: {0}")]
    Start(#[source] TogglError),
    #[error("Failed to stop: {0}")]
    Stop(#[source] TogglError),
    #[error("Failed to create project: {0}")]
    CreateProject(String),
    #[error("Menu failed: {0}")]
    Menu(#[from] SelectionError),
}

/// Runs one pass of the menu flow. Background fetches are only waited on
/// once a branch needs their data.
pub fn run<A, M>(api: &A, menu: &M, prefetch: Prefetch) -> Result<Outcome, DispatchError>
where
    A: TrackingApi,
    M: Menu,
{
    let Prefetch {
        current,
        recent,
        workspaces,
        projects,
    } = prefetch;
    let current = current.wait();

    let action = match select_action(menu, current.as_ref()) {
        Ok(action) => action,
        Err(SelectionError::Menu(MenuError::Dismissed)) => Action::Cancel,
        Err(SelectionError::InvalidAction(line)) => {
            warn!(%line, "not an action, cancelling");
            Action::Cancel
        }
        Err(err) => return Err(err.into()),
    };
    debug!(?action, "action chosen");

    match action {
        Action::Start => {
            let recent = recent.wait();
            let projects = projects.wait();
            start(api, menu, recent, &projects, move || workspaces.wait())
        }
        Action::StopCurrent => stop(api, current.as_ref()),
        Action::Cancel => Ok(Outcome::Cancelled),
    }
}

fn start<A, M>(
    api: &A,
    menu: &M,
    recent: Vec<TimeEntry>,
    projects: &[Project],
    workspaces: impl FnOnce() -> Vec<Workspace>,
) -> Result<Outcome, DispatchError>
where
    A: TrackingApi,
    M: Menu,
{
    let picked = match select_from_recent(menu, projects, recent) {
        Err(SelectionError::Menu(MenuError::Dismissed)) => return Ok(Outcome::Cancelled),
        other => other?,
    };

    if let Some(entry) = picked.item {
        info!(id = entry.id, workspace = entry.wid, "starting again from recent entry");
        let started = api.restart_entry(&entry).map_err(DispatchError::Start)?;
        return Ok(Outcome::Started(started));
    }

    if picked.value.trim().is_empty() {
        return Ok(Outcome::Cancelled);
    }
    let mut draft = DraftEntry::new(picked.value);

    let project = match select_project(menu, projects) {
        Ok(project) => Some(project),
        Err(SelectionError::Menu(MenuError::Dismissed)) => None,
        Err(err) => return Err(err.into()),
    };

    match project {
        Some(Selection {
            item: Some(project),
            ..
        }) => {
            debug!(
                id = project.id,
                workspace = project.wid,
                color = ?project.color,
                "picked project"
            );
            draft.pid = Some(project.id);
        }
        Some(selection) if !selection.value.trim().is_empty() => {
            let workspaces = workspaces();
            let workspace = select_workspace(menu, &workspaces)
                .map_err(|err| DispatchError::CreateProject(err.to_string()))?;
            let created = api
                .create_project(workspace.id, &selection.value)
                .map_err(|err| DispatchError::CreateProject(err.to_string()))?;
            info!(id = created.id, workspace = workspace.id, "created project");
            draft.pid = Some(created.id);
        }
        _ => {}
    }

    let started = api.start_entry(&draft).map_err(DispatchError::Start)?;
    Ok(Outcome::Started(started))
}

fn stop<A: TrackingApi>(api: &A, current: Option<&TimeEntry>) -> Result<Outcome, DispatchError> {
    let Some(entry) = current else {
        return Ok(Outcome::NothingRunning);
    };
    let stopped = api.stop_running(entry).map_err(DispatchError::Stop)?;
    Ok(Outcome::Stopped(stopped))
}

/// Shows the result of a run through the menu. A menu that cannot show it
/// is only logged.
pub fn report<M: Menu>(menu: &M, result: &Result<Outcome, DispatchError>) {
    let message = match result {
        Ok(outcome) => outcome.message(),
        Err(err) => Some(err.to_string()),
    };
    let Some(message) = message else {
        return;
    };
    if let Err(err) = menu.message(&message) {
        warn!(error = %err, %message, "could not display message");
    }
}
