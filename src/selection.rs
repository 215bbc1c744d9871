use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

use crate::format::{ProjectNames, entry_line, running_line};
use crate::menu::{Menu, MenuError, Prompt};
use crate::models::{Project, TimeEntry, Workspace};

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),
    #[error(transparent)]
    Menu(#[from] MenuError),
}

/// The picked line plus the item it was rendered from. No item means the
/// user typed free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<T> {
    pub value: String,
    pub item: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    StopCurrent,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Start, Action::StopCurrent, Action::Cancel];

    pub fn label(self) -> &'static str {
        match self {
            Action::Start => "Start",
            Action::StopCurrent => "Stop current",
            Action::Cancel => "Cancel",
        }
    }

    pub fn from_label(label: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|action| action.label() == label)
    }
}

/// Rendered lines paired with their source items. Lookup is exact and the
/// first of several identical lines wins.
pub struct Choices<'a, T> {
    lines: Vec<String>,
    index: HashMap<String, usize>,
    items: &'a [T],
}

impl<'a, T: Clone> Choices<'a, T> {
    pub fn new(items: &'a [T], render: impl Fn(&T) -> String) -> Self {
        let lines: Vec<String> = items.iter().map(render).collect();
        let mut index = HashMap::with_capacity(lines.len());
        for (position, line) in lines.iter().enumerate() {
            index.entry(line.clone()).or_insert(position);
        }
        Self {
            lines,
            index,
            items,
        }
    }

    pub fn prompt(&self) -> Prompt {
        Prompt::new(self.lines.clone())
    }

    pub fn resolve(&self, line: &str) -> Option<&'a T> {
        self.index.get(line).map(|&position| &self.items[position])
    }

    pub fn select(&self, line: String) -> Selection<T> {
        let item = self.resolve(&line).cloned();
        Selection { value: line, item }
    }

    pub fn ask(&self, menu: &impl Menu) -> Result<Selection<T>, MenuError> {
        let line = menu.choose(&self.prompt())?;
        Ok(self.select(line))
    }
}

/// Running entries first, then newest stop time. Entries without a stop
/// time are placed by their start time.
pub fn sort_recent(entries: &mut [TimeEntry]) {
    entries.sort_by_key(|entry| {
        (
            !entry.is_running(),
            Reverse(entry.stop().unwrap_or(entry.start)),
        )
    });
}

pub fn select_from_recent(
    menu: &impl Menu,
    projects: &[Project],
    mut entries: Vec<TimeEntry>,
) -> Result<Selection<TimeEntry>, SelectionError> {
    sort_recent(&mut entries);
    let names = ProjectNames::new(projects);
    let choices = Choices::new(&entries, |entry| entry_line(entry, &names));
    let selection = choices.ask(menu)?;
    debug!(value = %selection.value, existing = selection.item.is_some(), "picked entry");
    Ok(selection)
}

pub fn select_project(
    menu: &impl Menu,
    projects: &[Project],
) -> Result<Selection<Project>, SelectionError> {
    let choices = Choices::new(projects, Project::to_string);
    Ok(choices.ask(menu)?)
}

pub fn select_workspace(
    menu: &impl Menu,
    workspaces: &[Workspace],
) -> Result<Workspace, SelectionError> {
    let choices = Choices::new(workspaces, |workspace| workspace.name.clone());
    let selection = choices.ask(menu)?;
    selection
        .item
        .ok_or(SelectionError::InvalidWorkspace(selection.value))
}

/// Offers the actions that make sense for the current state. With a running
/// entry the first row only shows what is running.
pub fn select_action(
    menu: &impl Menu,
    current: Option<&TimeEntry>,
) -> Result<Action, SelectionError> {
    let prompt = match current {
        Some(entry) => {
            let lines = std::iter::once(running_line(entry))
                .chain(Action::ALL.iter().map(|action| action.label().to_string()))
                .collect();
            Prompt::new(lines).with_selected_row(1)
        }
        None => Prompt::new(vec![
            Action::Start.label().to_string(),
            Action::Cancel.label().to_string(),
        ]),
    };

    let line = menu.choose(&prompt)?;
    Action::from_label(&line).ok_or(SelectionError::InvalidAction(line))
}
