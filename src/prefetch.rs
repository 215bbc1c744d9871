use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread;

use tracing::{debug, warn};

use crate::models::{Project, TimeEntry, Workspace};
use crate::toggl::{TogglError, TrackingApi, fetch_all_projects};

/// A value being fetched in the background, handed over exactly once.
pub struct Pending<T> {
    label: &'static str,
    receiver: Receiver<Result<T, TogglError>>,
}

impl<T: Default> Pending<T> {
    pub fn channel(label: &'static str) -> (SyncSender<Result<T, TogglError>>, Self) {
        let (sender, receiver) = sync_channel(1);
        (sender, Self { label, receiver })
    }

    /// Blocks until the fetch finishes. Failures degrade to an empty value.
    pub fn wait(self) -> T {
        match self.receiver.recv() {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                warn!(what = self.label, error = %err, "background fetch failed");
                T::default()
            }
            Err(_) => {
                warn!(what = self.label, "background fetch ended without a result");
                T::default()
            }
        }
    }
}

/// Everything the menu flow may need, requested up front.
pub struct Prefetch {
    pub current: Pending<Option<TimeEntry>>,
    pub recent: Pending<Vec<TimeEntry>>,
    pub workspaces: Pending<Vec<Workspace>>,
    pub projects: Pending<Vec<Project>>,
}

impl Prefetch {
    pub fn start<A>(api: &A) -> Self
    where
        A: TrackingApi + Clone + Send + Sync + 'static,
    {
        let (workspaces_tx, workspaces) = Pending::channel("workspaces");
        let (projects_tx, projects) = Pending::channel("projects");
        let worker = api.clone();
        thread::spawn(move || match worker.fetch_profile() {
            Ok(profile) => {
                debug!(count = profile.workspaces.len(), "fetched workspaces");
                let _ = workspaces_tx.send(Ok(profile.workspaces.clone()));
                let found = fetch_all_projects(&worker, &profile.workspaces);
                let _ = projects_tx.send(Ok(found));
            }
            Err(err) => {
                let _ = workspaces_tx.send(Err(err.clone()));
                let _ = projects_tx.send(Err(err));
            }
        });

        let (current_tx, current) = Pending::channel("current entry");
        let worker = api.clone();
        thread::spawn(move || {
            let result = match worker.fetch_current_entry() {
                Ok(entry) if entry.is_running() => Ok(Some(entry)),
                Ok(_) | Err(TogglError::NoRunningEntry) => Ok(None),
                Err(err) => Err(err),
            };
            let _ = current_tx.send(result);
        });

        let (recent_tx, recent) = Pending::channel("recent entries");
        let worker = api.clone();
        thread::spawn(move || {
            let _ = recent_tx.send(worker.fetch_recent_entries());
        });

        Self {
            current,
            recent,
            workspaces,
            projects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, running_entry, stopped_entry};

    #[test]
    fn failed_fetch_degrades_to_default() {
        let (sender, pending) = Pending::<Vec<TimeEntry>>::channel("recent entries");
        sender.send(Err(TogglError::RateLimited)).unwrap();
        assert!(pending.wait().is_empty());
    }

    #[test]
    fn vanished_worker_degrades_to_default() {
        let (sender, pending) = Pending::<Vec<Project>>::channel("projects");
        drop(sender);
        assert!(pending.wait().is_empty());
    }

    #[test]
    fn fetches_everything_in_background() {
        let api = FakeApi::default()
            .with_workspaces(&[(1, "Personal"), (2, "Team")])
            .with_projects(1, &[(10, "Home")])
            .with_projects(2, &[(20, "Roadmap")])
            .with_current(running_entry(5, "Writing docs"))
            .with_recent(vec![stopped_entry(4, "Lunch", 12)]);

        let prefetch = Prefetch::start(&api);
        assert_eq!(prefetch.current.wait().map(|e| e.id), Some(5));
        assert_eq!(prefetch.recent.wait().len(), 1);
        assert_eq!(prefetch.workspaces.wait().len(), 2);
        let names: Vec<_> = prefetch.projects.wait().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Home", "Roadmap"]);
    }

    #[test]
    fn failed_profile_leaves_nothing_to_pick() {
        let api = FakeApi::default();
        let prefetch = Prefetch::start(&api);
        assert_eq!(prefetch.current.wait(), None);
        assert!(prefetch.recent.wait().is_empty());
        assert!(prefetch.workspaces.wait().is_empty());
        assert!(prefetch.projects.wait().is_empty());
    }
}
