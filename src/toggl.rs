use std::thread;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{DraftEntry, Profile, Project, RawTimeEntry, TimeEntry, Workspace};

pub const DEFAULT_BASE_URL: &str = "https://api.track.toggl.com/api/v8";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TogglError {
    #[error("invalid API token")]
    Unauthorized,
    #[error("the workspace needs a paid plan for this")]
    PaymentRequired,
    #[error("rate limited by Toggl")]
    RateLimited,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    ServerError(String),
    #[error("{0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("{0}")]
    Conflict(String),
    #[error("no time entry is running")]
    NoRunningEntry,
}

/// The calls the menu flow makes against the tracking service.
pub trait TrackingApi {
    fn fetch_profile(&self) -> Result<Profile, TogglError>;
    fn fetch_projects(&self, workspace_id: u64) -> Result<Vec<Project>, TogglError>;
    fn fetch_current_entry(&self) -> Result<TimeEntry, TogglError>;
    fn fetch_recent_entries(&self) -> Result<Vec<TimeEntry>, TogglError>;
    fn create_project(&self, workspace_id: u64, name: &str) -> Result<Project, TogglError>;
    fn start_entry(&self, draft: &DraftEntry) -> Result<TimeEntry, TogglError>;
    fn stop_entry(&self, entry_id: u64) -> Result<TimeEntry, TogglError>;
    fn update_current_entry(&self, description: &str) -> Result<TimeEntry, TogglError>;

    /// Starts a fresh entry with the description and billable flag of `entry`.
    fn restart_entry(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        if entry.is_running() {
            return Err(TogglError::Conflict(format!(
                "cannot start already started time entry: {}",
                entry.id
            )));
        }
        self.start_entry(&DraftEntry::from_existing(entry))
    }

    fn stop_running(&self, entry: &TimeEntry) -> Result<TimeEntry, TogglError> {
        if !entry.is_running() {
            return Err(TogglError::Conflict(format!(
                "cannot stop already stopped time entry: {}",
                entry.id
            )));
        }
        self.stop_entry(entry.id)
    }
}

/// Fetches projects of every workspace in parallel. A workspace whose fetch
/// fails contributes no projects.
pub fn fetch_all_projects<A>(api: &A, workspaces: &[Workspace]) -> Vec<Project>
where
    A: TrackingApi + Sync,
{
    thread::scope(|scope| {
        let handles: Vec<_> = workspaces
            .iter()
            .map(|workspace| {
                let handle = scope.spawn(move || api.fetch_projects(workspace.id));
                (workspace.id, handle)
            })
            .collect();

        let mut projects = Vec::new();
        for (workspace_id, handle) in handles {
            match handle.join() {
                Ok(Ok(found)) => {
                    debug!(workspace_id, count = found.len(), "fetched projects");
                    projects.extend(found);
                }
                Ok(Err(err)) => {
                    warn!(workspace_id, error = %err, "failed to fetch projects");
                }
                Err(_) => warn!(workspace_id, "project fetch panicked"),
            }
        }
        projects
    })
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Serialize)]
struct NewProjectRequest<'a> {
    project: NewProject<'a>,
}

#[derive(Serialize)]
struct NewProject<'a> {
    name: &'a str,
    wid: u64,
    is_private: bool,
}

#[derive(Serialize)]
struct TimeEntryRequest<T: Serialize> {
    time_entry: T,
}

#[derive(Serialize)]
struct DescriptionUpdate<'a> {
    description: &'a str,
}

#[derive(Clone)]
pub struct TogglClient {
    client: Client,
    base_url: String,
    auth: String,
}

impl TogglClient {
    pub fn new(token: &str, base_url: impl Into<String>) -> Result<Self, TogglError> {
        let client = Client::builder()
            .user_agent(concat!("rofi-toggl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TogglError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: basic_auth(token),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "toggl request");
        self.client
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Authorization", &self.auth)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TogglError> {
        let response = request
            .send()
            .map_err(|err| TogglError::Network(err.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(TogglError::Unauthorized);
        }

        if status == 402 {
            return Err(TogglError::PaymentRequired);
        }

        if status == 404 {
            return Err(TogglError::NotFound(response.url().path().to_string()));
        }

        if status == 429 {
            return Err(TogglError::RateLimited);
        }

        if status.is_server_error() {
            return Err(TogglError::ServerError(format!("Toggl API error: {status}")));
        }

        if !status.is_success() {
            return Err(TogglError::Network(format!("Toggl API error: {status}")));
        }

        response
            .json::<T>()
            .map_err(|err| TogglError::Parse(err.to_string()))
    }

    fn send_entry(&self, request: RequestBuilder) -> Result<TimeEntry, TogglError> {
        let envelope: DataEnvelope<Option<RawTimeEntry>> = self.send(request)?;
        let raw = envelope.data.ok_or(TogglError::NoRunningEntry)?;
        TimeEntry::try_from(raw).map_err(|err| TogglError::Parse(err.to_string()))
    }
}

impl TrackingApi for TogglClient {
    fn fetch_profile(&self) -> Result<Profile, TogglError> {
        let envelope: DataEnvelope<Profile> = self.send(self.request(Method::GET, "/me"))?;
        Ok(envelope.data)
    }

    fn fetch_projects(&self, workspace_id: u64) -> Result<Vec<Project>, TogglError> {
        let path = format!("/workspaces/{workspace_id}/projects");
        let projects: Option<Vec<Project>> = self.send(self.request(Method::GET, &path))?;
        Ok(projects.unwrap_or_default())
    }

    fn fetch_current_entry(&self) -> Result<TimeEntry, TogglError> {
        let entry = self.send_entry(self.request(Method::GET, "/time_entries/current"))?;
        if !entry.is_running() {
            return Err(TogglError::NoRunningEntry);
        }
        Ok(entry)
    }

    fn fetch_recent_entries(&self) -> Result<Vec<TimeEntry>, TogglError> {
        let raw: Option<Vec<RawTimeEntry>> =
            self.send(self.request(Method::GET, "/time_entries"))?;
        Ok(decode_entries(raw.unwrap_or_default()))
    }

    fn create_project(&self, workspace_id: u64, name: &str) -> Result<Project, TogglError> {
        let body = NewProjectRequest {
            project: NewProject {
                name,
                wid: workspace_id,
                is_private: true,
            },
        };
        let envelope: DataEnvelope<Project> =
            self.send(self.request(Method::POST, "/projects").json(&body))?;
        Ok(envelope.data)
    }

    fn start_entry(&self, draft: &DraftEntry) -> Result<TimeEntry, TogglError> {
        let body = TimeEntryRequest { time_entry: draft };
        self.send_entry(self.request(Method::POST, "/time_entries/start").json(&body))
    }

    fn stop_entry(&self, entry_id: u64) -> Result<TimeEntry, TogglError> {
        let path = format!("/time_entries/{entry_id}/stop");
        self.send_entry(self.request(Method::PUT, &path))
    }

    fn update_current_entry(&self, description: &str) -> Result<TimeEntry, TogglError> {
        let body = TimeEntryRequest {
            time_entry: DescriptionUpdate { description },
        };
        self.send_entry(self.request(Method::PUT, "/time_entries/current").json(&body))
    }
}

pub fn basic_auth(token: &str) -> String {
    let credentials = STANDARD.encode(format!("{token}:api_token"));
    format!("Basic {credentials}")
}

fn decode_entries(raw: Vec<RawTimeEntry>) -> Vec<TimeEntry> {
    raw.into_iter()
        .filter_map(|entry| match TimeEntry::try_from(entry) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping time entry");
                None
            }
        })
        .collect()
}
