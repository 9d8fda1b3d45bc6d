//! Read-only view of the synced issue dataset.
//!
//! The canvas only needs the status category of an issue to colour its card;
//! everything else about an issue stays with the sync collaborator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatusCategory {
    #[serde(rename = "todo")]
    ToDo,
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl StatusCategory {
    /// Map a Jira status-category key (`new`, `indeterminate`, `done`).
    pub fn from_jira_key(key: &str) -> Self {
        match key {
            "new" | "todo" | "To Do" => StatusCategory::ToDo,
            "indeterminate" | "inProgress" | "In Progress" => StatusCategory::InProgress,
            "done" | "Done" => StatusCategory::Done,
            _ => StatusCategory::Unknown,
        }
    }
}

pub trait IssueRepository {
    fn status_category(&self, issue_key: &str) -> Option<StatusCategory>;
}

/// Issue snapshot held in memory, keyed by issue key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssues {
    statuses: HashMap<String, StatusCategory>,
}

impl InMemoryIssues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, issue_key: impl Into<String>, status: StatusCategory) {
        self.statuses.insert(issue_key.into(), status);
    }

    /// Build from `{ "KEY-1": "indeterminate", ... }` as produced by the sync job.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(contents)?;
        let statuses = raw
            .into_iter()
            .map(|(key, category)| (key, StatusCategory::from_jira_key(&category)))
            .collect();
        Ok(Self { statuses })
    }
}

impl IssueRepository for InMemoryIssues {
    fn status_category(&self, issue_key: &str) -> Option<StatusCategory> {
        self.statuses.get(issue_key).copied()
    }
}

/// Repository with no issues; every lookup is unknown.
pub struct NoIssues;

impl IssueRepository for NoIssues {
    fn status_category(&self, _issue_key: &str) -> Option<StatusCategory> {
        None
    }
}
