//! Core types shared by the session, query and notification crates.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Login material for the portal and the identity provider.
///
/// The identity-provider password is kept behind [`SecretString`] so it never
/// shows up in `Debug` output or logs.
#[derive(Debug)]
pub struct Credentials {
    pub portal_email: String,
    pub idp_username: String,
    pub idp_password: SecretString,
}

impl Credentials {
    pub fn new(
        portal_email: impl Into<String>,
        idp_username: impl Into<String>,
        idp_password: SecretString,
    ) -> Self {
        Self {
            portal_email: portal_email.into(),
            idp_username: idp_username.into(),
            idp_password,
        }
    }
}

/// A subtask whose deadline is before the query cutoff and is not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueTask {
    pub name: String,
    pub id: TaskId,
    pub deadline: DateTime<Utc>,
    /// Name of the responsible group. `None` marks an orphan task.
    pub assignee: Option<String>,
}

impl OverdueTask {
    pub fn is_orphan(&self) -> bool {
        self.assignee
            .as_deref()
            .map(|name| name.trim().is_empty())
            .unwrap_or(true)
    }

    pub fn kind(&self) -> TaskKind {
        if self.is_orphan() {
            TaskKind::Orphan
        } else {
            TaskKind::Grouped
        }
    }
}

/// One page of overdue tasks. The remote search is only read up to its
/// first page, so `truncated` reports when the server matched more records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverdueBatch {
    pub tasks: Vec<OverdueTask>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Orphan,
    Grouped,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Orphan => "orphan",
            TaskKind::Grouped => "grouped",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub id: GroupId,
    pub member_emails: BTreeSet<String>,
}

/// Formats a timestamp the way the task search endpoint expects it.
pub fn to_api_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
