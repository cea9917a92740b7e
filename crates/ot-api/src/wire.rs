//! Request and response shapes of the undocumented instance API.
//!
//! Field names follow what the instance returns today. Aliases cover the
//! spellings seen across API versions; anything else is ignored.

use chrono::{DateTime, Utc};
use ot_core::{to_api_timestamp, OverdueTask, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Status code the instance uses for completed subtasks.
pub const COMPLETED_STATUS_CODE: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriterion {
    pub attribute_key: &'static str,
    pub operator: &'static str,
    pub data_type: u32,
    pub from_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskSearch {
    pub term: String,
    pub filter_criteria: Vec<FilterCriterion>,
}

/// Search body selecting subtasks that are not completed and whose deadline
/// is before `cutoff`.
pub fn overdue_search(cutoff: &DateTime<Utc>) -> SubtaskSearch {
    SubtaskSearch {
        term: String::new(),
        filter_criteria: vec![
            FilterCriterion {
                attribute_key: "SubtaskStatus",
                operator: "NE",
                data_type: 30,
                from_value: json!([COMPLETED_STATUS_CODE.to_string()]),
            },
            FilterCriterion {
                attribute_key: "DeadLineRange",
                operator: "LT",
                data_type: 60,
                from_value: Value::String(to_api_timestamp(cutoff)),
            },
        ],
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub last: Option<bool>,
}

impl<T> Page<T> {
    /// True when the server reports records beyond this page.
    pub fn has_more(&self) -> bool {
        let beyond_total = self
            .total_elements
            .map(|total| total > self.content.len() as u64)
            .unwrap_or(false);
        beyond_total || self.last == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(i64),
    Text(String),
}

impl Scalar {
    pub fn into_string(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

/// Classifies a status value. Numbers and strings are read directly;
/// objects are checked under `key`, `code`, `value`, `id` and `name`.
/// Returns `None` for a shape that carries none of those.
pub fn status_is_completed(status: &Value) -> Option<bool> {
    match status {
        Value::Number(n) => Some(n.as_i64() == Some(COMPLETED_STATUS_CODE)),
        Value::String(text) => Some(text_is_completed(text)),
        Value::Object(fields) => {
            let known: Vec<&Value> = ["key", "code", "value", "id", "name"]
                .iter()
                .filter_map(|field| fields.get(*field))
                .filter(|v| v.is_number() || v.is_string())
                .collect();
            if known.is_empty() {
                return None;
            }
            Some(
                known
                    .into_iter()
                    .any(|v| status_is_completed(v) == Some(true)),
            )
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRecord {
    #[serde(alias = "subTaskId", alias = "subtaskId")]
    pub id: Scalar,
    #[serde(alias = "subTaskName", alias = "subtaskName")]
    pub name: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default, alias = "subTaskStatus", alias = "subtaskStatus")]
    pub status: Option<Value>,
    #[serde(
        default,
        alias = "assigneeName",
        alias = "assignedGroupName",
        alias = "groupName"
    )]
    pub assignee: Option<String>,
}

impl SubtaskRecord {
    /// A missing or unrecognised status counts as open.
    pub fn is_completed(&self) -> bool {
        let Some(status) = self.status.as_ref().filter(|s| !s.is_null()) else {
            return false;
        };
        match status_is_completed(status) {
            Some(completed) => completed,
            None => {
                tracing::warn!(id = ?self.id, %status, "unrecognised subtask status; treating as open");
                false
            }
        }
    }

    /// Converts to the domain type. Fails when the deadline is missing or is
    /// not an RFC 3339 timestamp.
    pub fn into_task(self) -> Result<OverdueTask, String> {
        let id = self.id.into_string();
        let raw = self
            .deadline
            .ok_or_else(|| format!("subtask {id} has no deadline"))?;
        let deadline = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|e| format!("subtask {id} has unparseable deadline '{raw}': {e}"))?
            .with_timezone(&Utc);
        let assignee = self
            .assignee
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(OverdueTask {
            name: self.name,
            id: TaskId(id),
            deadline,
            assignee,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub id: Scalar,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    #[serde(default)]
    pub email: Option<String>,
}
