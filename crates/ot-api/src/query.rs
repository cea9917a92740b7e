//! Overdue subtask search and group resolution.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use ot_core::{Group, GroupId, OverdueBatch};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::transport::{ApiResponse, ApiTransport};
use crate::wire::{overdue_search, GroupRecord, MemberRecord, Page, SubtaskRecord};

pub const PAGE_SIZE: u32 = 20;

pub fn subtask_search_path() -> String {
    format!(
        "/api/datasubject/v1/subtask/search/en-us?page=0&size={PAGE_SIZE}&sort=deadline,asc&viewId=undefined"
    )
}

/// Group search is a server-side wildcard match on `%name%`.
pub fn group_search_path(name: &str) -> String {
    let pattern = format!("%{name}%");
    let encoded: String = url::form_urlencoded::byte_serialize(pattern.as_bytes()).collect();
    format!("/api/access/v1/groups?filters=name=~={encoded}&page=0&size={PAGE_SIZE}")
}

pub fn group_members_path(group_id: &GroupId) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(group_id.0.as_bytes()).collect();
    format!("/api/access/v1/groups/{encoded}/members?filters=&page=0&size={PAGE_SIZE}")
}

/// What the orchestrator needs from the instance.
pub trait TaskDirectory {
    /// Open subtasks whose deadline is strictly before `cutoff`. Only the
    /// first page is fetched; see [`OverdueBatch::truncated`].
    fn fetch_overdue(&self, cutoff: DateTime<Utc>) -> Result<OverdueBatch, ApiError>;

    fn resolve_group_id(&self, name: &str) -> Result<GroupId, ApiError>;

    fn resolve_group_emails(&self, group_id: &GroupId) -> Result<BTreeSet<String>, ApiError>;

    fn resolve_group(&self, name: &str) -> Result<Group, ApiError> {
        let id = self.resolve_group_id(name)?;
        let member_emails = self.resolve_group_emails(&id)?;
        Ok(Group {
            name: name.to_string(),
            id,
            member_emails,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskQueryService<T> {
    transport: T,
}

impl<T: ApiTransport> TaskQueryService<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: ApiTransport> TaskDirectory for TaskQueryService<T> {
    fn fetch_overdue(&self, cutoff: DateTime<Utc>) -> Result<OverdueBatch, ApiError> {
        let path = subtask_search_path();
        let body = serde_json::to_value(overdue_search(&cutoff)).map_err(|e| {
            ApiError::InvalidInput {
                message: format!("failed to encode subtask search: {e}"),
            }
        })?;
        let response = self.transport.post_json(&path, &body)?;
        if !response.is_success() {
            return Err(query_failure(&path, &response));
        }
        let page: Page<SubtaskRecord> = parse_body(&path, &response)?;
        let truncated = page.has_more();
        if truncated {
            tracing::warn!(
                page_size = PAGE_SIZE,
                total = ?page.total_elements,
                "more overdue subtasks exist than the first page returned"
            );
        }

        let mut tasks = Vec::with_capacity(page.content.len());
        for record in page.content {
            if record.is_completed() {
                tracing::warn!(id = ?record.id, "dropping completed subtask returned by search");
                continue;
            }
            let task = record.into_task().map_err(|message| ApiError::Query {
                endpoint: path.clone(),
                status: Some(response.status),
                message,
            })?;
            if task.deadline >= cutoff {
                tracing::warn!(
                    id = %task.id,
                    deadline = %task.deadline,
                    "dropping subtask not due before cutoff"
                );
                continue;
            }
            tasks.push(task);
        }

        tracing::info!(count = tasks.len(), truncated, %cutoff, "fetched overdue subtasks");
        Ok(OverdueBatch { tasks, truncated })
    }

    fn resolve_group_id(&self, name: &str) -> Result<GroupId, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput {
                message: "group name must not be empty".to_string(),
            });
        }
        let path = group_search_path(name);
        let response = self.transport.get(&path)?;
        if !response.is_success() {
            return Err(query_failure(&path, &response));
        }
        let page: Page<GroupRecord> = parse_body(&path, &response)?;

        let exact = page.content.iter().position(|group| {
            group
                .name
                .as_deref()
                .map(|candidate| candidate.trim().eq_ignore_ascii_case(name.trim()))
                .unwrap_or(false)
        });
        let chosen = match exact {
            Some(index) => page.content.into_iter().nth(index),
            None => page.content.into_iter().next(),
        };
        let group = chosen.ok_or_else(|| ApiError::GroupNotFound {
            name: name.to_string(),
        })?;
        let id = GroupId::new(group.id.into_string());
        tracing::debug!(group = name, id = %id, "resolved group");
        Ok(id)
    }

    fn resolve_group_emails(&self, group_id: &GroupId) -> Result<BTreeSet<String>, ApiError> {
        let path = group_members_path(group_id);
        let response = self.transport.get(&path)?;
        if !response.is_success() {
            return Err(ApiError::GroupLookup {
                group_id: group_id.to_string(),
                status: Some(response.status),
                message: snippet(&response.body),
            });
        }
        let page: Page<MemberRecord> =
            serde_json::from_str(&response.body).map_err(|e| ApiError::GroupLookup {
                group_id: group_id.to_string(),
                status: Some(response.status),
                message: format!("malformed member list: {e}"),
            })?;
        if page.has_more() {
            tracing::warn!(group = %group_id, "group has more members than the first page");
        }

        let emails: BTreeSet<String> = page
            .content
            .into_iter()
            .filter_map(|member| member.email)
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect();
        tracing::debug!(group = %group_id, members = emails.len(), "resolved group members");
        Ok(emails)
    }
}

fn parse_body<D: DeserializeOwned>(path: &str, response: &ApiResponse) -> Result<D, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Query {
        endpoint: path.to_string(),
        status: Some(response.status),
        message: format!("malformed response: {e}"),
    })
}

fn query_failure(path: &str, response: &ApiResponse) -> ApiError {
    ApiError::Query {
        endpoint: path.to_string(),
        status: Some(response.status),
        message: snippet(&response.body),
    }
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeTransport;
    use chrono::TimeZone;
    use ot_core::TaskId;
    use serde_json::json;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn paths_match_instance_endpoints() {
        assert_eq!(
            subtask_search_path(),
            "/api/datasubject/v1/subtask/search/en-us?page=0&size=20&sort=deadline,asc&viewId=undefined"
        );
        assert_eq!(
            group_search_path("Legal Team"),
            "/api/access/v1/groups?filters=name=~=%25Legal+Team%25&page=0&size=20"
        );
        assert_eq!(
            group_members_path(&GroupId::new("g1")),
            "/api/access/v1/groups/g1/members?filters=&page=0&size=20"
        );
    }

    #[test]
    fn fetch_overdue_posts_filter_and_honours_it() {
        let transport = FakeTransport::new().with_post(
            &subtask_search_path(),
            200,
            json!({
                "content": [
                    {"id": "1", "name": "T1", "deadline": "2024-01-01T00:00:00Z"},
                    {"id": "2", "name": "T2", "deadline": "2024-01-02T00:00:00Z", "assignee": "Legal"},
                    {"id": "3", "name": "late", "deadline": "2024-01-05T00:00:00Z"},
                    {"id": "4", "name": "on cutoff", "deadline": "2024-01-03T00:00:00Z"},
                    {"id": "5", "name": "done", "deadline": "2023-12-01T00:00:00Z", "status": 30},
                ],
                "totalElements": 5,
            }),
        );
        let service = TaskQueryService::new(transport);
        let batch = service.fetch_overdue(cutoff()).expect("fetch");

        let ids: Vec<&TaskId> = batch.tasks.iter().map(|task| &task.id).collect();
        assert_eq!(ids, vec![&TaskId::new("1"), &TaskId::new("2")]);
        assert!(batch.tasks.iter().all(|task| task.deadline < cutoff()));
        assert!(!batch.truncated);

        let posts = service.transport().posts.borrow();
        assert_eq!(posts.len(), 1);
        assert_eq!(
            posts[0].1["filterCriteria"][1]["fromValue"],
            json!("2024-01-03T00:00:00Z")
        );
    }

    #[test]
    fn fetch_overdue_reports_truncation() {
        let content: Vec<_> = (0..20)
            .map(|n| json!({"id": n, "name": format!("T{n}"), "deadline": "2024-01-01T00:00:00Z"}))
            .collect();
        let transport = FakeTransport::new().with_post(
            &subtask_search_path(),
            200,
            json!({"content": content, "totalElements": 45, "last": false}),
        );
        let batch = TaskQueryService::new(transport)
            .fetch_overdue(cutoff())
            .expect("fetch");
        assert_eq!(batch.tasks.len(), 20);
        assert!(batch.truncated);
    }

    #[test]
    fn fetch_overdue_maps_failures_to_query_errors() {
        let transport = FakeTransport::new().with_post(
            &subtask_search_path(),
            401,
            json!({"error": "unauthorized"}),
        );
        let err = TaskQueryService::new(transport)
            .fetch_overdue(cutoff())
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Query { status: Some(401), .. }));

        let transport = FakeTransport::new().with_raw_post(&subtask_search_path(), 200, "<html>");
        let err = TaskQueryService::new(transport)
            .fetch_overdue(cutoff())
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Query { .. }));

        let err = TaskQueryService::new(FakeTransport::new())
            .fetch_overdue(cutoff())
            .expect_err("no route");
        assert!(err.is_transport());
    }

    #[test]
    fn resolve_group_id_is_idempotent_and_prefers_exact_match() {
        let transport = FakeTransport::new().with_get(
            &group_search_path("Legal"),
            200,
            json!({"content": [
                {"id": "g0", "name": "Legal Ops"},
                {"id": "g1", "name": "legal"},
            ]}),
        );
        let service = TaskQueryService::new(transport);
        let first = service.resolve_group_id("Legal").expect("resolve");
        let second = service.resolve_group_id("Legal").expect("resolve");
        assert_eq!(first, GroupId::new("g1"));
        assert_eq!(first, second);
        assert_eq!(service.transport().get_calls.borrow().len(), 2);
    }

    #[test]
    fn resolve_group_id_falls_back_to_first_result() {
        let transport = FakeTransport::new().with_get(
            &group_search_path("Leg"),
            200,
            json!({"content": [{"id": 7, "name": "Legal"}, {"id": 8, "name": "Legacy"}]}),
        );
        let id = TaskQueryService::new(transport)
            .resolve_group_id("Leg")
            .expect("resolve");
        assert_eq!(id, GroupId::new("7"));
    }

    #[test]
    fn resolve_group_id_reports_not_found_on_empty_result() {
        let transport =
            FakeTransport::new().with_get(&group_search_path("Nobody"), 200, json!({"content": []}));
        let err = TaskQueryService::new(transport)
            .resolve_group_id("Nobody")
            .expect_err("must fail");
        assert!(matches!(err, ApiError::GroupNotFound { ref name } if name == "Nobody"));
    }

    #[test]
    fn resolve_group_emails_dedupes_and_trims() {
        let transport = FakeTransport::new().with_get(
            &group_members_path(&GroupId::new("g1")),
            200,
            json!({"content": [
                {"email": "a@x.com"},
                {"email": " b@x.com "},
                {"email": "a@x.com"},
                {"email": ""},
                {"name": "no email"},
            ]}),
        );
        let emails = TaskQueryService::new(transport)
            .resolve_group_emails(&GroupId::new("g1"))
            .expect("members");
        let expected: BTreeSet<String> = ["a@x.com", "b@x.com"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(emails, expected);
    }

    #[test]
    fn resolve_group_emails_fails_on_non_success() {
        let transport = FakeTransport::new().with_get(
            &group_members_path(&GroupId::new("g1")),
            403,
            json!({"message": "forbidden"}),
        );
        let err = TaskQueryService::new(transport)
            .resolve_group_emails(&GroupId::new("g1"))
            .expect_err("must fail");
        assert!(matches!(err, ApiError::GroupLookup { status: Some(403), .. }));
    }

    #[test]
    fn resolve_group_combines_both_lookups() {
        let transport = FakeTransport::new()
            .with_get(
                &group_search_path("Legal"),
                200,
                json!({"content": [{"id": "g1", "name": "Legal"}]}),
            )
            .with_get(
                &group_members_path(&GroupId::new("g1")),
                200,
                json!({"content": [{"email": "a@x.com"}, {"email": "b@x.com"}]}),
            );
        let group = TaskQueryService::new(transport)
            .resolve_group("Legal")
            .expect("group");
        assert_eq!(group.id, GroupId::new("g1"));
        assert_eq!(group.member_emails.len(), 2);
    }

    #[test]
    fn error_bodies_with_success_status_are_query_errors() {
        let expired = json!({"errorCode": "SESSION_EXPIRED", "message": "token expired"});
        let transport = FakeTransport::new()
            .with_post(&subtask_search_path(), 200, expired.clone())
            .with_get(&group_search_path("Legal"), 200, json!({"message": "unexpected"}))
            .with_get(&group_members_path(&GroupId::new("g1")), 200, expired);
        let service = TaskQueryService::new(transport);

        let err = service.fetch_overdue(cutoff()).expect_err("must fail");
        assert!(matches!(err, ApiError::Query { status: Some(200), .. }));

        let err = service.resolve_group_id("Legal").expect_err("must fail");
        assert!(matches!(err, ApiError::Query { status: Some(200), .. }));

        let err = service
            .resolve_group_emails(&GroupId::new("g1"))
            .expect_err("must fail");
        assert!(matches!(err, ApiError::GroupLookup { status: Some(200), .. }));
    }

    #[test]
    fn unrecognised_status_does_not_fail_the_page() {
        let transport = FakeTransport::new().with_post(
            &subtask_search_path(),
            200,
            json!({"content": [
                {"id": "1", "name": "T1", "deadline": "2024-01-01T00:00:00Z",
                 "status": {"key": "10", "value": "In Progress"}},
                {"id": "2", "name": "T2", "deadline": "2024-01-01T00:00:00Z",
                 "status": {"id": 10, "name": "Open"}},
                {"id": "3", "name": "T3", "deadline": "2024-01-01T00:00:00Z",
                 "status": {"key": "30", "value": "Completed"}},
            ]}),
        );
        let batch = TaskQueryService::new(transport)
            .fetch_overdue(cutoff())
            .expect("fetch");
        let ids: Vec<&TaskId> = batch.tasks.iter().map(|task| &task.id).collect();
        assert_eq!(ids, vec![&TaskId::new("1"), &TaskId::new("2")]);
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), 203);
        assert_eq!(snippet("  "), "empty response body");
    }
}
