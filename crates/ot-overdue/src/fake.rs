use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use ot_api::{ApiError, TaskDirectory};
use ot_core::{GroupId, OverdueBatch, OverdueTask, TaskId};
use ot_notify::{DeliveryError, NotificationMessage, Notifier, NotifierKind};

pub(crate) fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

pub(crate) fn task(name: &str, id: &str, day: u32, assignee: Option<&str>) -> OverdueTask {
    OverdueTask {
        name: name.to_string(),
        id: TaskId::new(id),
        deadline: at(day),
        assignee: assignee.map(String::from),
    }
}

/// In-memory instance: groups by name, members by group id.
#[derive(Debug, Default)]
pub(crate) struct FakeDirectory {
    pub(crate) tasks: Vec<OverdueTask>,
    pub(crate) truncated: bool,
    groups: HashMap<String, GroupId>,
    members: HashMap<GroupId, Vec<String>>,
    pub(crate) fail_fetch: bool,
    id_lookups: Cell<usize>,
    pub(crate) cutoffs: RefCell<Vec<DateTime<Utc>>>,
}

impl FakeDirectory {
    /// "Legal" resolves to g1 with members a@x.com and b@x.com.
    pub(crate) fn legal() -> Self {
        Self::default().with_group("Legal", "g1", &["a@x.com", "b@x.com"])
    }

    pub(crate) fn with_group(mut self, name: &str, id: &str, members: &[&str]) -> Self {
        let id = GroupId::new(id);
        self.groups.insert(name.to_string(), id.clone());
        self.members
            .insert(id, members.iter().map(|m| m.to_string()).collect());
        self
    }

    pub(crate) fn with_tasks(mut self, tasks: Vec<OverdueTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub(crate) fn group_lookups(&self) -> usize {
        self.id_lookups.get()
    }
}

impl TaskDirectory for FakeDirectory {
    fn fetch_overdue(&self, cutoff: DateTime<Utc>) -> Result<OverdueBatch, ApiError> {
        self.cutoffs.borrow_mut().push(cutoff);
        if self.fail_fetch {
            return Err(ApiError::Query {
                endpoint: "/api/datasubject/v1/subtask/search/en-us".to_string(),
                status: Some(500),
                message: "internal error".to_string(),
            });
        }
        Ok(OverdueBatch {
            tasks: self
                .tasks
                .iter()
                .filter(|task| task.deadline < cutoff)
                .cloned()
                .collect(),
            truncated: self.truncated,
        })
    }

    fn resolve_group_id(&self, name: &str) -> Result<GroupId, ApiError> {
        self.id_lookups.set(self.id_lookups.get() + 1);
        self.groups
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::GroupNotFound {
                name: name.to_string(),
            })
    }

    fn resolve_group_emails(&self, group_id: &GroupId) -> Result<BTreeSet<String>, ApiError> {
        self.members
            .get(group_id)
            .map(|members| members.iter().cloned().collect())
            .ok_or_else(|| ApiError::GroupLookup {
                group_id: group_id.to_string(),
                status: Some(404),
                message: "unknown group".to_string(),
            })
    }
}

/// Records every message; fails for the task ids listed in `fail_for`.
#[derive(Debug, Default)]
pub(crate) struct CaptureNotifier {
    pub(crate) sent: RefCell<Vec<NotificationMessage>>,
    pub(crate) fail_for: Vec<TaskId>,
}

impl CaptureNotifier {
    pub(crate) fn failing_for(ids: &[&str]) -> Self {
        Self {
            sent: RefCell::default(),
            fail_for: ids.iter().map(|id| TaskId::new(*id)).collect(),
        }
    }
}

impl Notifier for CaptureNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Stdout
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        if self.fail_for.contains(&message.task_id) {
            return Err(DeliveryError::Cli {
                task_id: message.task_id.to_string(),
                source: ot_aws::AwsError::ContractViolation {
                    message: "simulated ses failure".to_string(),
                },
            });
        }
        self.sent.borrow_mut().push(message.clone());
        Ok(())
    }
}
