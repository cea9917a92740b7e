//! Who gets told about an overdue task.

use std::collections::{BTreeSet, HashMap};

use ot_api::{ApiError, TaskDirectory};
use ot_core::OverdueTask;

fn with_admin(mut emails: BTreeSet<String>, admin_email: &str) -> BTreeSet<String> {
    emails.insert(admin_email.trim().to_string());
    emails
}

fn group_name(task: &OverdueTask) -> Option<&str> {
    task.assignee
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Per-run memo of group member lists keyed by assignee name.
///
/// Orphans go to the admin alone; grouped tasks go to every group member
/// plus the admin.
#[derive(Debug, Clone, Default)]
pub struct RecipientCache {
    groups: HashMap<String, BTreeSet<String>>,
}

impl RecipientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipients_for<D>(
        &mut self,
        directory: &D,
        task: &OverdueTask,
        admin_email: &str,
    ) -> Result<BTreeSet<String>, ApiError>
    where
        D: TaskDirectory + ?Sized,
    {
        let Some(name) = group_name(task) else {
            return Ok(with_admin(BTreeSet::new(), admin_email));
        };
        let members = match self.groups.get(name) {
            Some(members) => {
                tracing::debug!(group = name, "group members served from cache");
                members.clone()
            }
            None => {
                let members = directory.resolve_group(name)?.member_emails;
                self.groups.insert(name.to_string(), members.clone());
                members
            }
        };
        Ok(with_admin(members, admin_email))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
