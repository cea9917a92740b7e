//! Email text for overdue tasks.
//!
//! Templates use `{placeholder}` markers. Known placeholders are
//! `{task_name}`, `{task_id}`, `{deadline}`, `{assignee}` and
//! `{instance_url}`; anything else in braces is copied through unchanged.

use chrono::{DateTime, Utc};
use ot_core::{MessageTemplate, OverdueTask, TaskKind, TemplatesConfig};

use crate::types::NotificationMessage;

const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext<'a> {
    pub task_name: &'a str,
    pub task_id: &'a str,
    pub deadline: String,
    pub assignee: &'a str,
    pub instance_url: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn for_task(task: &'a OverdueTask, instance_url: &'a str) -> Self {
        Self {
            task_name: &task.name,
            task_id: task.id.as_ref(),
            deadline: format_deadline(&task.deadline),
            assignee: task.assignee.as_deref().unwrap_or("unassigned"),
            instance_url,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "task_name" => Some(self.task_name),
            "task_id" => Some(self.task_id),
            "deadline" => Some(&self.deadline),
            "assignee" => Some(self.assignee),
            "instance_url" => Some(self.instance_url),
            _ => None,
        }
    }
}

pub fn format_deadline(deadline: &DateTime<Utc>) -> String {
    deadline.format(DEADLINE_FORMAT).to_string()
}

/// Single pass, so substituted values are never expanded again.
pub fn render(template: &str, context: &TemplateContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match context.lookup(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn template_for(templates: &TemplatesConfig, kind: TaskKind) -> &MessageTemplate {
    match kind {
        TaskKind::Orphan => &templates.orphan,
        TaskKind::Grouped => &templates.grouped,
    }
}

/// Builds the message for `task`, picking the template by orphan/grouped.
pub fn compose_message(
    templates: &TemplatesConfig,
    task: &OverdueTask,
    sender: &str,
    recipients: Vec<String>,
    instance_url: &str,
) -> NotificationMessage {
    let kind = task.kind();
    let template = template_for(templates, kind);
    let context = TemplateContext::for_task(task, instance_url);
    NotificationMessage {
        sender: sender.to_string(),
        recipients,
        subject: render(&template.subject, &context),
        body: render(&template.body, &context),
        task_id: task.id.clone(),
        kind,
    }
}
