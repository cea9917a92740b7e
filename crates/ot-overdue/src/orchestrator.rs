//! The notification loop over one batch of overdue tasks.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ot_api::TaskDirectory;
use ot_core::{OverdueBatch, RunConfig, TemplatesConfig};
use ot_notify::{compose_message, Notifier};
use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::recipients::RecipientCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub admin_email: String,
    pub sender: String,
    pub instance_url: String,
    pub templates: TemplatesConfig,
    pub max_run: Option<Duration>,
}

impl RunSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            admin_email: config.accounts.admin_email.trim().to_string(),
            sender: config.accounts.sender.trim().to_string(),
            instance_url: config.instance.url.trim().to_string(),
            templates: config.templates.clone(),
            max_run: config.run.max_run_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub truncated: bool,
}

/// Walks overdue tasks in the order the instance returned them.
///
/// A failed lookup aborts the run. A failed send is logged and counted, and
/// the loop moves on to the next task.
pub struct Orchestrator<'a, D: ?Sized, N: ?Sized> {
    directory: &'a D,
    notifier: &'a N,
    settings: RunSettings,
    cache: RecipientCache,
}

impl<'a, D, N> Orchestrator<'a, D, N>
where
    D: TaskDirectory + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(directory: &'a D, notifier: &'a N, settings: RunSettings) -> Self {
        Self {
            directory,
            notifier,
            settings,
            cache: RecipientCache::new(),
        }
    }

    pub fn run(&mut self, cutoff: DateTime<Utc>) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let batch = self.directory.fetch_overdue(cutoff)?;
        self.notify_batch(&batch, started)
    }

    pub fn notify_batch(
        &mut self,
        batch: &OverdueBatch,
        started: Instant,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary {
            truncated: batch.truncated,
            ..RunSummary::default()
        };
        if batch.truncated {
            tracing::warn!(
                tasks = batch.tasks.len(),
                "only the first page of overdue tasks will be notified"
            );
        }

        for (index, task) in batch.tasks.iter().enumerate() {
            if let Some(budget) = self.settings.max_run {
                if started.elapsed() >= budget {
                    return Err(RunError::BudgetExceeded {
                        budget,
                        processed: summary.processed,
                        remaining: batch.tasks.len() - index,
                    });
                }
            }

            let recipients =
                self.cache
                    .recipients_for(self.directory, task, &self.settings.admin_email)?;
            let message = compose_message(
                &self.settings.templates,
                task,
                &self.settings.sender,
                recipients.into_iter().collect(),
                &self.settings.instance_url,
            );
            summary.processed += 1;

            match self.notifier.send(&message) {
                Ok(()) => summary.sent += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(
                        task = %task.id,
                        kind = %message.kind,
                        notifier = self.notifier.kind().as_str(),
                        error = %err,
                        "notification failed; continuing with next task"
                    );
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            sent = summary.sent,
            failed = summary.failed,
            truncated = summary.truncated,
            cached_groups = self.cache.len(),
            "run complete"
        );
        Ok(summary)
    }
}
