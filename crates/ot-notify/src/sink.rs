use ot_aws::SesClient;

use crate::error::DeliveryError;
use crate::types::{NotificationMessage, NotifierKind};

/// Delivers one message. Implementations do not retry.
pub trait Notifier {
    fn kind(&self) -> NotifierKind;
    fn send(&self, message: &NotificationMessage) -> Result<(), DeliveryError>;
}

/// Trimmed, non-blank recipient addresses. Fails when none remain.
fn ensure_recipients(message: &NotificationMessage) -> Result<Vec<String>, DeliveryError> {
    let recipients: Vec<String> = message
        .recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    if recipients.is_empty() {
        return Err(DeliveryError::NoRecipients {
            task_id: message.task_id.to_string(),
        });
    }
    Ok(recipients)
}

#[derive(Debug, Clone)]
pub struct SesNotifier {
    pub client: SesClient,
}

impl SesNotifier {
    pub fn new(client: SesClient) -> Self {
        Self { client }
    }
}

impl Notifier for SesNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Ses
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let recipients = ensure_recipients(message)?;
        let message_id = self
            .client
            .send_email(
                &message.sender,
                &recipients,
                &message.subject,
                &message.body,
            )
            .map_err(|source| DeliveryError::Cli {
                task_id: message.task_id.to_string(),
                source,
            })?;
        tracing::info!(
            task = %message.task_id,
            kind = %message.kind,
            recipients = recipients.len(),
            message_id = %message_id,
            "email sent"
        );
        Ok(())
    }
}

/// Dry-run notifier that prints each message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn kind(&self) -> NotifierKind {
        NotifierKind::Stdout
    }

    fn send(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let recipients = ensure_recipients(message)?;
        println!(
            "[{}] task={} from={} to={}\nSubject: {}\n\n{}",
            message.kind,
            message.task_id,
            message.sender,
            recipients.join(", "),
            message.subject,
            message.body
        );
        Ok(())
    }
}
