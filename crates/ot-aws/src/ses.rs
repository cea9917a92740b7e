//! Plain-text email through SES.

use serde::Deserialize;

use crate::command::{AwsCall, AwsCli};
use crate::error::AwsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SesClient {
    pub cli: AwsCli,
    pub region: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailOutput {
    #[serde(rename = "MessageId")]
    message_id: String,
}

impl SesClient {
    pub fn new(cli: AwsCli, region: impl Into<String>) -> Self {
        Self {
            cli,
            region: region.into(),
        }
    }

    /// Sends one UTF-8 text message and returns the SES message id.
    ///
    /// `sender` may carry a display name (`Pretty Name <bot@example.com>`);
    /// `recipients` are bare addresses.
    pub fn send_email(
        &self,
        sender: &str,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<String, AwsError> {
        if recipients.is_empty() {
            return Err(AwsError::ContractViolation {
                message: "ses send-email requires at least one recipient".to_string(),
            });
        }

        let mut args: Vec<&str> = vec!["ses", "send-email", "--from", sender, "--to"];
        args.extend(recipients.iter().map(String::as_str));
        args.extend([
            "--subject",
            subject,
            "--text",
            body,
            "--output",
            "json",
        ]);

        let output = self.cli.run(AwsCall::SesSendEmail, &self.region, args)?;
        parse_message_id(&output.stdout)
    }
}

fn parse_message_id(stdout: &str) -> Result<String, AwsError> {
    let parsed: SendEmailOutput =
        serde_json::from_str(stdout.trim()).map_err(|e| AwsError::Parse {
            message: format!("send-email output is not the expected json: {e}"),
        })?;
    Ok(parsed.message_id)
}
