use ot_aws::AwsError;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification for task {task_id} has no recipients")]
    NoRecipients { task_id: String },
    #[error("notification for task {task_id} failed: {source}")]
    Cli {
        task_id: String,
        #[source]
        source: AwsError,
    },
}

#[cfg(test)]
mod tests {
    use super::DeliveryError;
    use ot_aws::AwsError;

    #[test]
    fn no_recipients_formats_task_id() {
        let err = DeliveryError::NoRecipients {
            task_id: "T1".to_string(),
        };

        assert_eq!(err.to_string(), "notification for task T1 has no recipients");
        assert!(matches!(err, DeliveryError::NoRecipients { ref task_id } if task_id == "T1"));
    }

    #[test]
    fn send_failure_keeps_cli_error_as_source() {
        let err = DeliveryError::Cli {
            task_id: "T2".to_string(),
            source: AwsError::ContractViolation {
                message: "missing --from".to_string(),
            },
        };

        assert!(err.to_string().starts_with("notification for task T2 failed: "));
        assert!(std::error::Error::source(&err).is_some());
    }
}
