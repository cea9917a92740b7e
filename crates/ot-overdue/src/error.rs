use std::time::Duration;

use ot_api::ApiError;
use ot_aws::SecretError;
use ot_session::AuthError;

/// Failures that abort a run. Per-task delivery failures are counted in the
/// run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid run configuration: {message}")]
    Config { message: String },
    #[error("failed to obtain login password: {0}")]
    Secret(#[from] SecretError),
    #[error("login failed: {0}")]
    Auth(#[from] AuthError),
    #[error("instance api failed: {0}")]
    Api(#[from] ApiError),
    #[error("run budget of {}s exhausted after {processed} task(s); {remaining} not processed", .budget.as_secs())]
    BudgetExceeded {
        budget: Duration,
        processed: usize,
        remaining: usize,
    },
}
