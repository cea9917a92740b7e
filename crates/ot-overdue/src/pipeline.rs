//! Wires configuration to the real collaborators.

use chrono::{DateTime, Utc};
use ot_api::{HttpTransport, TaskDirectory, TaskQueryService};
use ot_aws::{AwsCli, AwsSecretStore, EnvSecretStore, SecretStore, SesClient};
use ot_core::{Credentials, OverdueBatch, PasswordSource, RunConfig};
use ot_notify::{Notifier, SesNotifier, StdoutNotifier};
use ot_session::{AuthSession, AuthenticatedSession, BrowserLogin};
use secrecy::SecretString;

use crate::error::RunError;
use crate::orchestrator::{Orchestrator, RunSettings, RunSummary};

/// Picks the secret store and secret name the config points at.
pub fn password_store(config: &RunConfig) -> Result<(Box<dyn SecretStore>, String), RunError> {
    match config.aws.password_source() {
        Some(PasswordSource::SecretsManager { secret_id }) => Ok((
            Box::new(AwsSecretStore::new(AwsCli::new(&config.aws.aws_binary))),
            secret_id,
        )),
        Some(PasswordSource::Env { var }) => Ok((Box::new(EnvSecretStore), var)),
        None => Err(RunError::Config {
            message: "set aws.password_secret or aws.password_env".to_string(),
        }),
    }
}

pub fn credentials(config: &RunConfig, password: SecretString) -> Credentials {
    Credentials::new(
        config.accounts.portal_email.trim(),
        config.accounts.idp_username.trim(),
        password,
    )
}

/// Fetches the password, then logs in. A secret failure returns before any
/// browser is started.
pub fn authenticate(
    config: &RunConfig,
    secrets: &dyn SecretStore,
    secret_name: &str,
    auth: &dyn AuthSession,
) -> Result<AuthenticatedSession, RunError> {
    let password = secrets.get_secret(secret_name, &config.aws.region)?;
    tracing::info!(secret = secret_name, "login password loaded");
    let session = auth.authenticate(&credentials(config, password))?;
    Ok(session)
}

pub fn connect(config: &RunConfig) -> Result<TaskQueryService<HttpTransport>, RunError> {
    let (secrets, secret_name) = password_store(config)?;
    let login = BrowserLogin::from_config(config)?;
    let session = authenticate(config, secrets.as_ref(), &secret_name, &login)?;
    let transport = HttpTransport::new(&session)?;
    Ok(TaskQueryService::new(transport))
}

pub fn notifier(config: &RunConfig, dry_run: bool) -> Box<dyn Notifier> {
    if dry_run {
        return Box::new(StdoutNotifier);
    }
    let client = SesClient::new(
        AwsCli::new(&config.aws.aws_binary),
        config.aws.region.trim(),
    );
    Box::new(SesNotifier::new(client))
}

/// Full run: password, login, query, notify.
pub fn run_pipeline(
    config: &RunConfig,
    cutoff: DateTime<Utc>,
    dry_run: bool,
) -> Result<RunSummary, RunError> {
    let directory = connect(config)?;
    let notifier = notifier(config, dry_run);
    tracing::info!(%cutoff, dry_run, notifier = notifier.kind().as_str(), "starting run");
    Orchestrator::new(&directory, notifier.as_ref(), RunSettings::from_config(config)).run(cutoff)
}

pub fn list_overdue(config: &RunConfig, cutoff: DateTime<Utc>) -> Result<OverdueBatch, RunError> {
    let directory = connect(config)?;
    Ok(directory.fetch_overdue(cutoff)?)
}
