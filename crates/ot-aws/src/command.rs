use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::AwsError;

/// AWS CLI operations this workspace is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AwsCall {
    GetSecretValue,
    SesSendEmail,
}

impl AwsCall {
    pub fn as_str(self) -> &'static str {
        match self {
            AwsCall::GetSecretValue => "secretsmanager get-secret-value",
            AwsCall::SesSendEmail => "ses send-email",
        }
    }

    fn leading_args(self) -> [&'static str; 2] {
        match self {
            AwsCall::GetSecretValue => ["secretsmanager", "get-secret-value"],
            AwsCall::SesSendEmail => ["ses", "send-email"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCli {
    pub binary: PathBuf,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("aws"),
        }
    }
}

impl AwsCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Runs one allowed call against `region`. Credentials come from the
    /// usual AWS environment (profile files, env vars or an instance role).
    pub fn run<I, S>(&self, call: AwsCall, region: &str, args: I) -> Result<AwsOutput, AwsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let owned_args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        validate_contract(call, region, &owned_args)?;

        let mut command = Command::new(&self.binary);
        for arg in &owned_args {
            command.arg(arg);
        }
        command.arg("--region").arg(region);

        let rendered = render_command(&self.binary, call, region);
        tracing::debug!(command = %rendered, "running aws cli");
        let output = command.output().map_err(|source| AwsError::Io {
            command: rendered.clone(),
            source,
        })?;

        let stdout = String::from_utf8(output.stdout).map_err(|source| AwsError::NonUtf8Output {
            command: rendered.clone(),
            stream: "stdout",
            source,
        })?;
        let stderr = String::from_utf8(output.stderr).map_err(|source| AwsError::NonUtf8Output {
            command: rendered.clone(),
            stream: "stderr",
            source,
        })?;

        if !output.status.success() {
            return Err(AwsError::CommandFailed {
                command: rendered,
                status: output.status.code(),
                stderr,
            });
        }

        Ok(AwsOutput { stdout, stderr })
    }
}

fn validate_contract(call: AwsCall, region: &str, args: &[OsString]) -> Result<(), AwsError> {
    if region.trim().is_empty() {
        return Err(AwsError::ContractViolation {
            message: format!("aws {} requires a region", call.as_str()),
        });
    }

    let [service, operation] = call.leading_args();
    let leading_ok = arg_eq(args, 0, service) && arg_eq(args, 1, operation);
    let ok = leading_ok
        && match call {
            AwsCall::GetSecretValue => flag_value(args, "--secret-id")
                .map(|id| !id.trim().is_empty())
                .unwrap_or(false),
            AwsCall::SesSendEmail => {
                flag_value(args, "--from").is_some()
                    && flag_value(args, "--to")
                        .map(|to| !to.starts_with("--"))
                        .unwrap_or(false)
            }
        };

    if ok {
        return Ok(());
    }

    Err(AwsError::ContractViolation {
        message: format!("disallowed aws invocation for {}: {:?}", call.as_str(), args),
    })
}

fn flag_value(args: &[OsString], flag: &str) -> Option<String> {
    let idx = args.iter().position(|arg| arg == flag)?;
    args.get(idx + 1)
        .map(|value| value.to_string_lossy().to_string())
}

fn arg_eq(args: &[OsString], idx: usize, expected: &str) -> bool {
    args.get(idx)
        .map(|x| x.to_string_lossy() == expected)
        .unwrap_or(false)
}

// Only the call and region are rendered; arguments carry addresses and bodies.
fn render_command(binary: &Path, call: AwsCall, region: &str) -> String {
    format!(
        "{} {} --region {}",
        binary.to_string_lossy(),
        call.as_str(),
        region
    )
}
