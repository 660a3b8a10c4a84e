//! Shell command validator.
//!
//! Runs the project's own tooling (`npm test`, `npm run build`, Playwright)
//! in the generated project directory and turns exit codes into verdicts.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::ValidatorConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::validator::{ExecutionResult, ValidationTarget, Validator, ValidatorKind, Verdict};

/// Validator that shells out to configured commands.
#[derive(Debug, Clone, Default)]
pub struct CommandValidator {
    config: ValidatorConfig,
}

impl CommandValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run a shell command line in `cwd` with a timeout in seconds (0 = none).
    pub async fn execute(
        &self,
        command_line: &str,
        cwd: &Path,
        timeout_secs: u64,
    ) -> RunnerResult<ExecutionResult> {
        debug!("Command: {} (in {:?})", command_line, cwd);

        let mut cmd = shell(command_line);
        cmd.current_dir(cwd)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RunnerError::SpawnFailed {
            command: command_line.to_string(),
            source,
        })?;

        let started_at = Utc::now();
        let output = if timeout_secs > 0 {
            match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await
            {
                Ok(output) => output?,
                Err(_) => {
                    return Err(RunnerError::Timeout {
                        command: command_line.to_string(),
                        seconds: timeout_secs,
                    })
                }
            }
        } else {
            child.wait_with_output().await?
        };
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code == 0 {
            info!("Command completed successfully in {}ms", duration_ms);
        } else {
            error!(
                "Command failed with exit code {} after {}ms",
                exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            command: command_line.to_string(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            started_at,
            finished_at,
            duration_ms,
        })
    }
}

#[async_trait]
impl Validator for CommandValidator {
    async fn validate(&self, target: &ValidationTarget, kind: ValidatorKind) -> Verdict {
        let Some(template) = self.config.command_for(kind) else {
            debug!("No command configured for {}, skipping", kind);
            return Verdict::skipped(kind);
        };

        let command_line = ValidatorConfig::render(template, target.test_file.as_deref());
        info!(
            kind = %kind,
            unit = target.unit.as_deref().unwrap_or("project"),
            "Running validator: {}",
            command_line
        );

        match self
            .execute(&command_line, &target.root, self.config.timeouts.for_kind(kind))
            .await
        {
            Ok(result) => Verdict {
                passed: result.success(),
                log: result.combined_output(),
            },
            Err(e) => {
                warn!(kind = %kind, "Validator crashed: {}", e);
                Verdict::fail(format!("{} validator crashed: {}", kind, e))
            }
        }
    }

    async fn prepare(&self, root: &Path) -> RunnerResult<()> {
        let Some(command_line) = self.config.prepare_command() else {
            return Ok(());
        };

        info!("Installing project dependencies: {}", command_line);
        let result = self
            .execute(command_line, root, self.config.timeouts.prepare)
            .await?;
        if result.success() {
            Ok(())
        } else {
            Err(RunnerError::ExecutionFailed(format!(
                "'{}' exited with code {}: {}",
                command_line,
                result.exit_code,
                result.stderr.lines().last().unwrap_or("Unknown error")
            )))
        }
    }
}

#[cfg(unix)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn validator(kind: ValidatorKind, command: &str) -> CommandValidator {
        CommandValidator::new(ValidatorConfig::empty().with_command(kind, command))
    }

    #[tokio::test]
    async fn test_passing_command() {
        let temp = TempDir::new().unwrap();
        let v = validator(ValidatorKind::Build, "echo compiled");
        let verdict = v
            .validate(&ValidationTarget::project(temp.path()), ValidatorKind::Build)
            .await;
        assert!(verdict.passed);
        assert!(verdict.log.contains("compiled"));
    }

    #[tokio::test]
    async fn test_failing_command_captures_stderr() {
        let temp = TempDir::new().unwrap();
        let v = validator(ValidatorKind::Build, "echo 'Error: boom' >&2; exit 2");
        let verdict = v
            .validate(&ValidationTarget::project(temp.path()), ValidatorKind::Build)
            .await;
        assert!(!verdict.passed);
        assert!(verdict.log.contains("Error: boom"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let temp = TempDir::new().unwrap();
        let config = ValidatorConfig::empty()
            .with_command(ValidatorKind::EndToEnd, "sleep 5")
            .with_timeout(ValidatorKind::EndToEnd, 1);
        let verdict = CommandValidator::new(config)
            .validate(&ValidationTarget::project(temp.path()), ValidatorKind::EndToEnd)
            .await;
        assert!(!verdict.passed);
        assert!(verdict.log.contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_command_is_skipped() {
        let temp = TempDir::new().unwrap();
        let verdict = CommandValidator::new(ValidatorConfig::empty())
            .validate(
                &ValidationTarget::project(temp.path()),
                ValidatorKind::PerformanceAccessibility,
            )
            .await;
        assert!(verdict.passed);
        assert!(verdict.log.contains("skipped"));
    }

    #[tokio::test]
    async fn test_test_file_placeholder() {
        let temp = TempDir::new().unwrap();
        let v = validator(ValidatorKind::UnitTest, "echo running {test_file}");
        let target = ValidationTarget::unit(temp.path(), "component:Hero")
            .with_test_file("src/components/Hero.test.tsx");
        let verdict = v.validate(&target, ValidatorKind::UnitTest).await;
        assert!(verdict.passed);
        assert!(verdict.log.contains("running src/components/Hero.test.tsx"));
    }

    #[tokio::test]
    async fn test_prepare_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let v = CommandValidator::new(ValidatorConfig::empty().with_prepare("exit 1"));
        assert!(v.prepare(temp.path()).await.is_err());
    }
}
