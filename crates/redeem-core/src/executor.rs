//! Side-effect command execution.
//!
//! Provides the trait for launching reward commands, a process-based
//! implementation, and [`ActionGroup`] for running several of them
//! concurrently within one request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::error::{RedeemError, Result};

/// A command launched in response to a reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCommand {
    /// Short name used in logs and errors.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Extra variables added on top of the inherited environment.
    pub env: HashMap<String, String>,
}

impl ActionCommand {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Trait for running side-effect commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion; a non-zero exit is an error.
    async fn run(&self, command: &ActionCommand) -> Result<()>;
}

/// Runs commands as child processes with a per-command timeout.
///
/// On timeout the child is killed on a best-effort basis and
/// [`RedeemError::ActionTimeout`] is reported.
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ActionCommand) -> Result<()> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| RedeemError::ActionSpawn {
                action: command.name.clone(),
                source,
            })?;

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = tokio::time::sleep(self.timeout) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out action {}: {}", command.name, e);
                }
                return Err(RedeemError::ActionTimeout {
                    action: command.name.clone(),
                    timeout: self.timeout,
                });
            }
        };

        if !status.success() {
            return Err(RedeemError::ActionFailed {
                action: command.name.clone(),
                status: status.to_string(),
            });
        }

        tracing::debug!("Action {} finished", command.name);
        Ok(())
    }
}

/// Independently launched actions for one request.
///
/// Every spawned action runs to completion; a failure in one never cancels
/// the others. [`ActionGroup::wait`] reports the first failure observed.
pub struct ActionGroup {
    runner: Arc<dyn CommandRunner>,
    tasks: JoinSet<Result<()>>,
}

impl ActionGroup {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            tasks: JoinSet::new(),
        }
    }

    /// Launches `command` without waiting for it.
    pub fn spawn(&mut self, command: ActionCommand) {
        let runner = Arc::clone(&self.runner);
        self.tasks.spawn(async move { runner.run(&command).await });
    }

    /// Waits for every action, returning the first failure observed.
    pub async fn wait(mut self) -> Result<()> {
        let mut first_err = None;
        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined
                .map_err(|e| RedeemError::ActionJoin(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = outcome {
                tracing::debug!("Action failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sh(name: &str, script: &str) -> ActionCommand {
        ActionCommand::new(name, "/bin/sh").arg("-c").arg(script)
    }

    #[test]
    fn test_action_command_builder() {
        let cmd = ActionCommand::new("play", "play")
            .arg("woof.mp3")
            .env("AUDIODEV", "hw:1,0");
        assert_eq!(cmd.args, vec!["woof.mp3".to_string()]);
        assert_eq!(cmd.env.get("AUDIODEV").map(String::as_str), Some("hw:1,0"));
    }

    #[tokio::test]
    async fn test_process_runner_success() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        runner.run(&sh("true", "exit 0")).await.unwrap();
    }

    #[tokio::test]
    async fn test_process_runner_nonzero_exit() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let err = runner.run(&sh("fails", "exit 3")).await.unwrap_err();
        assert!(matches!(err, RedeemError::ActionFailed { ref action, .. } if action == "fails"));
    }

    #[tokio::test]
    async fn test_process_runner_missing_program() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let cmd = ActionCommand::new("ghost", "/nonexistent/redeem-test-binary");
        let err = runner.run(&cmd).await.unwrap_err();
        assert!(matches!(err, RedeemError::ActionSpawn { .. }));
    }

    #[tokio::test]
    async fn test_process_runner_env_is_added() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let cmd = sh("env", r#"test "$REDEEM_TEST_VAR" = "set" && test -n "$PATH""#)
            .env("REDEEM_TEST_VAR", "set");
        runner.run(&cmd).await.unwrap();
    }

    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let err = runner.run(&sh("sleepy", "sleep 5")).await.unwrap_err();
        assert!(matches!(err, RedeemError::ActionTimeout { timeout, .. } if timeout == Duration::from_millis(100)));
        assert_eq!(err.to_string(), "Action sleepy exceeded timeout of 100ms");
    }

    struct CountingRunner {
        finished: AtomicUsize,
    }

    #[async_trait]
    impl CommandRunner for CountingRunner {
        async fn run(&self, command: &ActionCommand) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            if command.program == "fail" {
                return Err(RedeemError::ActionFailed {
                    action: command.name.clone(),
                    status: "exit status: 1".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_group_waits_for_all_after_failure() {
        let runner = Arc::new(CountingRunner {
            finished: AtomicUsize::new(0),
        });
        let mut group = ActionGroup::new(runner.clone());
        group.spawn(ActionCommand::new("bad", "fail"));
        group.spawn(ActionCommand::new("good-1", "ok"));
        group.spawn(ActionCommand::new("good-2", "ok"));

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, RedeemError::ActionFailed { ref action, .. } if action == "bad"));
        assert_eq!(runner.finished.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_group_succeeds() {
        let group = ActionGroup::new(Arc::new(ProcessRunner::new(Duration::from_secs(1))));
        group.wait().await.unwrap();
    }
}
