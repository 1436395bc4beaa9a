/// Command execution utilities shared by the kubectl executor and tool checks
use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Result from command execution with captured output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Create from tokio Command output
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }

    /// A failed result carrying a synthesized error message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: message.into(),
        }
    }
}

/// Builder for executing external commands with common patterns
pub struct CommandBuilder {
    command: Command,
    context_msg: Option<String>,
    timeout: Option<Duration>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self {
            command,
            context_msg: None,
            timeout: None,
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Set context message for error reporting
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// Kill the process if it has not exited within `limit`
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Render the program and its arguments for log lines
    pub fn display(&self) -> String {
        let std_cmd = self.command.as_std();
        std::iter::once(std_cmd.get_program())
            .chain(std_cmd.get_args())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute and return raw output
    ///
    /// A timeout drops the child future, which kills and reaps the process.
    pub async fn output(mut self) -> Result<CommandOutput> {
        debug!("Running: {}", self.display());

        let limit = self.timeout;
        let pending = self.command.output();
        let result = match limit {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => anyhow::bail!("Command timed out"),
            },
            None => pending.await,
        };

        let output = match &self.context_msg {
            Some(ctx) => result.context(ctx.clone())?,
            None => result?,
        };
        Ok(CommandOutput::from_output(output))
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args)
        .timeout(Duration::from_secs(10))
        .output()
        .await;

    match output {
        Ok(out) if out.success => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_builder_basic() {
        let result = CommandBuilder::new("echo")
            .arg("test")
            .context("Testing echo command")
            .output()
            .await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.success);
        assert!(output.stdout.contains("test"));
    }

    #[tokio::test]
    async fn test_command_builder_nonzero_exit() {
        let output = CommandBuilder::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .output()
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.stderr.contains("boom"));
    }

    #[tokio::test]
    async fn test_command_builder_timeout() {
        let started = std::time::Instant::now();
        let result = CommandBuilder::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(200))
            .output()
            .await;

        assert_eq!(result.unwrap_err().to_string(), "Command timed out");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let result = CommandBuilder::new("definitely-not-a-real-binary-xyz")
            .context("Failed to start tool")
            .output()
            .await;

        assert!(result.unwrap_err().to_string().contains("Failed to start tool"));
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let builder = CommandBuilder::new("kubectl").args(["get", "pods"]);
        assert_eq!(builder.display(), "kubectl get pods");
    }
}
