/// Process execution seam for kubectl invocations
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{BastionConfig, TestConfig};
use crate::utils::command::{check_tool_installed, CommandBuilder, CommandOutput};

/// Runs one kubectl invocation
///
/// Implementations never fail: spawn errors and timeouts come back as an
/// unsuccessful [`CommandOutput`] with the reason in `stderr`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, args: &[String], timeout: Duration) -> CommandOutput;
}

/// How the kubectl binary is reached
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transport {
    Local { kubectl: String },
    Bastion { target: String, kubectl: String },
}

/// Executor that spawns kubectl, locally or through an SSH bastion
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    transport: Transport,
}

impl ProcessExecutor {
    /// Run the local `kubectl` from PATH
    pub fn local() -> Self {
        Self {
            transport: Transport::Local {
                kubectl: "kubectl".to_string(),
            },
        }
    }

    /// Run kubectl on a bastion host over ssh
    pub fn via_bastion(bastion: &BastionConfig) -> Self {
        let target = match &bastion.user {
            Some(user) => format!("{}@{}", user, bastion.host),
            None => bastion.host.clone(),
        };
        Self {
            transport: Transport::Bastion {
                target,
                kubectl: bastion.kubectl.clone(),
            },
        }
    }

    /// Pick the transport the configuration asks for
    pub fn from_config(config: &TestConfig) -> Result<Self> {
        if !config.use_bastion {
            return Ok(Self::local());
        }
        let bastion = config
            .bastion
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("use_bastion is set but no bastion is configured"))?;
        Ok(Self::via_bastion(bastion))
    }

    /// Check that the binary this executor spawns is installed
    pub async fn check_installed(&self) -> Result<()> {
        match &self.transport {
            Transport::Local { kubectl } => {
                check_tool_installed(
                    kubectl,
                    &["version", "--client"],
                    "https://kubernetes.io/docs/tasks/tools/",
                )
                .await
            }
            Transport::Bastion { .. } => {
                check_tool_installed("ssh", &["-V"], "https://www.openssh.com/").await
            }
        }
    }

    fn command(&self, args: &[String]) -> CommandBuilder {
        match &self.transport {
            Transport::Local { kubectl } => CommandBuilder::new(kubectl).args(args),
            Transport::Bastion { target, kubectl } => CommandBuilder::new("ssh")
                .args(["-o", "BatchMode=yes", target.as_str(), "--"])
                .arg(shell_quote(kubectl))
                .args(args.iter().map(|a| shell_quote(a))),
        }
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn run(&self, args: &[String], timeout: Duration) -> CommandOutput {
        let command = self
            .command(args)
            .timeout(timeout)
            .context("Failed to run kubectl");
        let rendered = command.display();

        match command.output().await {
            Ok(output) => {
                if !output.success {
                    debug!("Command exited non-zero: {}: {}", rendered, output.stderr.trim());
                }
                output
            }
            Err(e) => {
                warn!("Command failed: {}: {:#}", rendered, e);
                CommandOutput::failure(format!("{:#}", e))
            }
        }
    }
}

/// Quote an argument for a POSIX shell on the far side of ssh
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
