/// Scripted executor for exercising the client and checks without a cluster
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use super::executor::Executor;
use crate::utils::command::CommandOutput;

/// Answers invocations whose arguments contain a scripted sequence
#[derive(Default)]
pub struct FakeExecutor {
    responses: Vec<(Vec<String>, CommandOutput)>,
    calls: Mutex<Vec<(Vec<String>, Duration)>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `output` when the args contain `needle` contiguously
    pub fn respond(mut self, needle: &[&str], output: CommandOutput) -> Self {
        let needle = needle.iter().map(|s| s.to_string()).collect();
        self.responses.push((needle, output));
        self
    }

    /// Respond with a successful stdout
    pub fn stdout(self, needle: &[&str], stdout: &str) -> Self {
        self.respond(
            needle,
            CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Respond with a `kubectl get -o json` list
    pub fn items(self, needle: &[&str], items: Vec<Value>) -> Self {
        let body = json!({"apiVersion": "v1", "kind": "List", "items": items});
        self.stdout(needle, &body.to_string())
    }

    /// Respond with a failed invocation
    pub fn fail(self, needle: &[&str], stderr: &str) -> Self {
        self.respond(needle, CommandOutput::failure(stderr))
    }

    /// Every invocation seen so far
    pub fn calls(&self) -> Vec<(Vec<String>, Duration)> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of the most recent invocation
    pub fn last_args(&self) -> Vec<String> {
        self.calls().last().map(|(args, _)| args.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn run(&self, args: &[String], timeout: Duration) -> CommandOutput {
        self.calls.lock().unwrap().push((args.to_vec(), timeout));

        self.responses
            .iter()
            .find(|(needle, _)| args.windows(needle.len()).any(|w| w == needle.as_slice()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::failure("no scripted response"))
    }
}
