/// kubectl command client
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::executor::{Executor, ProcessExecutor};
use super::json::parse_items;
use super::metrics::{parse_top_nodes, parse_top_pods, NodeMetrics, PodMetrics};
use crate::utils::command::CommandOutput;

/// Ceiling for a single kubectl invocation
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time given to `kubectl wait` beyond its own `--timeout`
const WAIT_GRACE: Duration = Duration::from_secs(10);

/// Default line count for `get_logs`
pub const DEFAULT_LOG_TAIL: u32 = 100;

/// Default `wait_for_condition` timeout in seconds
pub const DEFAULT_WAIT_SECS: u64 = 300;

/// Namespace-scoped kubectl client
///
/// Every query degrades to an empty result on failure; callers decide what
/// an empty result means.
pub struct KubectlClient<E = ProcessExecutor> {
    executor: E,
    namespace: String,
    context: Option<String>,
}

impl<E: Executor> KubectlClient<E> {
    /// Create a new kubectl client
    pub fn new(executor: E, namespace: impl Into<String>, context: Option<String>) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
            context,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[cfg(test)]
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run kubectl with `args`, optionally requesting JSON output
    pub async fn execute(&self, args: &[&str], json_output: bool) -> CommandOutput {
        self.execute_with_timeout(args, json_output, COMMAND_TIMEOUT)
            .await
    }

    async fn execute_with_timeout(
        &self,
        args: &[&str],
        json_output: bool,
        timeout: Duration,
    ) -> CommandOutput {
        let mut cmd: Vec<String> = Vec::with_capacity(args.len() + 4);
        if let Some(context) = &self.context {
            cmd.push("--context".to_string());
            cmd.push(context.clone());
        }
        cmd.extend(args.iter().map(|a| a.to_string()));
        if json_output {
            cmd.push("-o".to_string());
            cmd.push("json".to_string());
        }

        let output = self.executor.run(&cmd, timeout).await;
        if !output.success {
            debug!("kubectl {} failed: {}", cmd.join(" "), output.stderr.trim());
        }
        output
    }

    /// `kubectl get` returning the list items
    async fn get_items(&self, args: &[&str]) -> Vec<Value> {
        let output = self.execute(args, true).await;
        if !output.success {
            return Vec::new();
        }
        parse_items(&output.stdout)
    }

    /// `kubectl get <kind> -n <namespace> [extra...]`
    async fn get_namespaced(&self, kind: &str, extra: &[&str]) -> Vec<Value> {
        let mut args = vec!["get", kind, "-n", self.namespace.as_str()];
        args.extend_from_slice(extra);
        self.get_items(&args).await
    }

    /// Get pods in namespace
    pub async fn get_pods(&self, label_selector: Option<&str>) -> Vec<Value> {
        match label_selector {
            Some(selector) => self.get_namespaced("pods", &["-l", selector]).await,
            None => self.get_namespaced("pods", &[]).await,
        }
    }

    pub async fn get_deployments(&self) -> Vec<Value> {
        self.get_namespaced("deployments", &[]).await
    }

    pub async fn get_services(&self) -> Vec<Value> {
        self.get_namespaced("services", &[]).await
    }

    pub async fn get_statefulsets(&self) -> Vec<Value> {
        self.get_namespaced("statefulsets", &[]).await
    }

    pub async fn get_pvcs(&self) -> Vec<Value> {
        self.get_namespaced("pvc", &[]).await
    }

    /// Get events in namespace
    pub async fn get_events(&self, field_selector: Option<&str>) -> Vec<Value> {
        match field_selector {
            Some(selector) => {
                self.get_namespaced("events", &["--field-selector", selector])
                    .await
            }
            None => self.get_namespaced("events", &[]).await,
        }
    }

    pub async fn get_ingress(&self) -> Vec<Value> {
        self.get_namespaced("ingress", &[]).await
    }

    /// Get cluster nodes (not namespaced)
    pub async fn get_nodes(&self) -> Vec<Value> {
        self.get_items(&["get", "nodes"]).await
    }

    /// Check whether a namespace exists
    pub async fn namespace_exists(&self, name: &str) -> bool {
        self.execute(&["get", "namespace", name], false)
            .await
            .success
    }

    /// Get pod logs, or an empty string on failure
    pub async fn get_logs(&self, pod_name: &str, container: Option<&str>, tail: u32) -> String {
        let tail = format!("--tail={}", tail);
        let mut args = vec!["logs", pod_name, "-n", self.namespace.as_str(), tail.as_str()];
        if let Some(container) = container {
            args.extend(["-c", container]);
        }

        let output = self.execute(&args, false).await;
        if output.success {
            output.stdout
        } else {
            String::new()
        }
    }

    /// Describe a resource, or an empty string on failure
    pub async fn describe(&self, resource_type: &str, resource_name: &str) -> String {
        let output = self
            .execute(
                &[
                    "describe",
                    resource_type,
                    resource_name,
                    "-n",
                    self.namespace.as_str(),
                ],
                false,
            )
            .await;
        if output.success {
            output.stdout
        } else {
            String::new()
        }
    }

    /// Block until `condition` holds for `resource` or `timeout_secs` elapse
    ///
    /// Polling is left to `kubectl wait`; the subprocess ceiling is its
    /// timeout plus a grace period.
    pub async fn wait_for_condition(
        &self,
        resource: &str,
        condition: &str,
        timeout_secs: u64,
    ) -> bool {
        info!(
            "Waiting up to {}s for {} on {}...",
            timeout_secs, condition, resource
        );

        let for_arg = format!("--for={}", condition);
        let timeout_arg = format!("--timeout={}s", timeout_secs);
        let args = [
            "wait",
            resource,
            for_arg.as_str(),
            "-n",
            self.namespace.as_str(),
            timeout_arg.as_str(),
        ];

        let ceiling = Duration::from_secs(timeout_secs).saturating_add(WAIT_GRACE);
        let output = self.execute_with_timeout(&args, false, ceiling).await;
        if !output.success {
            warn!("Condition {} not met for {}", condition, resource);
        }
        output.success
    }

    /// Node CPU and memory usage
    pub async fn top_nodes(&self) -> Vec<NodeMetrics> {
        let output = self.execute(&["top", "nodes", "--no-headers"], false).await;
        if !output.success {
            return Vec::new();
        }
        parse_top_nodes(&output.stdout)
    }

    /// Pod CPU and memory usage in namespace
    pub async fn top_pods(&self) -> Vec<PodMetrics> {
        let output = self
            .execute(
                &["top", "pods", "-n", self.namespace.as_str(), "--no-headers"],
                false,
            )
            .await;
        if !output.success {
            return Vec::new();
        }
        parse_top_pods(&output.stdout)
    }

    /// Run a command inside a pod
    pub async fn exec_command(
        &self,
        pod_name: &str,
        command: &[&str],
        container: Option<&str>,
    ) -> (bool, String) {
        let mut args = vec!["exec", pod_name, "-n", self.namespace.as_str()];
        if let Some(container) = container {
            args.extend(["-c", container]);
        }
        args.push("--");
        args.extend_from_slice(command);

        let output = self.execute(&args, false).await;
        (output.success, output.stdout)
    }
}
