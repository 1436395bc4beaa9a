/// viya-check - kubectl-driven deployment checks
///
/// Verifies that a Kubernetes-deployed SAS Viya environment matches its
/// expected state by querying the cluster through kubectl.
mod config;
mod kubectl;
mod suite;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Overrides, TestConfig};
use crate::kubectl::client::{DEFAULT_LOG_TAIL, DEFAULT_WAIT_SECS};
use crate::kubectl::json;
use crate::kubectl::{KubectlClient, ProcessExecutor};
use crate::suite::{Check, CheckContext, Marker, Selection};

#[derive(Parser)]
#[command(name = "viya-check")]
#[command(about = "Check a Kubernetes-deployed SAS Viya environment via kubectl", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    target: Target,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where the checks point
#[derive(Args)]
struct Target {
    /// Kubernetes namespace (defaults to the environment file, then sas-viya)
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Environment to test (dev/staging/prod)
    #[arg(long, global = true, default_value = "dev")]
    environment: String,

    /// Use bastion host for connection
    #[arg(long, global = true)]
    use_bastion: bool,

    /// kubectl context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Directory holding environments/<environment>.yaml
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,
}

impl Target {
    fn overrides(&self) -> Overrides {
        Overrides {
            namespace: self.namespace.clone(),
            context: self.context.clone(),
            use_bastion: self.use_bastion,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checks (default)
    Run {
        /// Only run checks with this marker (repeatable)
        #[arg(short, long = "marker", value_enum)]
        markers: Vec<Marker>,

        /// Only run the named check (repeatable)
        #[arg(long = "check")]
        checks: Vec<String>,
    },

    /// List available checks
    List,

    /// Generate example environment file
    Init,

    /// Show resource counts and recent warning events
    Status,

    /// Show node and pod CPU/memory usage
    Top,

    /// Print logs of a pod
    Logs {
        pod: String,

        #[arg(short, long)]
        container: Option<String>,

        #[arg(long, default_value_t = DEFAULT_LOG_TAIL)]
        tail: u32,
    },

    /// Describe a resource
    Describe {
        resource_type: String,
        resource_name: String,
    },

    /// Wait for a resource condition (e.g. deployment/sas-logon-app condition=Available)
    Wait {
        resource: String,
        condition: String,

        /// Seconds before giving up
        #[arg(long, default_value_t = DEFAULT_WAIT_SECS)]
        timeout: u64,
    },

    /// Run a command inside a pod
    Exec {
        pod: String,

        #[arg(short, long)]
        container: Option<String>,

        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("viya_check={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = match &cli.command {
        None => run_checks(&cli, Selection::default()).await,
        Some(Commands::Run { markers, checks }) => {
            let selection = Selection {
                markers: markers.clone(),
                names: checks.clone(),
            };
            run_checks(&cli, selection).await
        }
        Some(Commands::List) => list_checks(),
        Some(Commands::Init) => init_config(&cli).await,
        Some(Commands::Status) => show_status(&cli).await,
        Some(Commands::Top) => show_top(&cli).await,
        Some(Commands::Logs {
            pod,
            container,
            tail,
        }) => show_logs(&cli, pod, container.as_deref(), *tail).await,
        Some(Commands::Describe {
            resource_type,
            resource_name,
        }) => describe(&cli, resource_type, resource_name).await,
        Some(Commands::Wait {
            resource,
            condition,
            timeout,
        }) => wait(&cli, resource, condition, *timeout).await,
        Some(Commands::Exec {
            pod,
            container,
            command,
        }) => exec(&cli, pod, container.as_deref(), command).await,
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration and build a client for it
async fn connect(cli: &Cli, require_config: bool) -> Result<(TestConfig, KubectlClient)> {
    let target = &cli.target;
    let loaded = if require_config {
        TestConfig::load(&target.config_dir, &target.environment, target.overrides())
    } else {
        TestConfig::load_or_default(&target.config_dir, &target.environment, target.overrides())
    };
    let config = loaded.context("Failed to load configuration")?;

    let executor = ProcessExecutor::from_config(&config)?;
    executor
        .check_installed()
        .await
        .context("kubectl is required")?;

    let kubectl = KubectlClient::new(executor, config.namespace.clone(), config.context.clone());
    Ok((config, kubectl))
}

/// Run the selected checks; exit code reflects failures
async fn run_checks(cli: &Cli, selection: Selection) -> Result<i32> {
    selection.validate()?;

    let (config, kubectl) = connect(cli, true).await?;
    info!(
        "Environment: {}, namespace: {}, context: {}",
        cli.target.environment,
        config.namespace,
        config.context.as_deref().unwrap_or("(current)")
    );

    let ctx = CheckContext {
        config: &config,
        kubectl: &kubectl,
    };
    let report = suite::run_suite(&ctx, &selection).await;
    report.log_summary();

    Ok(report.exit_code())
}

fn list_checks() -> Result<i32> {
    for check in Check::ALL {
        println!(
            "{:<34} {:<15} {}",
            check.name(),
            check.marker(),
            check.description()
        );
    }
    Ok(0)
}

/// Write an example environment file
async fn init_config(cli: &Cli) -> Result<i32> {
    let path = TestConfig::environment_path(&cli.target.config_dir, &cli.target.environment);
    if path.exists() {
        anyhow::bail!("Configuration file already exists: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let yaml = serde_yaml::to_string(&TestConfig::example())?;
    tokio::fs::write(&path, yaml)
        .await
        .context("Failed to write configuration file")?;

    info!("Example configuration created: {}", path.display());
    info!("");
    info!("Next steps:");
    info!("  1. List the microservices expected in this environment");
    info!("  2. Run the checks:");
    info!(
        "     viya-check --environment {} run",
        cli.target.environment
    );

    Ok(0)
}

async fn show_status(cli: &Cli) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;

    if !kubectl.namespace_exists(kubectl.namespace()).await {
        warn!("Namespace {} not found", kubectl.namespace());
        return Ok(1);
    }

    let pods = kubectl.get_pods(None).await;
    let running = pods
        .iter()
        .filter(|pod| json::str_at(pod, &["status", "phase"], "") == "Running")
        .count();

    info!("Namespace: {}", kubectl.namespace());
    info!("  Nodes:         {}", kubectl.get_nodes().await.len());
    info!("  Pods:          {} ({} running)", pods.len(), running);
    info!("  Deployments:   {}", kubectl.get_deployments().await.len());
    info!("  StatefulSets:  {}", kubectl.get_statefulsets().await.len());
    info!("  Services:      {}", kubectl.get_services().await.len());
    info!("  Ingresses:     {}", kubectl.get_ingress().await.len());
    info!("  PVCs:          {}", kubectl.get_pvcs().await.len());

    let warnings = kubectl.get_events(Some("type=Warning")).await;
    if !warnings.is_empty() {
        info!("");
        info!("Recent warning events:");
        for event in warnings.iter().rev().take(10) {
            info!(
                "  {} {}/{}: {}",
                json::str_at(event, &["reason"], "Unknown"),
                json::str_at(event, &["involvedObject", "kind"], "?"),
                json::str_at(event, &["involvedObject", "name"], "?"),
                json::str_at(event, &["message"], "").trim()
            );
        }
    }

    Ok(0)
}

async fn show_top(cli: &Cli) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;

    let nodes = kubectl.top_nodes().await;
    if nodes.is_empty() {
        warn!("No node metrics available (is metrics-server installed?)");
    }
    info!("Nodes:");
    for node in &nodes {
        info!(
            "  {:<40} cpu {:>8} ({:>4})  memory {:>10} ({:>4})",
            node.name, node.cpu, node.cpu_percent, node.memory, node.memory_percent
        );
    }

    info!("Pods in {}:", kubectl.namespace());
    for pod in kubectl.top_pods().await {
        info!("  {:<60} cpu {:>8}  memory {:>10}", pod.name, pod.cpu, pod.memory);
    }

    Ok(0)
}

async fn show_logs(cli: &Cli, pod: &str, container: Option<&str>, tail: u32) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;
    let logs = kubectl.get_logs(pod, container, tail).await;
    if logs.is_empty() {
        warn!("No logs returned for {}", pod);
        return Ok(1);
    }
    print!("{}", logs);
    Ok(0)
}

async fn describe(cli: &Cli, resource_type: &str, resource_name: &str) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;
    let text = kubectl.describe(resource_type, resource_name).await;
    if text.is_empty() {
        warn!("Could not describe {} {}", resource_type, resource_name);
        return Ok(1);
    }
    print!("{}", text);
    Ok(0)
}

async fn wait(cli: &Cli, resource: &str, condition: &str, timeout: u64) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;
    if kubectl.wait_for_condition(resource, condition, timeout).await {
        info!("✓ {} met for {}", condition, resource);
        Ok(0)
    } else {
        error!("{} not met for {} within {}s", condition, resource, timeout);
        Ok(1)
    }
}

async fn exec(cli: &Cli, pod: &str, container: Option<&str>, command: &[String]) -> Result<i32> {
    let (_, kubectl) = connect(cli, false).await?;
    let command: Vec<&str> = command.iter().map(String::as_str).collect();
    let (success, stdout) = kubectl.exec_command(pod, &command, container).await;
    print!("{}", stdout);
    Ok(if success { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["viya-check"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.target.environment, "dev");
        assert_eq!(cli.target.config_dir, PathBuf::from("config"));
        assert!(cli.target.namespace.is_none());
        assert!(!cli.target.use_bastion);
    }

    #[test]
    fn test_run_with_markers_and_globals() {
        let cli = Cli::parse_from([
            "viya-check",
            "run",
            "--marker",
            "critical",
            "-m",
            "replicas",
            "--namespace",
            "viya-prod",
            "--use-bastion",
            "--context",
            "prod",
        ]);

        match cli.command {
            Some(Commands::Run { markers, checks }) => {
                assert_eq!(markers, [Marker::Critical, Marker::Replicas]);
                assert!(checks.is_empty());
            }
            _ => panic!("expected run"),
        }
        let overrides = cli.target.overrides();
        assert_eq!(overrides.namespace.as_deref(), Some("viya-prod"));
        assert_eq!(overrides.context.as_deref(), Some("prod"));
        assert!(overrides.use_bastion);
    }

    #[test]
    fn test_exec_trailing_command() {
        let cli = Cli::parse_from(["viya-check", "exec", "sas-cas-0", "-c", "cas", "--", "ls", "-la"]);
        match cli.command {
            Some(Commands::Exec {
                pod,
                container,
                command,
            }) => {
                assert_eq!(pod, "sas-cas-0");
                assert_eq!(container.as_deref(), Some("cas"));
                assert_eq!(command, ["ls", "-la"]);
            }
            _ => panic!("expected exec"),
        }
    }
}
