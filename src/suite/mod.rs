/// Deployment checks run against live cluster state
pub mod deployments;
pub mod report;
pub mod storage;

use clap::ValueEnum;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::TestConfig;
use crate::kubectl::{Executor, KubectlClient};
use report::{CheckReport, Outcome, SuiteReport};

/// Why a check did not pass
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckError {
    /// Expected state does not hold
    #[error("{0}")]
    Failed(String),

    /// Advisory finding, recorded without failing the run
    #[error("skipped: {0}")]
    Skipped(String),
}

pub type CheckResult = Result<(), CheckError>;

/// Fail with `message` unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> CheckResult {
    if condition {
        Ok(())
    } else {
        Err(CheckError::Failed(message()))
    }
}

/// Category tag used to select checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Marker {
    Critical,
    Infrastructure,
    Slow,
    Resources,
    Replicas,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Marker::Critical => "critical",
            Marker::Infrastructure => "infrastructure",
            Marker::Slow => "slow",
            Marker::Resources => "resources",
            Marker::Replicas => "replicas",
        };
        f.pad(name)
    }
}

/// Everything a check may read
pub struct CheckContext<'a, E: Executor> {
    pub config: &'a TestConfig,
    pub kubectl: &'a KubectlClient<E>,
}

/// The registered checks, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    NamespaceExists,
    CasControllerDeployment,
    CoreMicroservices,
    Statefulsets,
    PvcsBound,
    DeploymentRolloutStatus,
    DeploymentResourceLimits,
    DeploymentReplicas,
}

impl Check {
    pub const ALL: [Check; 8] = [
        Check::NamespaceExists,
        Check::CasControllerDeployment,
        Check::CoreMicroservices,
        Check::Statefulsets,
        Check::PvcsBound,
        Check::DeploymentRolloutStatus,
        Check::DeploymentResourceLimits,
        Check::DeploymentReplicas,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::NamespaceExists => "test_namespace_exists",
            Check::CasControllerDeployment => "test_cas_controller_deployment",
            Check::CoreMicroservices => "test_core_microservices",
            Check::Statefulsets => "test_statefulsets",
            Check::PvcsBound => "test_pvcs_bound",
            Check::DeploymentRolloutStatus => "test_deployment_rollout_status",
            Check::DeploymentResourceLimits => "test_deployment_resource_limits",
            Check::DeploymentReplicas => "test_deployment_replicas",
        }
    }

    pub fn marker(self) -> Marker {
        match self {
            Check::NamespaceExists | Check::CasControllerDeployment | Check::CoreMicroservices => {
                Marker::Critical
            }
            Check::Statefulsets | Check::PvcsBound => Marker::Infrastructure,
            Check::DeploymentRolloutStatus => Marker::Slow,
            Check::DeploymentResourceLimits => Marker::Resources,
            Check::DeploymentReplicas => Marker::Replicas,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Check::NamespaceExists => "Namespace exists",
            Check::CasControllerDeployment => "CAS deployments are fully ready",
            Check::CoreMicroservices => "Configured microservices are deployed",
            Check::Statefulsets => "PostgreSQL statefulsets are ready",
            Check::PvcsBound => "Persistent volume claims are bound",
            Check::DeploymentRolloutStatus => "Deployments rolled out successfully",
            Check::DeploymentResourceLimits => "Containers declare resource limits",
            Check::DeploymentReplicas => "Critical services run multiple replicas",
        }
    }

    /// Look a check up by its name
    pub fn from_name(name: &str) -> Option<Check> {
        Self::ALL.into_iter().find(|check| check.name() == name)
    }

    pub async fn run<E: Executor>(self, ctx: &CheckContext<'_, E>) -> CheckResult {
        match self {
            Check::NamespaceExists => deployments::namespace_exists(ctx).await,
            Check::CasControllerDeployment => deployments::cas_controller_deployment(ctx).await,
            Check::CoreMicroservices => deployments::core_microservices(ctx).await,
            Check::Statefulsets => storage::statefulsets(ctx).await,
            Check::PvcsBound => storage::pvcs_bound(ctx).await,
            Check::DeploymentRolloutStatus => deployments::deployment_rollout_status(ctx).await,
            Check::DeploymentResourceLimits => deployments::deployment_resource_limits(ctx).await,
            Check::DeploymentReplicas => deployments::deployment_replicas(ctx).await,
        }
    }
}

/// Which checks to run; empty lists select everything
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub markers: Vec<Marker>,
    pub names: Vec<String>,
}

impl Selection {
    pub fn selects(&self, check: Check) -> bool {
        (self.markers.is_empty() || self.markers.contains(&check.marker()))
            && (self.names.is_empty() || self.names.iter().any(|n| n == check.name()))
    }

    /// Reject filters that are unknown or match nothing
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(unknown) = self.names.iter().find(|name| Check::from_name(name).is_none()) {
            anyhow::bail!("Unknown check: {} (see `viya-check list`)", unknown);
        }
        if !Check::ALL.into_iter().any(|check| self.selects(check)) {
            anyhow::bail!("No checks match the given --marker/--check filters");
        }
        Ok(())
    }
}

/// Run the selected checks one after another
pub async fn run_suite<E: Executor>(ctx: &CheckContext<'_, E>, selection: &Selection) -> SuiteReport {
    let mut report = SuiteReport::start();
    info!(
        "Running checks against namespace {} ({})",
        ctx.kubectl.namespace(),
        if ctx.config.use_bastion {
            "via bastion"
        } else {
            "direct"
        }
    );

    for check in Check::ALL {
        if !selection.selects(check) {
            report.deselect();
            continue;
        }

        let started = Instant::now();
        let outcome = match check.run(ctx).await {
            Ok(()) => {
                info!("PASSED {}", check.name());
                Outcome::Passed
            }
            Err(CheckError::Skipped(reason)) => {
                warn!("SKIPPED {}: {}", check.name(), reason);
                Outcome::Skipped(reason)
            }
            Err(CheckError::Failed(reason)) => {
                error!("FAILED {}: {}", check.name(), reason);
                Outcome::Failed(reason)
            }
        };

        report.record(CheckReport {
            name: check.name(),
            marker: check.marker(),
            outcome,
            duration: started.elapsed(),
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubectl::fake::FakeExecutor;
    use serde_json::json;

    #[test]
    fn test_check_names_are_unique_and_resolvable() {
        for check in Check::ALL {
            assert_eq!(Check::from_name(check.name()), Some(check));
        }
        assert_eq!(Check::from_name("test_nothing"), None);
    }

    #[test]
    fn test_selection() {
        let all = Selection::default();
        assert!(Check::ALL.iter().all(|c| all.selects(*c)));

        let critical = Selection {
            markers: vec![Marker::Critical],
            names: vec![],
        };
        let picked: Vec<_> = Check::ALL.into_iter().filter(|c| critical.selects(*c)).collect();
        assert_eq!(
            picked,
            [
                Check::NamespaceExists,
                Check::CasControllerDeployment,
                Check::CoreMicroservices
            ]
        );

        let by_name = Selection {
            markers: vec![],
            names: vec!["test_pvcs_bound".to_string()],
        };
        assert!(by_name.selects(Check::PvcsBound));
        assert!(!by_name.selects(Check::Statefulsets));
    }

    #[test]
    fn test_selection_validate() {
        assert!(Selection::default().validate().is_ok());

        let unknown = Selection {
            markers: vec![],
            names: vec!["test_nothing".to_string()],
        };
        assert!(unknown
            .validate()
            .unwrap_err()
            .to_string()
            .contains("Unknown check: test_nothing"));

        let disjoint = Selection {
            markers: vec![Marker::Slow],
            names: vec!["test_pvcs_bound".to_string()],
        };
        assert!(disjoint
            .validate()
            .unwrap_err()
            .to_string()
            .contains("No checks match"));

        let overlapping = Selection {
            markers: vec![Marker::Infrastructure],
            names: vec!["test_pvcs_bound".to_string()],
        };
        assert!(overlapping.validate().is_ok());
    }

    #[tokio::test]
    async fn test_run_suite_records_outcomes() {
        let mut config = TestConfig::example();
        config.sas_components.microservices = vec!["sas-logon".to_string()];

        let executor = FakeExecutor::new()
            .stdout(&["get", "namespace"], "sas-viya   Active\n")
            .items(
                &["get", "deployments"],
                vec![json!({
                    "metadata": {"name": "sas-cas-operator"},
                    "spec": {"replicas": 1},
                    "status": {"readyReplicas": 1}
                })],
            );
        let kubectl = KubectlClient::new(executor, "sas-viya", None);
        let ctx = CheckContext {
            config: &config,
            kubectl: &kubectl,
        };

        let selection = Selection {
            markers: vec![Marker::Critical],
            names: vec![],
        };
        let report = run_suite(&ctx, &selection).await;

        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.deselected(), 5);
        assert_eq!(report.exit_code(), 1);

        let failure = report
            .results()
            .iter()
            .find(|r| r.name == "test_core_microservices")
            .unwrap();
        assert_eq!(
            failure.outcome,
            Outcome::Failed("Missing microservices: sas-logon".to_string())
        );
    }
}
