/// Namespace and deployment checks
use serde_json::Value;

use super::{ensure, CheckContext, CheckError, CheckResult};
use crate::kubectl::json::{self, array_at, i64_at, is_empty_at, str_at};
use crate::kubectl::Executor;

/// Services that should run more than one replica in production
const CRITICAL_SERVICES: [&str; 3] = ["sas-logon", "sas-identities", "sas-authorization"];

/// Containers listed in a skip message
const LIMITS_SHOWN: usize = 5;

/// `(ready, desired)` replicas of a workload; desired defaults to kubectl's 1
pub(crate) fn replica_counts(item: &Value) -> (i64, i64) {
    (
        i64_at(item, &["status", "readyReplicas"], 0),
        i64_at(item, &["spec", "replicas"], 1),
    )
}

/// Items whose lowercased name contains `fragment`
pub(crate) fn named_like<'a>(items: &'a [Value], fragment: &str) -> Vec<&'a Value> {
    items
        .iter()
        .filter(|item| json::name(item).to_lowercase().contains(fragment))
        .collect()
}

pub async fn namespace_exists<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let namespace = ctx.kubectl.namespace();
    let exists = ctx.kubectl.namespace_exists(namespace).await;
    ensure(exists, || format!("Namespace {} does not exist", namespace))
}

/// Every CAS deployment must have all desired replicas ready
pub async fn cas_controller_deployment<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let deployments = ctx.kubectl.get_deployments().await;
    let cas = named_like(&deployments, "cas");

    ensure(!cas.is_empty(), || "No CAS deployments found".to_string())?;

    let not_ready: Vec<String> = cas
        .iter()
        .filter_map(|deployment| {
            let (ready, desired) = replica_counts(deployment);
            (ready != desired).then(|| {
                format!(
                    "Deployment {}: {}/{} replicas ready",
                    json::name(deployment),
                    ready,
                    desired
                )
            })
        })
        .collect();

    ensure(not_ready.is_empty(), || not_ready.join("\n"))
}

/// Each configured microservice fragment must match some deployment name
pub async fn core_microservices<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let deployments = ctx.kubectl.get_deployments().await;
    let names: Vec<&str> = deployments.iter().map(json::name).collect();

    let missing: Vec<&str> = ctx
        .config
        .sas_components
        .microservices
        .iter()
        .map(String::as_str)
        .filter(|service| !names.iter().any(|name| name.contains(service)))
        .collect();

    ensure(missing.is_empty(), || {
        format!("Missing microservices: {}", missing.join(", "))
    })
}

/// Explicitly unhealthy `Progressing`/`Available` conditions fail; absent ones do not
pub async fn deployment_rollout_status<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let deployments = ctx.kubectl.get_deployments().await;
    let mut failed = Vec::new();

    for deployment in &deployments {
        let name = json::name(deployment);

        if let Some(progressing) = json::condition(deployment, "Progressing") {
            if str_at(progressing, &["status"], "") != "True" {
                failed.push(format!(
                    "{}: {}",
                    name,
                    str_at(progressing, &["message"], "Unknown error")
                ));
            }
        }

        if let Some(available) = json::condition(deployment, "Available") {
            if str_at(available, &["status"], "") != "True" {
                failed.push(format!("{}: Not available", name));
            }
        }
    }

    ensure(failed.is_empty(), || {
        format!("Failed rollouts:\n{}", failed.join("\n"))
    })
}

/// Advisory: containers without resource limits
pub async fn deployment_resource_limits<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let deployments = ctx.kubectl.get_deployments().await;
    let mut missing = Vec::new();

    for deployment in &deployments {
        let containers = array_at(deployment, &["spec", "template", "spec", "containers"]);
        for container in containers {
            if is_empty_at(container, &["resources", "limits"]) {
                missing.push(format!(
                    "{}/{}",
                    json::name(deployment),
                    str_at(container, &["name"], "")
                ));
            }
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    let shown: Vec<&str> = missing
        .iter()
        .take(LIMITS_SHOWN)
        .map(String::as_str)
        .collect();
    Err(CheckError::Skipped(format!(
        "Containers without resource limits: {}",
        shown.join(", ")
    )))
}

/// Advisory: critical services running a single replica
pub async fn deployment_replicas<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let deployments = ctx.kubectl.get_deployments().await;
    let mut single = Vec::new();

    for deployment in &deployments {
        let name = json::name(deployment);
        let replicas = i64_at(deployment, &["spec", "replicas"], 1);

        for critical in CRITICAL_SERVICES {
            if name.to_lowercase().contains(critical) && replicas < 2 {
                single.push(format!("{}: {} replica(s)", name, replicas));
            }
        }
    }

    if single.is_empty() {
        Ok(())
    } else {
        Err(CheckError::Skipped(format!(
            "Critical services with single replica: {}",
            single.join(", ")
        )))
    }
}
