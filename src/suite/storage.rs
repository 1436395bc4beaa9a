/// Database statefulset and volume claim checks
use super::deployments::{named_like, replica_counts};
use super::{ensure, CheckContext, CheckResult};
use crate::kubectl::json::{self, str_at};
use crate::kubectl::Executor;

/// PostgreSQL statefulsets must exist and be fully ready when enabled
pub async fn statefulsets<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let statefulsets = ctx.kubectl.get_statefulsets().await;

    if !ctx.config.sas_components.databases.postgres.enabled {
        return Ok(());
    }

    let postgres = named_like(&statefulsets, "postgres");
    ensure(!postgres.is_empty(), || {
        "PostgreSQL StatefulSet not found".to_string()
    })?;

    for sts in postgres {
        let (ready, desired) = replica_counts(sts);
        ensure(ready == desired, || {
            format!("PostgreSQL not fully ready: {}/{}", ready, desired)
        })?;
    }

    Ok(())
}

/// Every claim in the namespace must be bound
pub async fn pvcs_bound<E: Executor>(ctx: &CheckContext<'_, E>) -> CheckResult {
    let pvcs = ctx.kubectl.get_pvcs().await;

    let unbound: Vec<String> = pvcs
        .iter()
        .filter_map(|pvc| {
            let phase = str_at(pvc, &["status", "phase"], "Unknown");
            (phase != "Bound").then(|| format!("{} ({})", json::name(pvc), phase))
        })
        .collect();

    ensure(unbound.is_empty(), || {
        format!("Unbound PVCs: {}", unbound.join(", "))
    })
}
