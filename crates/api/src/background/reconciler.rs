//! Sweep for processes left `RUNNING` after their log stream ended.
//!
//! The executor leaves a process `RUNNING` when the agent still reports the
//! job as running once the log stream has closed. This task periodically
//! asks the agent about processes that have not been updated for a while
//! and records terminal outcomes.

use std::time::Duration;

use chrono::Utc;
use conductor_agent::{final_process_status, ProcessExecutor};
use conductor_db::models::status::ProcessStatus;
use conductor_db::repositories::ProcessRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Run the reconciliation loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    executor: ProcessExecutor,
    interval: Duration,
    stale_after: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        stale_after_secs = stale_after.as_secs(),
        "Process reconciler started",
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Process reconciler stopping");
                break;
            }
            _ = ticker.tick() => {
                match reconcile_once(&pool, &executor, stale_after).await {
                    Ok(0) => tracing::debug!("Reconcile: nothing to update"),
                    Ok(updated) => tracing::info!(updated, "Reconcile: processes finalized"),
                    Err(e) => tracing::error!(error = %e, "Reconcile cycle failed"),
                }
            }
        }
    }
}

/// One sweep. Returns the number of processes moved to a terminal status.
///
/// A job the agent no longer knows about is marked `FAILED`; a job still
/// running only has its `last_update_at` refreshed.
pub async fn reconcile_once(
    pool: &PgPool,
    executor: &ProcessExecutor,
    stale_after: Duration,
) -> Result<usize, sqlx::Error> {
    let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(stale_after)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    let stale = ProcessRepo::list_stale_running(pool, cutoff).await?;

    let mut updated = 0;
    for entry in stale {
        let key = entry.key();
        let status = match executor.job_status(key.instance_id).await {
            Ok(agent_status) => final_process_status(agent_status),
            Err(e) if e.is_not_found() => Some(ProcessStatus::Failed),
            Err(e) => {
                tracing::warn!(instance_id = %key, error = %e, "Reconcile: agent status query failed");
                continue;
            }
        };

        match status {
            Some(status) => {
                if ProcessRepo::update_status(pool, &key, status).await? {
                    tracing::info!(instance_id = %key, status = %status, "Reconcile: process finalized");
                    updated += 1;
                }
            }
            None => {
                ProcessRepo::touch(pool, &key).await?;
            }
        }
    }

    Ok(updated)
}
