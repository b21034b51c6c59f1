//! Request routing for processes: start, status, wait, kill and
//! attachment download.

use std::time::Duration;

use bytes::Bytes;
use conductor_agent::ProcessExecutor;
use conductor_core::attachment::validate_attachment_name;
use conductor_core::error::CoreError;
use conductor_db::models::process::ProcessEntry;
use conductor_db::repositories::{ProcessRepo, ProjectRepo};
use conductor_pipeline::{assemble, PayloadSource};
use sqlx::PgPool;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::engine::sinks::{DbLogSink, DbStatusCallback};
use crate::error::{AppError, AppResult};

/// Outcome of a wait that did not produce a terminal status.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The timeout elapsed; carries the last status observed.
    #[error("Timed out waiting for process {}", .0.instance_id)]
    Timeout(ProcessEntry),

    #[error(transparent)]
    Failed(#[from] AppError),
}

pub struct ProcessManager {
    pool: PgPool,
    executor: ProcessExecutor,
    wait_poll_interval: Duration,
    tasks: TaskTracker,
}

impl ProcessManager {
    pub fn new(pool: PgPool, executor: ProcessExecutor, wait_poll_interval: Duration) -> Self {
        Self {
            pool,
            executor,
            wait_poll_interval,
            tasks: TaskTracker::new(),
        }
    }

    pub fn executor(&self) -> &ProcessExecutor {
        &self.executor
    }

    /// Assemble the payload, record the process and dispatch it in the
    /// background. Returns as soon as the process row exists.
    pub async fn start(&self, source: PayloadSource) -> AppResult<Uuid> {
        let instance_id = Uuid::new_v4();
        let payload = assemble(instance_id, source)?;

        let project_name = payload.project_name().map(str::to_string);
        if let Some(project) = &project_name {
            if !ProjectRepo::exists(&self.pool, project).await? {
                return Err(CoreError::Validation(format!("Project not found: {project}")).into());
            }
        }
        let entry_point = payload.entry_point().map(str::to_string);

        let archive = tokio::task::spawn_blocking(move || payload.build_archive())
            .await
            .map_err(|e| AppError::InternalError(format!("Archive task failed: {e}")))??;

        let entry = ProcessRepo::create(&self.pool, instance_id, project_name.as_deref()).await?;
        let key = entry.key();
        tracing::info!(
            instance_id = %key,
            project = project_name.as_deref().unwrap_or("-"),
            archive_bytes = archive.len(),
            "Process accepted",
        );

        let executor = self.executor.clone();
        let log_sink = DbLogSink::new(self.pool.clone());
        let status_callback = DbStatusCallback::new(self.pool.clone());
        self.tasks.spawn(async move {
            // Failures are already logged and recorded by the executor.
            let _ = executor
                .run(key, archive, entry_point, &log_sink, &status_callback)
                .await;
        });

        Ok(instance_id)
    }

    pub async fn get(&self, instance_id: Uuid) -> AppResult<ProcessEntry> {
        ProcessRepo::find(&self.pool, instance_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Process", instance_id).into())
    }

    /// Poll the process row until it reaches a terminal status.
    ///
    /// `timeout_ms <= 0` waits without limit. When `cancel` fires the last
    /// observed entry is returned as is.
    pub async fn wait_for_completion(
        &self,
        instance_id: Uuid,
        timeout_ms: i64,
        cancel: &CancellationToken,
    ) -> Result<ProcessEntry, WaitError> {
        let deadline = u64::try_from(timeout_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        loop {
            let entry = self.get(instance_id).await?;
            if entry.status().is_terminal() {
                return Ok(entry);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(WaitError::Timeout(entry));
                    }
                    remaining.min(self.wait_poll_interval)
                }
                None => self.wait_poll_interval,
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(entry),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Forward a cancel request to the agent. The running dispatch records
    /// the resulting status.
    pub async fn kill(&self, instance_id: Uuid) -> AppResult<()> {
        let entry = self.get(instance_id).await?;
        self.executor.cancel(&entry.key()).await?;
        Ok(())
    }

    /// One entry of the process's attachment bundle.
    pub async fn download_attachment(&self, instance_id: Uuid, name: &str) -> AppResult<Bytes> {
        validate_attachment_name(name)?;
        self.executor
            .attachments()
            .read_entry(instance_id, name)
            .await?
            .ok_or_else(|| CoreError::not_found("Attachment", name).into())
    }

    /// Stop accepting new runs and wait up to `timeout` for in-flight ones.
    /// Returns `false` if some runs were still going when it expired.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let in_flight = self.tasks.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for running processes to finish");
        }
        tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok()
    }
}
