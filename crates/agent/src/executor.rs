//! Dispatch-and-stream executor.
//!
//! [`ProcessExecutor::run`] performs, for one process:
//!
//! 1. emit `RUNNING`;
//! 2. connect to the agent and upload the payload (a failure here is a
//!    dispatch error: a diagnostic line goes to the process log, `FAILED`
//!    is emitted, nothing is retried and the error is returned);
//! 3. copy the agent's log stream into the [`LogSink`], firing the throttled
//!    progress callback after every read;
//! 4. fetch the attachment bundle (best effort);
//! 5. map the agent's final job status onto the process status.
//!
//! Any other error is an execution error: it also emits `FAILED` and is
//! returned to the caller. The agent session is owned by the run and
//! dropped on every exit path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use conductor_core::log_range::LogRange;
use conductor_core::process::ProcessKey;
use conductor_core::throttle::{Throttle, PROCESS_UPDATE_PERIOD};
use conductor_db::models::status::ProcessStatus;
use futures::StreamExt;

use crate::attachments::AttachmentStore;
use crate::error::AgentError;
use crate::transport::{AgentConnector, AgentJobStatus, AgentSession, StartJob};

/// Job type tag sent to the agent when none is configured.
pub const DEFAULT_JOB_TYPE: &str = "JAR";

/// Boxed error returned by [`LogSink`] implementations.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Destination for a process's log bytes.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, key: &ProcessKey, data: &[u8]) -> Result<LogRange, SinkError>;
}

/// Receives lifecycle notifications. Implementations must tolerate repeated
/// calls with the same status.
#[async_trait]
pub trait StatusCallback: Send + Sync {
    async fn on_status_change(&self, key: &ProcessKey, status: ProcessStatus);

    /// Progress tick while the log is flowing (throttled by the executor).
    async fn on_update(&self, key: &ProcessKey);
}

/// Terminal process status for a job status reported by the agent, or
/// `None` while the job is still running. Unrecognised statuses count as
/// finished.
pub fn final_process_status(status: AgentJobStatus) -> Option<ProcessStatus> {
    match status {
        AgentJobStatus::Completed | AgentJobStatus::Other => Some(ProcessStatus::Finished),
        AgentJobStatus::Failed | AgentJobStatus::Cancelled => Some(ProcessStatus::Failed),
        AgentJobStatus::Running => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Connecting or uploading failed; the process never started.
    #[error("Error while starting a process: {0}")]
    Dispatch(#[source] AgentError),

    #[error("Agent request failed: {0}")]
    Agent(#[from] AgentError),

    #[error("Agent log stream failed: {0}")]
    Stream(#[source] AgentError),
}

/// Runs processes on the agent reached through `connector`.
#[derive(Clone)]
pub struct ProcessExecutor {
    connector: Arc<dyn AgentConnector>,
    attachments: AttachmentStore,
    job_type: String,
    update_period: Duration,
}

impl ProcessExecutor {
    pub fn new(connector: Arc<dyn AgentConnector>, attachments: AttachmentStore) -> Self {
        Self {
            connector,
            attachments,
            job_type: DEFAULT_JOB_TYPE.to_string(),
            update_period: PROCESS_UPDATE_PERIOD,
        }
    }

    pub fn with_job_type(mut self, job_type: impl Into<String>) -> Self {
        self.job_type = job_type.into();
        self
    }

    /// Minimum period between progress callbacks.
    pub fn with_update_period(mut self, period: Duration) -> Self {
        self.update_period = period;
        self
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    /// Dispatch a process and follow it to completion.
    pub async fn run(
        &self,
        key: ProcessKey,
        archive: Bytes,
        entry_point: Option<String>,
        log_sink: &dyn LogSink,
        status_callback: &dyn StatusCallback,
    ) -> Result<(), ExecutorError> {
        status_callback
            .on_status_change(&key, ProcessStatus::Running)
            .await;

        let result = self
            .execute(&key, archive, entry_point, log_sink, status_callback)
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(ExecutorError::Dispatch(cause)) => {
                tracing::warn!(instance_id = %key, error = %cause, "Process dispatch failed");
                let line = format!("Error while starting a process: {cause}\n");
                if let Err(e) = log_sink.append(&key, line.as_bytes()).await {
                    tracing::warn!(instance_id = %key, error = %e, "Failed to write dispatch error to process log");
                }
                status_callback
                    .on_status_change(&key, ProcessStatus::Failed)
                    .await;
                Err(ExecutorError::Dispatch(cause))
            }
            Err(err) => {
                tracing::error!(instance_id = %key, error = %err, "Process execution failed");
                status_callback
                    .on_status_change(&key, ProcessStatus::Failed)
                    .await;
                Err(err)
            }
        }
    }

    /// Ask the agent to cancel a process. Local state is left to the
    /// running [`run`](Self::run), which observes the agent's final status.
    pub async fn cancel(&self, key: &ProcessKey) -> Result<(), AgentError> {
        let session = self.connector.connect().await?;
        session.cancel(key.instance_id).await?;
        tracing::info!(instance_id = %key, "Cancel request sent to agent");
        Ok(())
    }

    /// Current status of a job as the agent sees it.
    pub async fn job_status(&self, instance_id: uuid::Uuid) -> Result<AgentJobStatus, AgentError> {
        let session = self.connector.connect().await?;
        session.status(instance_id).await
    }

    async fn execute(
        &self,
        key: &ProcessKey,
        archive: Bytes,
        entry_point: Option<String>,
        log_sink: &dyn LogSink,
        status_callback: &dyn StatusCallback,
    ) -> Result<(), ExecutorError> {
        tracing::info!(instance_id = %key, "Starting {}...", key.instance_id);

        let session = self.connector.connect().await.map_err(ExecutorError::Dispatch)?;
        session
            .start(StartJob {
                instance_id: key.instance_id,
                job_type: self.job_type.clone(),
                entry_point,
                archive,
            })
            .await
            .map_err(ExecutorError::Dispatch)?;
        tracing::info!(instance_id = %key, "Payload sent");

        self.copy_log(session.as_ref(), key, log_sink, status_callback)
            .await?;
        tracing::info!(instance_id = %key, "...done");

        self.save_attachments(session.as_ref(), key).await;

        let agent_status = session.status(key.instance_id).await?;
        match final_process_status(agent_status) {
            Some(status) => status_callback.on_status_change(key, status).await,
            None => tracing::warn!(
                instance_id = %key,
                "Log stream ended but the agent still reports the job as running",
            ),
        }

        Ok(())
    }

    /// Copy the agent log into the sink until the stream ends. A sink
    /// failure stops the copy but is not a process failure.
    async fn copy_log(
        &self,
        session: &dyn AgentSession,
        key: &ProcessKey,
        log_sink: &dyn LogSink,
        status_callback: &dyn StatusCallback,
    ) -> Result<(), ExecutorError> {
        let mut stream = session
            .stream_log(key.instance_id)
            .await
            .map_err(ExecutorError::Stream)?;
        let mut throttle = Throttle::new(self.update_period);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ExecutorError::Stream)?;
            if let Err(e) = log_sink.append(key, &chunk).await {
                tracing::warn!(instance_id = %key, error = %e, "Log append failed, abandoning log copy");
                break;
            }
            if throttle.should_fire() {
                status_callback.on_update(key).await;
            }
        }
        Ok(())
    }

    async fn save_attachments(&self, session: &dyn AgentSession, key: &ProcessKey) {
        let bundle = match session.download_attachments(key.instance_id).await {
            Ok(Some(bundle)) => bundle,
            Ok(None) => return,
            Err(e) if e.is_not_found() => return,
            Err(e) => {
                tracing::warn!(instance_id = %key, error = %e, "Failed to download attachments");
                return;
            }
        };
        if let Err(e) = self.attachments.save(key.instance_id, bundle).await {
            tracing::warn!(instance_id = %key, error = %e, "Failed to store attachments");
        }
    }
}
