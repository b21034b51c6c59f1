//! Agent transport seam.
//!
//! The executor only sees these traits, so tests can substitute an
//! in-memory agent for the HTTP one.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AgentError;

/// Job status as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentJobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    /// Any status string this version does not know.
    #[serde(other)]
    Other,
}

/// Raw log bytes as the agent produces them.
pub type LogStream = BoxStream<'static, Result<Bytes, AgentError>>;

/// Upload request for a new job.
#[derive(Debug, Clone)]
pub struct StartJob {
    pub instance_id: Uuid,
    /// Job type tag, e.g. `JAR`.
    pub job_type: String,
    pub entry_point: Option<String>,
    pub archive: Bytes,
}

/// Opens sessions to the configured agent endpoint.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn AgentSession>, AgentError>;
}

/// One conversation with an agent. Dropping the session releases it.
#[async_trait]
pub trait AgentSession: Send + Sync {
    async fn start(&self, job: StartJob) -> Result<(), AgentError>;

    /// Stream the job's log until the job ends.
    async fn stream_log(&self, instance_id: Uuid) -> Result<LogStream, AgentError>;

    /// The job's attachment bundle, or `None` if it has none.
    async fn download_attachments(&self, instance_id: Uuid) -> Result<Option<Bytes>, AgentError>;

    async fn status(&self, instance_id: Uuid) -> Result<AgentJobStatus, AgentError>;

    /// Ask the agent to cancel the job and wait until it has stopped.
    async fn cancel(&self, instance_id: Uuid) -> Result<(), AgentError>;
}
