//! REST client for the execution agent.
//!
//! | operation   | request                                              |
//! |-------------|------------------------------------------------------|
//! | start       | `POST /api/v1/job?instanceId=&type=&entryPoint=` (zip body) |
//! | log         | `GET /api/v1/job/{id}/log` (chunked until the job ends) |
//! | attachments | `GET /api/v1/job/{id}/attachments` (zip or 404)      |
//! | status      | `GET /api/v1/job/{id}/status`                        |
//! | cancel      | `DELETE /api/v1/job/{id}?waitForCompletion=true`     |

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AgentError;
use crate::transport::{AgentConnector, AgentJobStatus, AgentSession, LogStream, StartJob};

/// Timeout for establishing a TCP connection to the agent. Requests have no
/// overall timeout because the log stream lasts as long as the job.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of `GET /api/v1/job/{id}/status`.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: AgentJobStatus,
}

/// Connects to a single agent over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAgentConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentConnector {
    /// * `base_url` - e.g. `http://agent:8002`, without a trailing slash.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] and its connection pool.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AgentConnector for HttpAgentConnector {
    async fn connect(&self) -> Result<Box<dyn AgentSession>, AgentError> {
        Ok(Box::new(HttpAgentSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }))
    }
}

/// Pooled HTTP connections make a session little more than a base URL.
pub struct HttpAgentSession {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentSession {
    fn job_url(&self, instance_id: Uuid) -> String {
        format!("{}/api/v1/job/{}", self.base_url, instance_id)
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an
    /// [`AgentError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AgentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), AgentError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AgentSession for HttpAgentSession {
    async fn start(&self, job: StartJob) -> Result<(), AgentError> {
        let mut query = vec![
            ("instanceId", job.instance_id.to_string()),
            ("type", job.job_type),
        ];
        if let Some(entry_point) = job.entry_point {
            query.push(("entryPoint", entry_point));
        }

        let response = self
            .client
            .post(format!("{}/api/v1/job", self.base_url))
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, "application/zip")
            .body(job.archive)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn stream_log(&self, instance_id: Uuid) -> Result<LogStream, AgentError> {
        let response = self
            .client
            .get(format!("{}/log", self.job_url(instance_id)))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        let stream = futures::stream::try_unfold(response, |mut response| async move {
            let chunk = response.chunk().await?;
            Ok::<_, AgentError>(chunk.map(|bytes| (bytes, response)))
        });
        Ok(stream.boxed())
    }

    async fn download_attachments(&self, instance_id: Uuid) -> Result<Option<Bytes>, AgentError> {
        let response = self
            .client
            .get(format!("{}/attachments", self.job_url(instance_id)))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        Ok(Some(response.bytes().await?))
    }

    async fn status(&self, instance_id: Uuid) -> Result<AgentJobStatus, AgentError> {
        let response = self
            .client
            .get(format!("{}/status", self.job_url(instance_id)))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await?;
        let parsed: StatusResponse = serde_json::from_slice(&body)
            .map_err(|e| AgentError::Protocol(format!("invalid status body: {e}")))?;
        Ok(parsed.status)
    }

    async fn cancel(&self, instance_id: Uuid) -> Result<(), AgentError> {
        let response = self
            .client
            .delete(self.job_url(instance_id))
            .query(&[("waitForCompletion", "true")])
            .send()
            .await?;

        Self::check_status(response).await
    }
}
