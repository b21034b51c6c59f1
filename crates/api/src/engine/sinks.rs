//! Database-backed executor callbacks.

use async_trait::async_trait;
use conductor_agent::{LogSink, SinkError, StatusCallback};
use conductor_core::log_range::LogRange;
use conductor_core::process::ProcessKey;
use conductor_db::models::status::ProcessStatus;
use conductor_db::repositories::{ProcessLogRepo, ProcessRepo};
use sqlx::PgPool;

/// Appends agent output to the process log.
pub struct DbLogSink {
    pool: PgPool,
}

impl DbLogSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogSink for DbLogSink {
    async fn append(&self, key: &ProcessKey, data: &[u8]) -> Result<LogRange, SinkError> {
        Ok(ProcessLogRepo::append(&self.pool, key, data).await?)
    }
}

/// Writes status transitions and progress ticks to the `processes` row.
///
/// Failures are logged and swallowed; a lost update never aborts a run.
pub struct DbStatusCallback {
    pool: PgPool,
}

impl DbStatusCallback {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusCallback for DbStatusCallback {
    async fn on_status_change(&self, key: &ProcessKey, status: ProcessStatus) {
        match ProcessRepo::update_status(&self.pool, key, status).await {
            Ok(true) => {
                tracing::debug!(instance_id = %key, status = %status, "Process status updated");
            }
            Ok(false) => {
                tracing::debug!(
                    instance_id = %key,
                    status = %status,
                    "Status update ignored, process missing or already terminal",
                );
            }
            Err(e) => {
                tracing::error!(instance_id = %key, status = %status, error = %e, "Failed to update process status");
            }
        }
    }

    async fn on_update(&self, key: &ProcessKey) {
        if let Err(e) = ProcessRepo::touch(&self.pool, key).await {
            tracing::warn!(instance_id = %key, error = %e, "Failed to record process progress");
        }
    }
}
