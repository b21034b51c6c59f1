//! Repository for the `processes` table (the lifecycle tracker).
//!
//! Status transitions are monotonic: once a row is `FINISHED` or `FAILED`
//! every further update is a no-op. Callers learn whether an update took
//! effect from the returned `bool`.

use conductor_core::process::ProcessKey;
use conductor_core::types::Timestamp;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::process::ProcessEntry;
use crate::models::status::{ProcessStatus, TERMINAL_PROCESS_STATUSES};

/// Column list for `processes` queries.
const COLUMNS: &str = "instance_id, created_at, project_name, status_id, last_update_at";

/// Upper bound on rows returned by a single stale-process scan.
const MAX_STALE_BATCH: i64 = 500;

pub struct ProcessRepo;

impl ProcessRepo {
    /// Insert a new `RUNNING` process row. `created_at` is assigned by the
    /// database and returned as part of the entry.
    pub async fn create(
        pool: &PgPool,
        instance_id: Uuid,
        project_name: Option<&str>,
    ) -> Result<ProcessEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO processes (instance_id, project_name, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessEntry>(&query)
            .bind(instance_id)
            .bind(project_name)
            .bind(ProcessStatus::Running.id())
            .fetch_one(pool)
            .await
    }

    /// Find a process by its instance ID.
    pub async fn find(
        pool: &PgPool,
        instance_id: Uuid,
    ) -> Result<Option<ProcessEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM processes WHERE instance_id = $1");
        sqlx::query_as::<_, ProcessEntry>(&query)
            .bind(instance_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the status of a non-terminal process and bump `last_update_at`.
    ///
    /// Returns `false` when the row is missing or already terminal.
    pub async fn update_status(
        pool: &PgPool,
        key: &ProcessKey,
        status: ProcessStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE processes SET status_id = $3, last_update_at = NOW() \
             WHERE instance_id = $1 AND created_at = $2 \
               AND status_id NOT IN ($4, $5)",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(status.id())
        .bind(TERMINAL_PROCESS_STATUSES[0])
        .bind(TERMINAL_PROCESS_STATUSES[1])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a progress tick for a non-terminal process.
    pub async fn touch(pool: &PgPool, key: &ProcessKey) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE processes SET last_update_at = NOW() \
             WHERE instance_id = $1 AND created_at = $2 \
               AND status_id NOT IN ($3, $4)",
        )
        .bind(key.instance_id)
        .bind(key.created_at)
        .bind(TERMINAL_PROCESS_STATUSES[0])
        .bind(TERMINAL_PROCESS_STATUSES[1])
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `RUNNING` processes whose last update is older than `older_than`,
    /// oldest first.
    pub async fn list_stale_running(
        pool: &PgPool,
        older_than: Timestamp,
    ) -> Result<Vec<ProcessEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM processes \
             WHERE status_id = $1 AND last_update_at < $2 \
             ORDER BY last_update_at ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, ProcessEntry>(&query)
            .bind(ProcessStatus::Running.id())
            .bind(older_than)
            .bind(MAX_STALE_BATCH)
            .fetch_all(pool)
            .await
    }
}
