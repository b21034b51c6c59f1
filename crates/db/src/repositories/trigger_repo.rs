//! Repository for the `triggers` table.

use sqlx::PgPool;

use crate::models::trigger::{CreateTrigger, Trigger};

const COLUMNS: &str = "id, event_name, project_name, entry_point, arguments, created_at";

pub struct TriggerRepo;

impl TriggerRepo {
    pub async fn create(pool: &PgPool, input: &CreateTrigger) -> Result<Trigger, sqlx::Error> {
        let query = format!(
            "INSERT INTO triggers (event_name, project_name, entry_point, arguments) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Trigger>(&query)
            .bind(&input.event_name)
            .bind(&input.project_name)
            .bind(&input.entry_point)
            .bind(&input.arguments)
            .fetch_one(pool)
            .await
    }

    /// All triggers registered for `event_name`, in registration order.
    pub async fn list_by_event(
        pool: &PgPool,
        event_name: &str,
    ) -> Result<Vec<Trigger>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM triggers WHERE event_name = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, Trigger>(&query)
            .bind(event_name)
            .fetch_all(pool)
            .await
    }
}
