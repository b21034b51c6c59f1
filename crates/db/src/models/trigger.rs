//! Event trigger rows.

use conductor_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `triggers` table: "when `event_name` arrives, start
/// `project_name:entry_point` with `arguments`".
#[derive(Debug, Clone, FromRow)]
pub struct Trigger {
    pub id: DbId,
    pub event_name: String,
    pub project_name: String,
    pub entry_point: String,
    pub arguments: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for registering a trigger.
#[derive(Debug, Clone)]
pub struct CreateTrigger {
    pub event_name: String,
    pub project_name: String,
    pub entry_point: String,
    pub arguments: serde_json::Value,
}
