//! Project lookup rows.

use conductor_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}
