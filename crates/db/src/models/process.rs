//! Process lifecycle rows (the `processes` table).

use conductor_core::process::ProcessKey;
use conductor_core::types::Timestamp;
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{ProcessStatus, StatusId};

/// A row from the `processes` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProcessEntry {
    pub instance_id: Uuid,
    pub created_at: Timestamp,
    pub project_name: Option<String>,
    pub status_id: StatusId,
    pub last_update_at: Timestamp,
}

impl ProcessEntry {
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.instance_id, self.created_at)
    }

    /// Decoded status. Unknown IDs cannot occur thanks to the foreign key,
    /// but are reported as `Failed` rather than panicking.
    pub fn status(&self) -> ProcessStatus {
        ProcessStatus::from_id(self.status_id).unwrap_or(ProcessStatus::Failed)
    }
}
