//! Process identity.
//!
//! Every log chunk, segment and status row is keyed by a [`ProcessKey`]:
//! the instance UUID plus the timestamp at which the process row was
//! created. The pair is immutable once assigned.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Composite identity of a dispatched process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessKey {
    pub instance_id: Uuid,
    pub created_at: Timestamp,
}

impl ProcessKey {
    pub fn new(instance_id: Uuid, created_at: Timestamp) -> Self {
        Self {
            instance_id,
            created_at,
        }
    }

    /// Name under which the process log is exposed to clients.
    pub fn log_file_name(&self) -> String {
        log_file_name(self.instance_id)
    }
}

impl std::fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.instance_id)
    }
}

/// Client-facing log resource name for a process instance.
pub fn log_file_name(instance_id: Uuid) -> String {
    format!("{instance_id}.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_is_the_instance_id() {
        let id = Uuid::new_v4();
        let key = ProcessKey::new(id, chrono::Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        assert_eq!(key.to_string(), id.to_string());
    }

    #[test]
    fn keys_with_same_id_but_different_timestamps_differ() {
        let id = Uuid::new_v4();
        let a = ProcessKey::new(id, chrono::Utc.timestamp_opt(1, 0).unwrap());
        let b = ProcessKey::new(id, chrono::Utc.timestamp_opt(2, 0).unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn log_file_name_uses_log_extension() {
        let id = Uuid::nil();
        assert_eq!(
            log_file_name(id),
            "00000000-0000-0000-0000-000000000000.log"
        );
    }
}
