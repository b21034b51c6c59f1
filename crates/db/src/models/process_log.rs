//! Log store read models.

use conductor_core::types::Timestamp;
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{SegmentStatus, StatusId};

/// One stored slice of a log stream, positioned at `start`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LogChunk {
    pub start: i32,
    pub data: Vec<u8>,
}

/// Result of a range read: the stream's current size plus the chunks that
/// intersect the requested range, ordered by offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessLog {
    pub size: i32,
    pub chunks: Vec<LogChunk>,
}

impl ProcessLog {
    /// Concatenate all chunk data in offset order.
    pub fn concat(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.data.iter().copied()).collect()
    }
}

/// A row from the `process_log_segments` table.
#[derive(Debug, Clone, FromRow)]
pub struct LogSegment {
    pub segment_id: i64,
    pub correlation_id: Uuid,
    pub segment_name: String,
    pub segment_ts: Timestamp,
    pub status_id: StatusId,
}

impl LogSegment {
    pub fn status(&self) -> SegmentStatus {
        SegmentStatus::from_id(self.status_id).unwrap_or(SegmentStatus::Failed)
    }
}
