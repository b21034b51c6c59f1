//! Response bodies for the process API.
//!
//! Field names are camelCase on the wire. Log chunk data is base64 encoded
//! so binary output survives JSON.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use conductor_core::log_range::LogRange;
use conductor_core::process::log_file_name;
use conductor_core::types::Timestamp;
use conductor_db::models::process::ProcessEntry;
use conductor_db::models::process_log::{LogChunk, LogSegment, ProcessLog};
use conductor_db::models::status::{ProcessStatus, SegmentStatus};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartProcessResponse {
    pub instance_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatusResponse {
    pub instance_id: Uuid,
    pub created_at: Timestamp,
    pub last_update: Timestamp,
    pub status: ProcessStatus,
    pub log_file_name: String,
}

impl From<&ProcessEntry> for ProcessStatusResponse {
    fn from(entry: &ProcessEntry) -> Self {
        Self {
            instance_id: entry.instance_id,
            created_at: entry.created_at,
            last_update: entry.last_update_at,
            status: entry.status(),
            log_file_name: log_file_name(entry.instance_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub start: i32,
    /// Base64-encoded bytes.
    pub data: String,
}

impl From<&LogChunk> for ChunkResponse {
    fn from(chunk: &LogChunk) -> Self {
        Self {
            start: chunk.start,
            data: BASE64.encode(&chunk.data),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub size: i32,
    pub chunks: Vec<ChunkResponse>,
}

impl From<&ProcessLog> for LogResponse {
    fn from(log: &ProcessLog) -> Self {
        Self {
            size: log.size,
            chunks: log.chunks.iter().map(ChunkResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RangeResponse {
    pub start: i32,
    pub end: i32,
}

impl From<LogRange> for RangeResponse {
    fn from(range: LogRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentResponse {
    pub id: i64,
    pub correlation_id: Uuid,
    pub name: String,
    pub created_at: Timestamp,
    pub status: SegmentStatus,
}

impl From<&LogSegment> for SegmentResponse {
    fn from(segment: &LogSegment) -> Self {
        Self {
            id: segment.segment_id,
            correlation_id: segment.correlation_id,
            name: segment.segment_name.clone(),
            created_at: segment.segment_ts,
            status: segment.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SegmentIdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub event_id: serde_json::Value,
    pub processes_started: usize,
}
