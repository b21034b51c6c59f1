//! Shared query parameter and request body types for API handlers.

use conductor_db::models::status::SegmentStatus;
use serde::Deserialize;
use uuid::Uuid;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Byte range of a log read (`?start=&end=`).
///
/// Both absent reads everything; only `end` reads the last `end` bytes.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// `?timeout=` in milliseconds; absent or `<= 0` waits until completion.
#[derive(Debug, Deserialize)]
pub struct WaitParams {
    pub timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentLookupParams {
    pub correlation_id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSegmentRequest {
    pub correlation_id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSegmentStatusRequest {
    pub status: SegmentStatus,
}
