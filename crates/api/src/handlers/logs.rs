//! Handlers for process logs and log segments.
//!
//! Writes are raw request bodies; reads return base64 chunks positioned by
//! their byte offset in the stream.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use conductor_core::error::CoreError;
use conductor_core::log_range::validate_read_bounds;
use conductor_core::process::ProcessKey;
use conductor_db::repositories::ProcessLogRepo;
use uuid::Uuid;

use crate::error::AppResult;
use crate::query::{
    CreateSegmentRequest, PaginationParams, RangeParams, SegmentLookupParams,
    UpdateSegmentStatusRequest,
};
use crate::response::{LogResponse, RangeResponse, SegmentIdResponse, SegmentResponse};
use crate::state::AppState;

async fn process_key(state: &AppState, id: Uuid) -> AppResult<ProcessKey> {
    Ok(state.manager.get(id).await?.key())
}

// ---------------------------------------------------------------------------
// Process log
// ---------------------------------------------------------------------------

/// GET /api/v1/process/{id}/log?start=&end=
///
/// Without bounds the whole log; with `start` the chunks intersecting
/// `[start, end)`; with only `end` the last `end` bytes.
pub async fn read_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<RangeParams>,
) -> AppResult<Json<LogResponse>> {
    validate_read_bounds(range.start, range.end)?;
    let key = process_key(&state, id).await?;
    let log = ProcessLogRepo::read(&state.pool, &key, range.start, range.end).await?;
    Ok(Json(LogResponse::from(&log)))
}

/// POST /api/v1/process/{id}/log
pub async fn append_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<RangeResponse>> {
    let key = process_key(&state, id).await?;
    let range = ProcessLogRepo::append(&state.pool, &key, &body).await?;
    Ok(Json(range.into()))
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// GET /api/v1/process/{id}/log/segments?limit=&offset=
pub async fn list_segments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<Vec<SegmentResponse>>> {
    let key = process_key(&state, id).await?;
    let segments = ProcessLogRepo::list_segments(&state.pool, &key, page.limit, page.offset).await?;
    Ok(Json(segments.iter().map(SegmentResponse::from).collect()))
}

/// POST /api/v1/process/{id}/log/segments
///
/// Get or create the segment identified by `(correlationId, name)`.
pub async fn create_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateSegmentRequest>,
) -> AppResult<Json<SegmentIdResponse>> {
    let key = process_key(&state, id).await?;
    let segment_id =
        ProcessLogRepo::get_or_create_segment(&state.pool, &key, input.correlation_id, &input.name)
            .await?;
    Ok(Json(SegmentIdResponse { id: segment_id }))
}

/// GET /api/v1/process/{id}/log/segments/lookup?correlationId=&name=
pub async fn lookup_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<SegmentLookupParams>,
) -> AppResult<Json<SegmentIdResponse>> {
    let key = process_key(&state, id).await?;
    let segment_id =
        ProcessLogRepo::find_segment_id(&state.pool, &key, params.correlation_id, &params.name)
            .await?
            .ok_or_else(|| {
                CoreError::not_found("Segment", format!("{}/{}", params.correlation_id, params.name))
            })?;
    Ok(Json(SegmentIdResponse { id: segment_id }))
}

/// GET /api/v1/process/{id}/log/segments/{segment_id}/data?start=&end=
pub async fn read_segment(
    State(state): State<AppState>,
    Path((id, segment_id)): Path<(Uuid, i64)>,
    Query(range): Query<RangeParams>,
) -> AppResult<Json<LogResponse>> {
    validate_read_bounds(range.start, range.end)?;
    let key = process_key(&state, id).await?;
    let log =
        ProcessLogRepo::read_segment(&state.pool, &key, segment_id, range.start, range.end).await?;
    Ok(Json(LogResponse::from(&log)))
}

/// POST /api/v1/process/{id}/log/segments/{segment_id}/data
///
/// Responds with the segment-local range of the appended bytes.
pub async fn append_segment(
    State(state): State<AppState>,
    Path((id, segment_id)): Path<(Uuid, i64)>,
    body: Bytes,
) -> AppResult<Json<RangeResponse>> {
    let key = process_key(&state, id).await?;
    let range = ProcessLogRepo::append_segment(&state.pool, &key, segment_id, &body).await?;
    Ok(Json(range.into()))
}

/// POST /api/v1/process/{id}/log/segments/{segment_id}/status
pub async fn update_segment_status(
    State(state): State<AppState>,
    Path((id, segment_id)): Path<(Uuid, i64)>,
    Json(input): Json<UpdateSegmentStatusRequest>,
) -> AppResult<StatusCode> {
    let key = process_key(&state, id).await?;
    let updated =
        ProcessLogRepo::update_segment_status(&state.pool, &key, segment_id, input.status).await?;
    if !updated {
        return Err(CoreError::not_found("Segment", segment_id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
