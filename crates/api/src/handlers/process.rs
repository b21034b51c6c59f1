//! Handlers for the `/process` resource: start, status, wait, kill and
//! attachment download.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use conductor_pipeline::PayloadSource;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::engine::WaitError;
use crate::error::{AppError, AppResult};
use crate::query::WaitParams;
use crate::response::{ProcessStatusResponse, StartProcessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// Parse a JSON request body into request data. An empty body is an empty
/// object; anything other than an object is rejected.
pub(crate) fn parse_request_object(body: &[u8]) -> AppResult<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::BadRequest(
            "Request data must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::BadRequest(format!("Invalid request data: {e}"))),
    }
}

async fn read_form_fields(mut multipart: Multipart) -> AppResult<Vec<(String, Bytes)>> {
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        fields.push((name, data));
    }
    Ok(fields)
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/process
///
/// Start a process from a ready-made workspace archive sent as the raw
/// request body.
pub async fn start_archive_process(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<StartProcessResponse>> {
    let instance_id = state
        .manager
        .start(PayloadSource::RawArchive { archive: body })
        .await?;
    Ok(Json(StartProcessResponse { instance_id }))
}

/// POST /api/v1/process/{entryPoint}
///
/// Start a process of a registered project. The body is either a
/// multipart form (`archive`, `request` and extra workspace files) or a
/// JSON object used as request data.
pub async fn start_project_process(
    State(state): State<AppState>,
    Path(entry_point): Path<String>,
    request: Request,
) -> AppResult<Json<StartProcessResponse>> {
    let source = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let fields = read_form_fields(multipart).await?;
        PayloadSource::from_form_fields(entry_point, fields)?
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        PayloadSource::ParametersOnly {
            entry_point,
            request: parse_request_object(&body)?,
        }
    };

    let instance_id = state.manager.start(source).await?;
    Ok(Json(StartProcessResponse { instance_id }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/process/{id}
pub async fn get_process(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProcessStatusResponse>> {
    let entry = state.manager.get(id).await?;
    Ok(Json(ProcessStatusResponse::from(&entry)))
}

/// GET /api/v1/process/{id}/wait?timeout=ms
///
/// Long poll until the process is terminal. On timeout responds 408 with
/// the last observed status as the body.
pub async fn wait_process(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<WaitParams>,
) -> AppResult<Response> {
    let timeout_ms = params.timeout.unwrap_or(0);
    match state
        .manager
        .wait_for_completion(id, timeout_ms, &state.shutdown)
        .await
    {
        Ok(entry) => Ok(Json(ProcessStatusResponse::from(&entry)).into_response()),
        Err(WaitError::Timeout(entry)) => Ok((
            StatusCode::REQUEST_TIMEOUT,
            Json(ProcessStatusResponse::from(&entry)),
        )
            .into_response()),
        Err(WaitError::Failed(e)) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Kill
// ---------------------------------------------------------------------------

/// POST /api/v1/process/{id}/kill
pub async fn kill_process(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.manager.kill(id).await?;
    tracing::info!(instance_id = %id, "Process kill requested");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// GET /api/v1/process/{id}/attachment/{*name}
///
/// Raw bytes of one entry of the process's attachment bundle.
pub async fn download_attachment(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<impl IntoResponse> {
    let data = state.manager.download_attachment(id, &name).await?;
    Ok(([(CONTENT_TYPE, "application/octet-stream")], data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn empty_body_is_empty_request_data() {
        assert!(parse_request_object(b"").unwrap().is_empty());
        assert!(parse_request_object(b" \n").unwrap().is_empty());
    }

    #[test]
    fn request_data_must_be_an_object() {
        let map = parse_request_object(br#"{"a":1}"#).unwrap();
        assert_eq!(map["a"], 1);
        assert_matches!(parse_request_object(b"[1]"), Err(AppError::BadRequest(_)));
        assert_matches!(parse_request_object(b"{"), Err(AppError::BadRequest(_)));
    }
}
