//! Handler for external events that start registered processes.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use conductor_db::models::trigger::Trigger;
use conductor_db::repositories::TriggerRepo;
use conductor_pipeline::PayloadSource;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::process::parse_request_object;
use crate::response::EventResponse;
use crate::state::AppState;

const EVENT_ID_KEY: &str = "id";
const EVENT_KEY: &str = "event";
const ARGUMENTS_KEY: &str = "arguments";

/// Request data for a process started by `trigger`: the trigger's
/// arguments with the event payload added under `event`.
fn trigger_request(trigger: &Trigger, event: &Map<String, Value>) -> Map<String, Value> {
    let mut arguments = match &trigger.arguments {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    arguments.insert(EVENT_KEY.to_string(), Value::Object(event.clone()));

    let mut request = Map::new();
    request.insert(ARGUMENTS_KEY.to_string(), Value::Object(arguments));
    request
}

/// POST /api/v1/events/{event_name}
///
/// Start one process per trigger registered for the event. An event
/// without an `id` gets a fresh one. Triggers that fail to start are
/// logged and skipped.
pub async fn publish_event(
    State(state): State<AppState>,
    Path(event_name): Path<String>,
    body: Bytes,
) -> AppResult<Json<EventResponse>> {
    let mut event = parse_request_object(&body)?;
    if event.is_empty() {
        return Err(AppError::BadRequest("Event payload is required".to_string()));
    }
    let event_id = event
        .entry(EVENT_ID_KEY)
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
        .clone();

    let triggers = TriggerRepo::list_by_event(&state.pool, &event_name).await?;
    let mut processes_started = 0;
    for trigger in &triggers {
        let source = PayloadSource::ParametersOnly {
            entry_point: format!("{}:{}", trigger.project_name, trigger.entry_point),
            request: trigger_request(trigger, &event),
        };
        match state.manager.start(source).await {
            Ok(instance_id) => {
                tracing::info!(
                    event = %event_name,
                    trigger_id = trigger.id,
                    instance_id = %instance_id,
                    "Process started by event",
                );
                processes_started += 1;
            }
            Err(e) => {
                tracing::warn!(
                    event = %event_name,
                    trigger_id = trigger.id,
                    error = %e,
                    "Event trigger failed to start a process",
                );
            }
        }
    }

    Ok(Json(EventResponse {
        event_id,
        processes_started,
    }))
}
