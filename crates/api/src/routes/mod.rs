pub mod events;
pub mod health;
pub mod process;

use axum::Router;

use crate::state::AppState;

/// Prefix of all API routes except `/health`.
pub const API_PREFIX: &str = "/api/v1";

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /process                                          start from raw archive
/// /process/{entryPoint}                             start project process
/// /process/{id}                                     status
/// /process/{id}/kill                                cancel (POST)
/// /process/{id}/attachment/{*name}                  attachment entry
/// /process/{id}/log                                 read, append
/// /process/{id}/log/segments                        list, get-or-create
/// /process/{id}/log/segments/lookup                 resolve segment id
/// /process/{id}/log/segments/{segment_id}/data      read, append
/// /process/{id}/log/segments/{segment_id}/status    set status (POST)
///
/// /events/{event_name}                              publish event (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/process", process::router())
        .nest("/events", events::router())
}

/// Routes exempt from the request timeout, at their full paths.
///
/// ```text
/// /api/v1/process/{id}/wait                         long poll (GET)
/// ```
pub fn long_poll_routes() -> Router<AppState> {
    process::wait_router(API_PREFIX)
}
