//! Route definitions for the `/process` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{logs, process};
use crate::state::AppState;

/// Upper bound for uploaded archives and multipart forms.
const UPLOAD_BODY_LIMIT: usize = 512 * 1024 * 1024;

/// Routes mounted at `/process`.
///
/// ```text
/// POST   /                                        -> start_archive_process
/// GET    /{id}                                    -> get_process
/// POST   /{entryPoint}                            -> start_project_process
/// POST   /{id}/kill                               -> kill_process
/// GET    /{id}/attachment/{*name}                 -> download_attachment
///
/// GET    /{id}/log                                -> read_log
/// POST   /{id}/log                                -> append_log
/// GET    /{id}/log/segments                       -> list_segments
/// POST   /{id}/log/segments                       -> create_segment
/// GET    /{id}/log/segments/lookup                -> lookup_segment
/// GET    /{id}/log/segments/{segment_id}/data     -> read_segment
/// POST   /{id}/log/segments/{segment_id}/data     -> append_segment
/// POST   /{id}/log/segments/{segment_id}/status   -> update_segment_status
/// ```
///
/// `GET /{id}/wait` is served by [`wait_router`] so it is not subject to
/// the request timeout.
pub fn router() -> Router<AppState> {
    let uploads = Router::new()
        .route("/", post(process::start_archive_process))
        .route(
            "/{id}",
            get(process::get_process).post(process::start_project_process),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .merge(uploads)
        .route("/{id}/kill", post(process::kill_process))
        .route("/{id}/attachment/{*name}", get(process::download_attachment))
        .route("/{id}/log", get(logs::read_log).post(logs::append_log))
        .route(
            "/{id}/log/segments",
            get(logs::list_segments).post(logs::create_segment),
        )
        .route("/{id}/log/segments/lookup", get(logs::lookup_segment))
        .route(
            "/{id}/log/segments/{segment_id}/data",
            get(logs::read_segment).post(logs::append_segment),
        )
        .route(
            "/{id}/log/segments/{segment_id}/status",
            post(logs::update_segment_status),
        )
}

/// The long-poll wait route, at its full path.
pub fn wait_router(prefix: &str) -> Router<AppState> {
    Router::new().route(
        &format!("{prefix}/process/{{id}}/wait"),
        get(process::wait_process),
    )
}
