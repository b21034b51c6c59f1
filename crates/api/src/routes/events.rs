//! Route definitions for external events.

use axum::routing::post;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// POST   /{event_name}    -> publish_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{event_name}", post(events::publish_event))
}
