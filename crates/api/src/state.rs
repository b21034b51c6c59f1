use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::engine::ProcessManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: conductor_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Starts, waits on and kills processes.
    pub manager: Arc<ProcessManager>,
    /// Cancelled when the server begins shutting down; ends long polls.
    pub shutdown: CancellationToken,
}
