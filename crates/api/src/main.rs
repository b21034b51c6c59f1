use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use conductor_agent::{AttachmentStore, HttpAgentConnector, ProcessExecutor};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conductor_api::background::reconciler;
use conductor_api::config::ServerConfig;
use conductor_api::engine::ProcessManager;
use conductor_api::router::build_app_router;
use conductor_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "conductor_api=debug,conductor_agent=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        agent_url = %config.agent_url,
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = conductor_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    conductor_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    conductor_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Agent executor ---
    let connector =
        HttpAgentConnector::new(config.agent_url.clone()).expect("Failed to build agent client");
    let attachments = AttachmentStore::new(config.attachments_dir.clone());
    let executor = ProcessExecutor::new(Arc::new(connector), attachments)
        .with_job_type(config.agent_job_type.clone());

    let manager = Arc::new(ProcessManager::new(
        pool.clone(),
        executor.clone(),
        config.wait_poll_interval(),
    ));

    // --- Background tasks ---
    let shutdown = CancellationToken::new();
    let reconciler_handle = config.reconcile_interval().map(|interval| {
        tokio::spawn(reconciler::run(
            pool.clone(),
            executor,
            interval,
            Duration::from_secs(config.reconcile_stale_secs),
            shutdown.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        manager: Arc::clone(&manager),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Releases pending long polls so connections can drain.
            signal_token.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(handle) = reconciler_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Process reconciler stopped");
    }

    let drained = manager
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if drained {
        tracing::info!("All running processes finished");
    } else {
        tracing::warn!("Shutdown timeout reached with processes still running");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
