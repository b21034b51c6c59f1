use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables. `DATABASE_URL` is
/// read separately by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). The long-poll wait
    /// route is not subject to it.
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight process runs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Base URL of the execution agent.
    pub agent_url: String,
    /// Job type tag sent with every upload (default: `JAR`).
    pub agent_job_type: String,
    /// Directory holding per-process attachment bundles.
    pub attachments_dir: PathBuf,
    /// Status poll period for wait requests, in milliseconds.
    pub wait_poll_interval_ms: u64,
    /// Reconciliation sweep period in seconds; `0` disables the sweep.
    pub reconcile_interval_secs: u64,
    /// A `RUNNING` process is swept once it has not been updated for this
    /// many seconds.
    pub reconcile_stale_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `8001`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                       |
    /// | `AGENT_URL`               | `http://localhost:8002`    |
    /// | `AGENT_JOB_TYPE`          | `JAR`                      |
    /// | `ATTACHMENTS_DIR`         | `./data/attachments`       |
    /// | `WAIT_POLL_INTERVAL_MS`   | `3000`                     |
    /// | `RECONCILE_INTERVAL_SECS` | `0` (disabled)             |
    /// | `RECONCILE_STALE_SECS`    | `600`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8001".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let agent_url =
            std::env::var("AGENT_URL").unwrap_or_else(|_| "http://localhost:8002".into());
        let agent_job_type = std::env::var("AGENT_JOB_TYPE").unwrap_or_else(|_| "JAR".into());
        let attachments_dir = std::env::var("ATTACHMENTS_DIR")
            .unwrap_or_else(|_| "./data/attachments".into())
            .into();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_u64("SHUTDOWN_TIMEOUT_SECS", 30),
            agent_url,
            agent_job_type,
            attachments_dir,
            wait_poll_interval_ms: env_u64("WAIT_POLL_INTERVAL_MS", 3000),
            reconcile_interval_secs: env_u64("RECONCILE_INTERVAL_SECS", 0),
            reconcile_stale_secs: env_u64("RECONCILE_STALE_SECS", 600),
        }
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    /// `None` when the reconciliation sweep is disabled.
    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0).then(|| Duration::from_secs(self.reconcile_interval_secs))
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid u64")),
        Err(_) => default,
    }
}
