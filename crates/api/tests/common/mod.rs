#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use bytes::Bytes;
use conductor_agent::transport::{LogStream, StartJob};
use conductor_agent::{
    AgentConnector, AgentError, AgentJobStatus, AgentSession, AttachmentStore, ProcessExecutor,
};
use futures::StreamExt;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

use conductor_api::config::ServerConfig;
use conductor_api::engine::ProcessManager;
use conductor_api::router::build_app_router;
use conductor_api::state::AppState;

// ---------------------------------------------------------------------------
// Stub agent
// ---------------------------------------------------------------------------

/// How the stub agent answers.
#[derive(Clone)]
pub struct AgentScript {
    pub fail_start: bool,
    pub log: Vec<&'static [u8]>,
    /// Keep the log stream open forever.
    pub hang: bool,
    pub attachments: Option<Bytes>,
    pub final_status: AgentJobStatus,
}

impl Default for AgentScript {
    fn default() -> Self {
        Self {
            fail_start: false,
            log: vec![b"hello\n"],
            hang: false,
            attachments: None,
            final_status: AgentJobStatus::Completed,
        }
    }
}

/// In-memory agent recording what it was asked to do.
#[derive(Clone, Default)]
pub struct StubAgent {
    script: Arc<AgentScript>,
    uploads: Arc<Mutex<Vec<StartJob>>>,
    cancels: Arc<Mutex<Vec<Uuid>>>,
}

impl StubAgent {
    pub fn new(script: AgentScript) -> Self {
        Self {
            script: Arc::new(script),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<StartJob> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> Vec<Uuid> {
        self.cancels.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentConnector for StubAgent {
    async fn connect(&self) -> Result<Box<dyn AgentSession>, AgentError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl AgentSession for StubAgent {
    async fn start(&self, job: StartJob) -> Result<(), AgentError> {
        if self.script.fail_start {
            return Err(AgentError::Api {
                status: 503,
                body: "agent unavailable".into(),
            });
        }
        self.uploads.lock().unwrap().push(job);
        Ok(())
    }

    async fn stream_log(&self, _instance_id: Uuid) -> Result<LogStream, AgentError> {
        if self.script.hang {
            return Ok(futures::stream::pending().boxed());
        }
        let chunks: Vec<Result<Bytes, AgentError>> = self
            .script
            .log
            .iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn download_attachments(&self, _instance_id: Uuid) -> Result<Option<Bytes>, AgentError> {
        Ok(self.script.attachments.clone())
    }

    async fn status(&self, _instance_id: Uuid) -> Result<AgentJobStatus, AgentError> {
        Ok(self.script.final_status)
    }

    async fn cancel(&self, instance_id: Uuid) -> Result<(), AgentError> {
        self.cancels.lock().unwrap().push(instance_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Test `ServerConfig` with a short wait poll period.
pub fn test_config(attachments_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        agent_url: "http://127.0.0.1:9".to_string(),
        agent_job_type: "JAR".to_string(),
        attachments_dir: attachments_dir.to_path_buf(),
        wait_poll_interval_ms: 20,
        reconcile_interval_secs: 0,
        reconcile_stale_secs: 600,
    }
}

pub struct TestApp {
    pub router: Router,
    pub agent: StubAgent,
    pub pool: PgPool,
    _attachments: tempfile::TempDir,
}

/// Build the full application router against `pool` and a stub agent
/// following `script`.
pub fn build_test_app_with(pool: PgPool, script: AgentScript) -> TestApp {
    let attachments = tempfile::tempdir().unwrap();
    let config = test_config(attachments.path());
    let agent = StubAgent::new(script);

    let executor = ProcessExecutor::new(
        Arc::new(agent.clone()),
        AttachmentStore::new(attachments.path()),
    );
    let manager = ProcessManager::new(pool.clone(), executor, config.wait_poll_interval());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        manager: Arc::new(manager),
        shutdown: CancellationToken::new(),
    };

    TestApp {
        router: build_app_router(state, &config),
        agent,
        pool,
        _attachments: attachments,
    }
}

pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, AgentScript::default()).router
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_bytes(app: &Router, uri: &str, data: impl Into<Bytes>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/octet-stream")
        .body(Body::from(data.into()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Start a process and return its instance ID.
pub async fn start(app: &Router, entry_point: &str, request: serde_json::Value) -> Uuid {
    let response = post_json(app, &format!("/api/v1/process/{entry_point}"), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["instanceId"].as_str().unwrap().parse().unwrap()
}

/// Wait (without a timeout) for a process to finish and return its status
/// body.
pub async fn wait(app: &Router, id: Uuid) -> serde_json::Value {
    let response = tokio::time::timeout(
        Duration::from_secs(10),
        get(app, &format!("/api/v1/process/{id}/wait")),
    )
    .await
    .expect("process did not finish");
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

pub fn zip_of(entries: &[(&str, &[u8])]) -> Bytes {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    Bytes::from(writer.finish().unwrap().into_inner())
}

/// Contents of one archive entry, or `None` if missing.
pub fn zip_entry(archive: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    Some(data)
}
