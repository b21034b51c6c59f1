//! Reconciliation of processes left `RUNNING`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{AgentScript, StubAgent};
use conductor_agent::{AgentJobStatus, AttachmentStore, ProcessExecutor};
use conductor_api::background::reconciler::reconcile_once;
use conductor_db::models::status::ProcessStatus;
use conductor_db::repositories::ProcessRepo;
use sqlx::PgPool;
use uuid::Uuid;

fn executor(final_status: AgentJobStatus, dir: &tempfile::TempDir) -> ProcessExecutor {
    let agent = StubAgent::new(AgentScript {
        final_status,
        ..AgentScript::default()
    });
    ProcessExecutor::new(Arc::new(agent), AttachmentStore::new(dir.path()))
}

async fn stale_process(pool: &PgPool) -> Uuid {
    let entry = ProcessRepo::create(pool, Uuid::new_v4(), None).await.unwrap();
    sqlx::query(
        "UPDATE processes SET last_update_at = NOW() - INTERVAL '1 hour' WHERE instance_id = $1",
    )
    .bind(entry.instance_id)
    .execute(pool)
    .await
    .unwrap();
    entry.instance_id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_jobs_are_finalized(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let stale = stale_process(&pool).await;
    let fresh = ProcessRepo::create(&pool, Uuid::new_v4(), None).await.unwrap();

    let executor = executor(AgentJobStatus::Completed, &dir);
    let updated = reconcile_once(&pool, &executor, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let stale = ProcessRepo::find(&pool, stale).await.unwrap().unwrap();
    assert_eq!(stale.status(), ProcessStatus::Finished);
    let fresh = ProcessRepo::find(&pool, fresh.instance_id).await.unwrap().unwrap();
    assert_eq!(fresh.status(), ProcessStatus::Running);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn running_jobs_are_only_touched(pool: PgPool) {
    let dir = tempfile::tempdir().unwrap();
    let id = stale_process(&pool).await;
    let before = ProcessRepo::find(&pool, id).await.unwrap().unwrap();

    let executor = executor(AgentJobStatus::Running, &dir);
    let updated = reconcile_once(&pool, &executor, Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(updated, 0);

    let after = ProcessRepo::find(&pool, id).await.unwrap().unwrap();
    assert_eq!(after.status(), ProcessStatus::Running);
    assert!(after.last_update_at > before.last_update_at);
}
