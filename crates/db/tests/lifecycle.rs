//! Integration tests for process lifecycle tracking, project lookups and
//! event triggers.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use conductor_db::models::status::ProcessStatus;
use conductor_db::models::trigger::CreateTrigger;
use conductor_db::repositories::{ProcessRepo, ProjectRepo, TriggerRepo};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Test: process status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_starts_running(pool: PgPool) {
    let id = Uuid::new_v4();
    let entry = ProcessRepo::create(&pool, id, Some("demo")).await.unwrap();
    assert_eq!(entry.instance_id, id);
    assert_eq!(entry.status(), ProcessStatus::Running);
    assert_eq!(entry.project_name.as_deref(), Some("demo"));

    let found = ProcessRepo::find(&pool, id).await.unwrap().unwrap();
    assert_eq!(found.key(), entry.key());

    assert!(ProcessRepo::find(&pool, Uuid::new_v4()).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_instance_id_is_rejected(pool: PgPool) {
    let id = Uuid::new_v4();
    ProcessRepo::create(&pool, id, None).await.unwrap();
    let err = ProcessRepo::create(&pool, id, None).await.unwrap_err();
    assert_matches!(err, sqlx::Error::Database(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_terminal_status_is_final(pool: PgPool) {
    let key = ProcessRepo::create(&pool, Uuid::new_v4(), None)
        .await
        .unwrap()
        .key();

    // RUNNING -> RUNNING is allowed (idempotent re-emission).
    assert!(ProcessRepo::update_status(&pool, &key, ProcessStatus::Running)
        .await
        .unwrap());
    assert!(ProcessRepo::update_status(&pool, &key, ProcessStatus::Finished)
        .await
        .unwrap());

    assert!(!ProcessRepo::update_status(&pool, &key, ProcessStatus::Failed)
        .await
        .unwrap());
    assert!(!ProcessRepo::update_status(&pool, &key, ProcessStatus::Running)
        .await
        .unwrap());
    assert!(!ProcessRepo::touch(&pool, &key).await.unwrap());

    let entry = ProcessRepo::find(&pool, key.instance_id).await.unwrap().unwrap();
    assert_eq!(entry.status(), ProcessStatus::Finished);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_touch_bumps_last_update(pool: PgPool) {
    let entry = ProcessRepo::create(&pool, Uuid::new_v4(), None).await.unwrap();
    sqlx::query("UPDATE processes SET last_update_at = NOW() - INTERVAL '1 hour' WHERE instance_id = $1")
        .bind(entry.instance_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(ProcessRepo::touch(&pool, &entry.key()).await.unwrap());
    let after = ProcessRepo::find(&pool, entry.instance_id).await.unwrap().unwrap();
    assert!(after.last_update_at > Utc::now() - Duration::minutes(1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_stale_running(pool: PgPool) {
    let stale = ProcessRepo::create(&pool, Uuid::new_v4(), None).await.unwrap();
    let fresh = ProcessRepo::create(&pool, Uuid::new_v4(), None).await.unwrap();
    let done = ProcessRepo::create(&pool, Uuid::new_v4(), None).await.unwrap();
    ProcessRepo::update_status(&pool, &done.key(), ProcessStatus::Failed)
        .await
        .unwrap();

    sqlx::query(
        "UPDATE processes SET last_update_at = NOW() - INTERVAL '2 hours' \
         WHERE instance_id = ANY($1)",
    )
    .bind(vec![stale.instance_id, done.instance_id])
    .execute(&pool)
    .await
    .unwrap();

    let found = ProcessRepo::list_stale_running(&pool, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let ids: Vec<Uuid> = found.iter().map(|p| p.instance_id).collect();
    assert_eq!(ids, vec![stale.instance_id]);
    assert!(!ids.contains(&fresh.instance_id));
}

// ---------------------------------------------------------------------------
// Test: projects and triggers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_lookup(pool: PgPool) {
    assert!(!ProjectRepo::exists(&pool, "demo").await.unwrap());
    let project = ProjectRepo::create(&pool, "demo").await.unwrap();
    assert!(ProjectRepo::exists(&pool, "demo").await.unwrap());

    let found = ProjectRepo::find_by_name(&pool, "demo").await.unwrap().unwrap();
    assert_eq!(found.id, project.id);

    let dup = ProjectRepo::create(&pool, "demo").await.unwrap_err();
    let constraint = dup
        .as_database_error()
        .and_then(|e| e.constraint())
        .map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("uq_projects_name"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_triggers_by_event(pool: PgPool) {
    ProjectRepo::create(&pool, "demo").await.unwrap();
    let make = |event: &str, entry: &str| CreateTrigger {
        event_name: event.to_string(),
        project_name: "demo".to_string(),
        entry_point: entry.to_string(),
        arguments: serde_json::json!({ "env": "test" }),
    };

    let first = TriggerRepo::create(&pool, &make("push", "build")).await.unwrap();
    let second = TriggerRepo::create(&pool, &make("push", "notify")).await.unwrap();
    TriggerRepo::create(&pool, &make("tag", "release")).await.unwrap();

    let push = TriggerRepo::list_by_event(&pool, "push").await.unwrap();
    let ids: Vec<i64> = push.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(push[0].arguments["env"], "test");

    assert!(TriggerRepo::list_by_event(&pool, "none").await.unwrap().is_empty());
}
