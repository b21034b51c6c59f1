//! Repository for the `projects` lookup table.

use sqlx::PgPool;

use crate::models::project::Project;

const COLUMNS: &str = "id, name, created_at";

pub struct ProjectRepo;

impl ProjectRepo {
    /// Register a project. Duplicate names violate `uq_projects_name`.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Project, sqlx::Error> {
        let query = format!("INSERT INTO projects (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Project>(&query)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE name = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE name = $1)")
            .bind(name)
            .fetch_one(pool)
            .await
    }
}
