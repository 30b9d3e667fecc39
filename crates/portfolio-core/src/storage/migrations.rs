//! Database migrations
//!
//! Versioned SQLite schema migrations, applied automatically on connect.

use sqlx::SqlitePool;

use anyhow::Result;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: projects and allocations
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        start_date TEXT NOT NULL,
        forecast_end_date TEXT NOT NULL,
        actual_end_date TEXT,
        total_budget_cents INTEGER NOT NULL CHECK (total_budget_cents >= 0),
        description TEXT,
        manager_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'under_review' CHECK (status IN (
            'under_review', 'review_complete', 'review_approved', 'started',
            'planned', 'in_progress', 'closed', 'cancelled'
        ))
    );

    CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
    CREATE INDEX IF NOT EXISTS idx_projects_manager_id ON projects(manager_id);
    CREATE INDEX IF NOT EXISTS idx_projects_start_date ON projects(start_date);

    CREATE TABLE IF NOT EXISTS allocations (
        id TEXT PRIMARY KEY NOT NULL,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        member_id INTEGER NOT NULL,
        UNIQUE (project_id, member_id)
    );

    CREATE INDEX IF NOT EXISTS idx_allocations_project_id ON allocations(project_id);
    CREATE INDEX IF NOT EXISTS idx_allocations_member_id ON allocations(member_id);
"#;

/// Ordered list of migrations by version
fn migrations() -> Vec<(i32, &'static str)> {
    vec![(1, MIGRATION_V1)]
}

/// Migration status of a database
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub latest_version: i32,
    pub needs_migration: bool,
}

/// Apply any pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let applied = applied_version(pool).await?;

    for (version, sql) in migrations() {
        if version <= applied {
            continue;
        }
        tracing::debug!(version, "applying migration");
        sqlx::raw_sql(sql).execute(pool).await?;
        sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
            .bind(version)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Check which migrations have been applied
pub async fn migration_status(pool: &SqlitePool) -> Result<MigrationStatus> {
    sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    let current = applied_version(pool).await?;
    Ok(MigrationStatus {
        current_version: current,
        latest_version: CURRENT_VERSION,
        needs_migration: current < CURRENT_VERSION,
    })
}

async fn applied_version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let db = Database::in_memory().await.expect("in-memory database");

        let status = migration_status(db.pool()).await.expect("status");
        assert_eq!(status.current_version, CURRENT_VERSION);
        assert!(!status.needs_migration);

        // Re-running is a no-op.
        run_migrations(db.pool()).await.expect("rerun migrations");
        let status = migration_status(db.pool()).await.expect("status");
        assert_eq!(status.current_version, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_schema_enforces_allocation_uniqueness() {
        let db = Database::in_memory().await.expect("in-memory database");
        let project_id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO projects (id, name, start_date, forecast_end_date, total_budget_cents, manager_id, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project_id)
        .bind("Test")
        .bind("2024-01-01")
        .bind("2024-03-01")
        .bind(1_000_00i64)
        .bind(1i64)
        .bind("under_review")
        .execute(db.pool())
        .await
        .expect("insert project");

        let insert_allocation = |alloc_id: String| {
            let project_id = project_id.clone();
            let pool = db.pool().clone();
            async move {
                sqlx::query("INSERT INTO allocations (id, project_id, member_id) VALUES (?, ?, ?)")
                    .bind(alloc_id)
                    .bind(project_id)
                    .bind(101i64)
                    .execute(&pool)
                    .await
            }
        };

        insert_allocation(uuid::Uuid::new_v4().to_string())
            .await
            .expect("first allocation");
        let duplicate = insert_allocation(uuid::Uuid::new_v4().to_string()).await;
        assert!(duplicate.is_err(), "duplicate (project, member) should be rejected");
    }

    #[tokio::test]
    async fn test_cascade_delete_removes_allocations() {
        let db = Database::in_memory().await.expect("in-memory database");
        let project_id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO projects (id, name, start_date, forecast_end_date, total_budget_cents, manager_id, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project_id)
        .bind("Test")
        .bind("2024-01-01")
        .bind("2024-03-01")
        .bind(0i64)
        .bind(1i64)
        .bind("started")
        .execute(db.pool())
        .await
        .expect("insert project");

        sqlx::query("INSERT INTO allocations (id, project_id, member_id) VALUES (?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&project_id)
            .bind(101i64)
            .execute(db.pool())
            .await
            .expect("insert allocation");

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(&project_id)
            .execute(db.pool())
            .await
            .expect("delete project");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM allocations WHERE project_id = ?")
            .bind(&project_id)
            .fetch_one(db.pool())
            .await
            .expect("count allocations");
        assert_eq!(count, 0, "allocations should not outlive their project");
    }
}
