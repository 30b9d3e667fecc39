//! SQLite project repository
//!
//! Persists the project aggregate. Saves run inside a single transaction
//! so the project row and its allocation set commit as one unit.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::entity::{Allocation, Project, ProjectStatus};
use super::repository_trait::{PageRequest, PagedResult, ProjectFilter, ProjectRepository};

/// Repository for project database operations
#[derive(Debug, Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_allocations(&self, project_id: Uuid) -> Result<Vec<Allocation>> {
        let rows: Vec<AllocationRow> = sqlx::query_as(
            r#"
            SELECT id, member_id
            FROM allocations
            WHERE project_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(|row| row.into_allocation()).collect()
    }

    async fn hydrate(&self, row: ProjectRow) -> Result<Project> {
        let mut project = row.into_project()?;
        project.allocations = self.load_allocations(project.id).await?;
        Ok(project)
    }

    async fn hydrate_all(&self, rows: Vec<ProjectRow>) -> Result<Vec<Project>> {
        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(self.hydrate(row).await?);
        }
        Ok(projects)
    }

    fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProjectFilter) {
        if let Some(name) = &filter.name_contains {
            builder
                .push(" AND LOWER(name) LIKE ")
                .push_bind(format!("%{}%", name.to_lowercase()));
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(manager_id) = filter.manager_id {
            builder.push(" AND manager_id = ").push_bind(manager_id);
        }
        if let Some(from) = filter.start_date_from {
            builder.push(" AND start_date >= ").push_bind(from);
        }
        if let Some(to) = filter.start_date_to {
            builder.push(" AND start_date <= ").push_bind(to);
        }
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, start_date, forecast_end_date, actual_end_date,
                   total_budget_cents, description, manager_id, status
            FROM projects
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn save(&self, project: &Project) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let id = project.id.to_string();

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, name, start_date, forecast_end_date, actual_end_date,
                total_budget_cents, description, manager_id, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                start_date = excluded.start_date,
                forecast_end_date = excluded.forecast_end_date,
                actual_end_date = excluded.actual_end_date,
                total_budget_cents = excluded.total_budget_cents,
                description = excluded.description,
                manager_id = excluded.manager_id,
                status = excluded.status
            "#,
        )
        .bind(&id)
        .bind(&project.name)
        .bind(project.start_date)
        .bind(project.forecast_end_date)
        .bind(project.actual_end_date)
        .bind(project.total_budget_cents)
        .bind(&project.description)
        .bind(project.manager_id)
        .bind(project.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        // Reconcile the owned allocation set: rows removed from the
        // aggregate must not survive the save.
        sqlx::query("DELETE FROM allocations WHERE project_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for allocation in &project.allocations {
            sqlx::query("INSERT INTO allocations (id, project_id, member_id) VALUES (?, ?, ?)")
                .bind(allocation.id.to_string())
                .bind(&id)
                .bind(allocation.member_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Allocations go with the project via ON DELETE CASCADE.
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Project>> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT id, name, start_date, forecast_end_date, actual_end_date,
                   total_budget_cents, description, manager_id, status
            FROM projects
            ORDER BY start_date, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.hydrate_all(rows).await
    }

    async fn find_all(
        &self,
        filter: &ProjectFilter,
        page: &PageRequest,
    ) -> Result<PagedResult<Project>> {
        let mut count_builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM projects WHERE 1=1");
        Self::push_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, start_date, forecast_end_date, actual_end_date, \
             total_budget_cents, description, manager_id, status \
             FROM projects WHERE 1=1",
        );
        Self::push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY start_date, name LIMIT ")
            .push_bind(i64::from(page.per_page))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset()));

        let rows: Vec<ProjectRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(PagedResult {
            items: self.hydrate_all(rows).await?,
            total: total as u64,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn find_active_projects_for_member(
        &self,
        member_id: i64,
        excluded: &[ProjectStatus],
    ) -> Result<Vec<Project>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT p.id, p.name, p.start_date, p.forecast_end_date, p.actual_end_date, \
             p.total_budget_cents, p.description, p.manager_id, p.status \
             FROM projects p JOIN allocations a ON a.project_id = p.id \
             WHERE a.member_id = ",
        );
        builder.push_bind(member_id);
        if !excluded.is_empty() {
            builder.push(" AND p.status NOT IN (");
            let mut separated = builder.separated(", ");
            for status in excluded {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }

        let rows: Vec<ProjectRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        self.hydrate_all(rows).await
    }

    async fn allocation_exists(&self, project_id: Uuid, member_id: i64) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM allocations WHERE project_id = ? AND member_id = ?)",
        )
        .bind(project_id.to_string())
        .bind(member_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }
}

// ========== Database Row Types ==========

/// Database row for a project, without its allocations
#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    start_date: NaiveDate,
    forecast_end_date: NaiveDate,
    actual_end_date: Option<NaiveDate>,
    total_budget_cents: i64,
    description: Option<String>,
    manager_id: i64,
    status: String,
}

impl ProjectRow {
    fn into_project(self) -> Result<Project> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid project ID: {e}")))?;
        let status = ProjectStatus::parse(&self.status)
            .ok_or_else(|| Error::Parse(format!("Invalid project status: {}", self.status)))?;

        Ok(Project {
            id,
            name: self.name,
            start_date: self.start_date,
            forecast_end_date: self.forecast_end_date,
            actual_end_date: self.actual_end_date,
            total_budget_cents: self.total_budget_cents,
            description: self.description,
            manager_id: self.manager_id,
            status,
            allocations: Vec::new(),
        })
    }
}

/// Database row for an allocation
#[derive(sqlx::FromRow)]
struct AllocationRow {
    id: String,
    member_id: i64,
}

impl AllocationRow {
    fn into_allocation(self) -> Result<Allocation> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid allocation ID: {e}")))?;
        Ok(Allocation {
            id,
            member_id: self.member_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn create_test_repo() -> SqliteProjectRepository {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        SqliteProjectRepository::new(db.pool().clone())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_project(name: &str, status: ProjectStatus) -> Project {
        Project::new(
            name.to_string(),
            date(2024, 1, 10),
            date(2024, 4, 10),
            250_000_00,
            Some("sample".to_string()),
            1,
            status,
        )
    }

    #[tokio::test]
    async fn test_save_and_find_round_trip() {
        let repo = create_test_repo().await;

        let mut project = sample_project("Billing revamp", ProjectStatus::Started);
        project.add_allocation(101);
        project.add_allocation(102);
        repo.save(&project).await.expect("Failed to save");

        let loaded = repo
            .find_by_id(project.id)
            .await
            .expect("Failed to find")
            .expect("Project not found");

        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.name, "Billing revamp");
        assert_eq!(loaded.status, ProjectStatus::Started);
        assert_eq!(loaded.total_budget_cents, 250_000_00);
        assert_eq!(loaded.allocations.len(), 2);
        assert!(loaded.has_allocation(101));
        assert!(loaded.has_allocation(102));
    }

    #[tokio::test]
    async fn test_save_reconciles_allocation_set() {
        let repo = create_test_repo().await;

        let mut project = sample_project("CRM", ProjectStatus::Started);
        project.add_allocation(101);
        project.add_allocation(102);
        repo.save(&project).await.expect("save");

        project.remove_allocation(101);
        project.add_allocation(103);
        repo.save(&project).await.expect("resave");

        let loaded = repo.find_by_id(project.id).await.expect("find").unwrap();
        assert_eq!(loaded.allocations.len(), 2);
        assert!(!loaded.has_allocation(101));
        assert!(loaded.has_allocation(102));
        assert!(loaded.has_allocation(103));
    }

    #[tokio::test]
    async fn test_delete_removes_aggregate() {
        let repo = create_test_repo().await;

        let mut project = sample_project("Doomed", ProjectStatus::UnderReview);
        project.add_allocation(101);
        repo.save(&project).await.expect("save");

        repo.delete(project.id).await.expect("delete");

        assert!(repo.find_by_id(project.id).await.expect("find").is_none());
        assert!(!repo
            .allocation_exists(project.id, 101)
            .await
            .expect("allocation_exists"));
    }

    #[tokio::test]
    async fn test_allocation_exists() {
        let repo = create_test_repo().await;

        let mut project = sample_project("CRM", ProjectStatus::Started);
        project.add_allocation(101);
        repo.save(&project).await.expect("save");

        assert!(repo.allocation_exists(project.id, 101).await.unwrap());
        assert!(!repo.allocation_exists(project.id, 999).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_filters_conjunctively() {
        let repo = create_test_repo().await;

        let mut a = sample_project("Alpha rollout", ProjectStatus::Started);
        a.manager_id = 1;
        let mut b = sample_project("Beta rollout", ProjectStatus::Planned);
        b.manager_id = 2;
        let mut c = sample_project("Gamma", ProjectStatus::Started);
        c.manager_id = 1;
        for p in [&a, &b, &c] {
            repo.save(p).await.expect("save");
        }

        let filter = ProjectFilter {
            name_contains: Some("ROLLOUT".to_string()),
            status: Some(ProjectStatus::Started),
            manager_id: Some(1),
            ..Default::default()
        };
        let page = repo
            .find_all(&filter, &PageRequest::default())
            .await
            .expect("find_all");

        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, a.id);
    }

    #[tokio::test]
    async fn test_find_all_start_date_range() {
        let repo = create_test_repo().await;

        let mut early = sample_project("Early", ProjectStatus::Started);
        early.start_date = date(2024, 1, 1);
        let mut late = sample_project("Late", ProjectStatus::Started);
        late.start_date = date(2024, 6, 1);
        repo.save(&early).await.expect("save");
        repo.save(&late).await.expect("save");

        let filter = ProjectFilter {
            start_date_from: Some(date(2024, 2, 1)),
            start_date_to: Some(date(2024, 12, 31)),
            ..Default::default()
        };
        let page = repo
            .find_all(&filter, &PageRequest::default())
            .await
            .expect("find_all");
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, late.id);
    }

    #[tokio::test]
    async fn test_find_all_pagination() {
        let repo = create_test_repo().await;

        for i in 0..5 {
            let mut p = sample_project(&format!("Project {i}"), ProjectStatus::Started);
            p.start_date = date(2024, 1, 1 + i);
            repo.save(&p).await.expect("save");
        }

        let page = repo
            .find_all(
                &ProjectFilter::default(),
                &PageRequest { page: 1, per_page: 2 },
            )
            .await
            .expect("find_all");

        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items[0].name, "Project 2");
    }

    #[tokio::test]
    async fn test_find_active_projects_for_member() {
        let repo = create_test_repo().await;

        let mut active = sample_project("Active", ProjectStatus::InProgress);
        active.add_allocation(101);
        let mut closed = sample_project("Closed", ProjectStatus::Closed);
        closed.add_allocation(101);
        let mut cancelled = sample_project("Cancelled", ProjectStatus::Cancelled);
        cancelled.add_allocation(101);
        let mut other_member = sample_project("Other", ProjectStatus::Started);
        other_member.add_allocation(102);
        for p in [&active, &closed, &cancelled, &other_member] {
            repo.save(p).await.expect("save");
        }

        let excluded = [ProjectStatus::Closed, ProjectStatus::Cancelled];
        let projects = repo
            .find_active_projects_for_member(101, &excluded)
            .await
            .expect("query");

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, active.id);
    }
}
