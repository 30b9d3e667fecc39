//! Repository trait for project persistence
//!
//! Abstracts the storage backend behind the aggregate-level contract the
//! rule engine needs. The aggregate (project plus owned allocations) is
//! loaded and saved as one unit.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

use super::entity::{Project, ProjectStatus};

/// Conjunctive filter for project list queries
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive name substring
    pub name_contains: Option<String>,
    /// Exact status match
    pub status: Option<ProjectStatus>,
    /// Exact manager match
    pub manager_id: Option<i64>,
    /// Inclusive lower bound on start date
    pub start_date_from: Option<NaiveDate>,
    /// Inclusive upper bound on start date
    pub start_date_to: Option<NaiveDate>,
}

/// Zero-based page request
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 20,
        }
    }
}

impl PageRequest {
    /// Row offset for this page
    pub fn offset(&self) -> u32 {
        self.page * self.per_page
    }
}

/// One page of results plus the unpaged total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Repository trait for project persistence
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Load a project aggregate by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>>;

    /// Persist a project aggregate, allocations included, as one unit
    async fn save(&self, project: &Project) -> Result<()>;

    /// Delete a project and its allocations
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Load every project aggregate
    async fn list_all(&self) -> Result<Vec<Project>>;

    /// Filtered, paginated project query
    async fn find_all(
        &self,
        filter: &ProjectFilter,
        page: &PageRequest,
    ) -> Result<PagedResult<Project>>;

    /// Projects a member is allocated to, excluding the given statuses
    ///
    /// Used for the active-project quota check.
    async fn find_active_projects_for_member(
        &self,
        member_id: i64,
        excluded: &[ProjectStatus],
    ) -> Result<Vec<Project>>;

    /// Whether a member is already allocated to a project
    async fn allocation_exists(&self, project_id: Uuid, member_id: i64) -> Result<bool>;
}
