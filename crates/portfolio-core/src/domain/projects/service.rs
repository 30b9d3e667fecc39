//! Project rule engine
//!
//! Orchestrates creation, updates, status transitions, deletion
//! eligibility, and member allocation, composing the status policy,
//! risk classifier, allocation rules, member directory, and repository.
//!
//! Directory failures hard-fail validation (manager checks, allocation
//! eligibility) but soft-fail display enrichment, where a placeholder
//! name is substituted instead.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::members::MemberDirectory;
use crate::error::{Error, Result};

use super::allocation::AllocationRules;
use super::entity::{Project, ProjectStatus, RiskLevel};
use super::repository_trait::{PageRequest, PagedResult, ProjectFilter, ProjectRepository};

/// Placeholder shown when a display-name lookup fails
pub const NAME_UNAVAILABLE: &str = "[name unavailable]";

/// Statuses in which a project cannot be deleted
const DELETION_BLOCKED_STATUSES: [ProjectStatus; 3] = [
    ProjectStatus::InProgress,
    ProjectStatus::Closed,
    ProjectStatus::Planned,
];

/// Request to create a project
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub start_date: NaiveDate,
    pub forecast_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub total_budget_cents: i64,
    pub description: Option<String>,
    pub manager_id: i64,
    /// Starting status; defaults to the first lifecycle stage
    pub status: Option<String>,
}

/// Field-level project update; `None` means "leave unchanged"
///
/// `actual_end_date` is doubly optional so that "no change" and "clear
/// the date" stay distinct.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub forecast_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<Option<NaiveDate>>,
    pub total_budget_cents: Option<i64>,
    pub description: Option<String>,
    pub manager_id: Option<i64>,
    /// Present only for echo; a value differing from the current status
    /// is rejected, status moves go through `transition_status`
    pub status: Option<String>,
}

/// Filtered, paginated list query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectListQuery {
    pub name: Option<String>,
    pub status: Option<String>,
    pub manager_id: Option<i64>,
    pub start_date_from: Option<NaiveDate>,
    pub start_date_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// An allocated member with its display name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberAllocationView {
    pub member_id: i64,
    pub member_name: String,
}

/// Fully assembled project response
///
/// Carries the derived risk level and directory-enriched display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub forecast_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub total_budget_cents: i64,
    pub description: Option<String>,
    pub manager_id: i64,
    pub manager_name: String,
    pub status: ProjectStatus,
    pub risk_level: RiskLevel,
    pub allocated_members: Vec<MemberAllocationView>,
}

/// Project domain service
pub struct ProjectService {
    repository: Arc<dyn ProjectRepository>,
    directory: Arc<dyn MemberDirectory>,
    allocation_rules: AllocationRules,
    /// Serializes quota-check + save so concurrent allocation requests
    /// cannot both pass the active-project count before either commits.
    allocation_guard: Mutex<()>,
}

impl ProjectService {
    /// Create the service over its collaborators
    pub fn new(repository: Arc<dyn ProjectRepository>, directory: Arc<dyn MemberDirectory>) -> Self {
        let allocation_rules = AllocationRules::new(directory.clone(), repository.clone());
        Self {
            repository,
            directory,
            allocation_rules,
            allocation_guard: Mutex::new(()),
        }
    }

    /// Create a project
    ///
    /// The manager must resolve in the member directory; a failed lookup
    /// aborts creation. The starting status is taken as-is, without
    /// consulting the transition predicate (no prior state exists).
    pub async fn create(&self, request: ProjectCreate) -> Result<ProjectView> {
        validate_name(&request.name)?;
        validate_budget(request.total_budget_cents)?;

        let status = match &request.status {
            Some(s) => parse_status(s)?,
            None => ProjectStatus::UnderReview,
        };

        self.directory.get_member(request.manager_id).await?;

        let mut project = Project::new(
            request.name,
            request.start_date,
            request.forecast_end_date,
            request.total_budget_cents,
            request.description,
            request.manager_id,
            status,
        );
        project.actual_end_date = request.actual_end_date;

        self.repository.save(&project).await?;
        info!(project_id = %project.id, status = %project.status, "created project");
        Ok(self.enrich(project).await)
    }

    /// Get a project by id
    pub async fn get(&self, id: Uuid) -> Result<ProjectView> {
        let project = self.load(id).await?;
        Ok(self.enrich(project).await)
    }

    /// Filtered, paginated project listing
    pub async fn list(&self, query: ProjectListQuery) -> Result<PagedResult<ProjectView>> {
        let status = match &query.status {
            Some(s) => Some(
                ProjectStatus::parse(s)
                    .ok_or_else(|| Error::Validation(format!("Invalid status filter: '{s}'")))?,
            ),
            None => None,
        };

        let filter = ProjectFilter {
            name_contains: query.name,
            status,
            manager_id: query.manager_id,
            start_date_from: query.start_date_from,
            start_date_to: query.start_date_to,
        };
        let defaults = PageRequest::default();
        let page = PageRequest {
            page: query.page.unwrap_or(defaults.page),
            per_page: query.per_page.unwrap_or(defaults.per_page),
        };

        let result = self.repository.find_all(&filter, &page).await?;
        let mut views = Vec::with_capacity(result.items.len());
        for project in result.items {
            views.push(self.enrich(project).await);
        }
        Ok(PagedResult {
            items: views,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
        })
    }

    /// Apply field-level updates to a project
    ///
    /// Status cannot change through this path; a status value differing
    /// from the current one is rejected. A changed manager is
    /// re-validated against the directory.
    pub async fn update(&self, id: Uuid, request: ProjectUpdate) -> Result<ProjectView> {
        let mut project = self.load(id).await?;

        if let Some(s) = &request.status {
            let requested = ProjectStatus::parse(s)
                .ok_or_else(|| Error::Validation(format!("Invalid status: '{s}'")))?;
            if requested != project.status {
                return Err(Error::Validation(
                    "Status changes must go through the status transition operation".to_string(),
                ));
            }
        }

        if let Some(manager_id) = request.manager_id {
            if manager_id != project.manager_id {
                self.directory.get_member(manager_id).await?;
            }
            project.manager_id = manager_id;
        }

        if let Some(name) = request.name {
            validate_name(&name)?;
            project.name = name;
        }
        if let Some(start_date) = request.start_date {
            project.start_date = start_date;
        }
        if let Some(forecast_end_date) = request.forecast_end_date {
            project.forecast_end_date = forecast_end_date;
        }
        if let Some(actual_end_date) = request.actual_end_date {
            project.actual_end_date = actual_end_date;
        }
        if let Some(budget) = request.total_budget_cents {
            validate_budget(budget)?;
            project.total_budget_cents = budget;
        }
        if let Some(description) = request.description {
            project.description = Some(description);
        }

        self.repository.save(&project).await?;
        Ok(self.enrich(project).await)
    }

    /// Move a project to a new lifecycle status
    ///
    /// Terminal projects reject any further transition, cancellation
    /// included. Closing a project stamps its actual end date when unset.
    pub async fn transition_status(&self, id: Uuid, new_status: &str) -> Result<ProjectView> {
        let mut project = self.load(id).await?;

        let target = parse_status(new_status)?;

        if project.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "project is {} and cannot transition further",
                project.status.label()
            )));
        }
        if !project.status.can_transition_to(target) {
            return Err(Error::InvalidTransition(format!(
                "cannot move from '{}' to '{}'",
                project.status.label(),
                target.label()
            )));
        }

        project.status = target;
        if target == ProjectStatus::Closed && project.actual_end_date.is_none() {
            project.actual_end_date = Some(Utc::now().date_naive());
        }

        self.repository.save(&project).await?;
        info!(project_id = %project.id, status = %project.status, "transitioned project");
        Ok(self.enrich(project).await)
    }

    /// Delete a project when its status allows it
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let project = self.load(id).await?;

        if DELETION_BLOCKED_STATUSES.contains(&project.status) {
            return Err(Error::DeletionNotAllowed(format!(
                "projects with status '{}' cannot be deleted",
                project.status.label()
            )));
        }

        self.repository.delete(project.id).await?;
        info!(project_id = %id, "deleted project");
        Ok(())
    }

    /// Allocate a batch of members to a project
    ///
    /// The whole batch is validated and applied in input order before a
    /// single save; any violation discards the aggregate unsaved.
    pub async fn allocate_members(&self, id: Uuid, member_ids: &[i64]) -> Result<ProjectView> {
        let _guard = self.allocation_guard.lock().await;

        let mut project = self.load(id).await?;
        self.allocation_rules.allocate(&mut project, member_ids).await?;
        self.repository.save(&project).await?;
        info!(project_id = %id, count = member_ids.len(), "allocated members");
        Ok(self.enrich(project).await)
    }

    /// Remove a member's allocation from a project
    pub async fn deallocate_member(&self, id: Uuid, member_id: i64) -> Result<()> {
        let mut project = self.load(id).await?;
        self.allocation_rules.deallocate(&mut project, member_id)?;
        self.repository.save(&project).await?;
        info!(project_id = %id, member_id, "deallocated member");
        Ok(())
    }

    /// List a project's allocated members with display names
    pub async fn allocated_members(&self, id: Uuid) -> Result<Vec<MemberAllocationView>> {
        let project = self.load(id).await?;
        Ok(self.member_views(&project).await)
    }

    async fn load(&self, id: Uuid) -> Result<Project> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(Error::ProjectNotFound(id))
    }

    /// Assemble the response view for a project
    ///
    /// Risk is recomputed from the current budget and schedule. Name
    /// lookups degrade to a placeholder per field instead of failing.
    async fn enrich(&self, project: Project) -> ProjectView {
        let manager_name = self.display_name(project.manager_id).await;
        let allocated_members = self.member_views(&project).await;
        let risk_level = project.risk_level();

        ProjectView {
            id: project.id,
            name: project.name,
            start_date: project.start_date,
            forecast_end_date: project.forecast_end_date,
            actual_end_date: project.actual_end_date,
            total_budget_cents: project.total_budget_cents,
            description: project.description,
            manager_id: project.manager_id,
            manager_name,
            status: project.status,
            risk_level,
            allocated_members,
        }
    }

    async fn member_views(&self, project: &Project) -> Vec<MemberAllocationView> {
        let mut views = Vec::with_capacity(project.allocations.len());
        for allocation in &project.allocations {
            views.push(MemberAllocationView {
                member_id: allocation.member_id,
                member_name: self.display_name(allocation.member_id).await,
            });
        }
        views
    }

    async fn display_name(&self, member_id: i64) -> String {
        match self.directory.get_member(member_id).await {
            Ok(member) => member.name,
            Err(e) => {
                warn!(member_id, error = %e, "member name lookup failed, using placeholder");
                NAME_UNAVAILABLE.to_string()
            }
        }
    }
}

fn parse_status(s: &str) -> Result<ProjectStatus> {
    ProjectStatus::parse(s).ok_or_else(|| Error::InvalidTransition(format!("Invalid status: '{s}'")))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("Project name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_budget(cents: i64) -> Result<()> {
    if cents < 0 {
        return Err(Error::Validation(format!(
            "Total budget must be non-negative, got {cents} cents"
        )));
    }
    Ok(())
}
