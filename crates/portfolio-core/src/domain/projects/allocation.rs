//! Member allocation rules
//!
//! Validates and applies member-to-project allocation and deallocation.
//! Rules mutate the in-memory aggregate only; persisting (or discarding)
//! the result is the caller's job, which is what gives a failed batch
//! whole-batch abort semantics.

use std::sync::Arc;

use tracing::debug;

use crate::domain::members::MemberDirectory;
use crate::error::{Error, Result};

use super::entity::{Project, ProjectStatus};
use super::repository_trait::ProjectRepository;

/// Largest allocation batch accepted in one call
pub const MAX_BATCH_SIZE: usize = 10;

/// Most active projects a member may be allocated to at once
pub const MAX_ACTIVE_PROJECTS_PER_MEMBER: usize = 3;

/// Statuses that do not count toward the active-project quota
pub const QUOTA_EXCLUDED_STATUSES: [ProjectStatus; 2] =
    [ProjectStatus::Closed, ProjectStatus::Cancelled];

/// Allocation and deallocation rule set
pub struct AllocationRules {
    directory: Arc<dyn MemberDirectory>,
    repository: Arc<dyn ProjectRepository>,
}

impl AllocationRules {
    /// Create the rule set over its collaborators
    pub fn new(directory: Arc<dyn MemberDirectory>, repository: Arc<dyn ProjectRepository>) -> Self {
        Self {
            directory,
            repository,
        }
    }

    /// Validate and apply an allocation batch to the aggregate
    ///
    /// Members are validated and applied strictly in input order. The
    /// batch size is checked before any directory call. Any violation
    /// aborts immediately with the aggregate only mutated in memory, so
    /// discarding it without a save yields whole-batch atomicity.
    pub async fn allocate(&self, project: &mut Project, member_ids: &[i64]) -> Result<()> {
        if member_ids.is_empty() || member_ids.len() > MAX_BATCH_SIZE {
            return Err(Error::AllocationViolation(format!(
                "must allocate between 1 and {MAX_BATCH_SIZE} members per batch, got {}",
                member_ids.len()
            )));
        }

        for &member_id in member_ids {
            let member = self.directory.get_member(member_id).await?;

            if !member.is_employee() {
                return Err(Error::AllocationViolation(format!(
                    "member {member_id} has role '{}' and cannot be allocated",
                    member.role
                )));
            }

            // Covers both persisted allocations and earlier members of
            // this batch, which are already on the aggregate.
            if project.has_allocation(member_id)
                || self.repository.allocation_exists(project.id, member_id).await?
            {
                return Err(Error::AllocationViolation(format!(
                    "member {member_id} is already allocated to this project"
                )));
            }

            let active_count = self
                .repository
                .find_active_projects_for_member(member_id, &QUOTA_EXCLUDED_STATUSES)
                .await?
                .len();
            if active_count >= MAX_ACTIVE_PROJECTS_PER_MEMBER {
                return Err(Error::AllocationViolation(format!(
                    "member {member_id} is already allocated to {active_count} active projects"
                )));
            }

            debug!(project_id = %project.id, member_id, "allocating member");
            project.add_allocation(member_id);
        }

        Ok(())
    }

    /// Remove a member's allocation from the aggregate
    pub fn deallocate(&self, project: &mut Project, member_id: i64) -> Result<()> {
        if !project.remove_allocation(member_id) {
            return Err(Error::AllocationViolation(format!(
                "member {member_id} is not allocated to this project"
            )));
        }
        debug!(project_id = %project.id, member_id, "deallocated member");
        Ok(())
    }
}
