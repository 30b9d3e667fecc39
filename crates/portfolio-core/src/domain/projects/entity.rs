//! Project aggregate and related types
//!
//! Defines the Project entity, its owned Allocation set, the status
//! lifecycle enum, and the derived risk level.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Project status lifecycle
///
/// Statuses carry a sequential order used for transition validation:
/// a project may only advance to the next status in order, except for
/// cancellation which is reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Initial review of the proposal
    UnderReview,
    /// Review finished, awaiting approval
    ReviewComplete,
    /// Review approved
    ReviewApproved,
    /// Project kicked off
    Started,
    /// Planning done
    Planned,
    /// Execution in progress
    InProgress,
    /// Finished
    Closed,
    /// Cancelled (terminal, reachable from anywhere)
    Cancelled,
}

impl ProjectStatus {
    /// All statuses in lifecycle order
    pub const ALL: [ProjectStatus; 8] = [
        Self::UnderReview,
        Self::ReviewComplete,
        Self::ReviewApproved,
        Self::Started,
        Self::Planned,
        Self::InProgress,
        Self::Closed,
        Self::Cancelled,
    ];

    /// Sequential order used for transition validation
    pub fn order(&self) -> u8 {
        match self {
            Self::UnderReview => 0,
            Self::ReviewComplete => 1,
            Self::ReviewApproved => 2,
            Self::Started => 3,
            Self::Planned => 4,
            Self::InProgress => 5,
            Self::Closed => 6,
            Self::Cancelled => 7,
        }
    }

    /// Create from string representation
    ///
    /// Accepts the wire form (`in_progress`) or the display label
    /// (`In Progress`), case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "under_review" => Some(Self::UnderReview),
            "review_complete" => Some(Self::ReviewComplete),
            "review_approved" => Some(Self::ReviewApproved),
            "started" => Some(Self::Started),
            "planned" => Some(Self::Planned),
            "in_progress" => Some(Self::InProgress),
            "closed" => Some(Self::Closed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnderReview => "under_review",
            Self::ReviewComplete => "review_complete",
            Self::ReviewApproved => "review_approved",
            Self::Started => "started",
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label, used as the grouping key in portfolio reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderReview => "Under Review",
            Self::ReviewComplete => "Review Complete",
            Self::ReviewApproved => "Review Approved",
            Self::Started => "Started",
            Self::Planned => "Planned",
            Self::InProgress => "In Progress",
            Self::Closed => "Closed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Check whether a transition to `target` is a legal move
    ///
    /// Cancellation is always a legal target; any other move must be to
    /// the next status in order. Self-transitions are never legal.
    pub fn can_transition_to(&self, target: ProjectStatus) -> bool {
        if target == Self::Cancelled {
            return true;
        }
        target.order() == self.order() + 1
    }

    /// Terminal statuses have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Active for allocation-quota purposes: neither closed nor cancelled
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk tier derived from budget and schedule, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member allocated to a project
///
/// Owned exclusively by its Project; removing it from the project's
/// allocation set deletes it. The member id references the external
/// directory and is not validated locally beyond allocation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique allocation identifier
    pub id: Uuid,
    /// External member id
    pub member_id: i64,
}

impl Allocation {
    /// Create a new allocation for a member
    pub fn new(member_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
        }
    }
}

/// Project aggregate root
///
/// Budgets are integer cents so per-status accumulation stays exact.
/// The risk level is derived on every read and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    pub id: Uuid,
    /// Project name
    pub name: String,
    /// Start date
    pub start_date: NaiveDate,
    /// Forecast end date
    pub forecast_end_date: NaiveDate,
    /// Actual end date, set when the project closes
    pub actual_end_date: Option<NaiveDate>,
    /// Total budget in cents, non-negative
    pub total_budget_cents: i64,
    /// Optional description
    pub description: Option<String>,
    /// Manager id, referencing the external member directory
    pub manager_id: i64,
    /// Lifecycle status
    pub status: ProjectStatus,
    /// Allocated members, unique by member id
    pub allocations: Vec<Allocation>,
}

impl Project {
    /// Create a new project
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        start_date: NaiveDate,
        forecast_end_date: NaiveDate,
        total_budget_cents: i64,
        description: Option<String>,
        manager_id: i64,
        status: ProjectStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            start_date,
            forecast_end_date,
            actual_end_date: None,
            total_budget_cents,
            description,
            manager_id,
            status,
            allocations: Vec::new(),
        }
    }

    /// Derive the current risk level from budget and schedule
    pub fn risk_level(&self) -> RiskLevel {
        super::risk::classify(
            self.total_budget_cents,
            Some(self.start_date),
            Some(self.forecast_end_date),
        )
    }

    /// Check whether a member is allocated to this project
    pub fn has_allocation(&self, member_id: i64) -> bool {
        self.allocations.iter().any(|a| a.member_id == member_id)
    }

    /// Add an allocation for a member
    ///
    /// Callers must have checked uniqueness; duplicates are ignored so
    /// the one-allocation-per-member invariant cannot be broken here.
    pub fn add_allocation(&mut self, member_id: i64) {
        if !self.has_allocation(member_id) {
            self.allocations.push(Allocation::new(member_id));
        }
    }

    /// Remove the allocation for a member, returning whether one existed
    pub fn remove_allocation(&mut self, member_id: i64) -> bool {
        let before = self.allocations.len();
        self.allocations.retain(|a| a.member_id != member_id);
        self.allocations.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_project(status: ProjectStatus) -> Project {
        Project::new(
            "Migration".to_string(),
            date(2024, 1, 1),
            date(2024, 3, 1),
            5_000_00,
            None,
            1,
            status,
        )
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(ProjectStatus::parse("under_review"), Some(ProjectStatus::UnderReview));
        assert_eq!(ProjectStatus::parse("Under Review"), Some(ProjectStatus::UnderReview));
        assert_eq!(ProjectStatus::parse("IN_PROGRESS"), Some(ProjectStatus::InProgress));
        assert_eq!(ProjectStatus::parse("in progress"), Some(ProjectStatus::InProgress));
        assert_eq!(ProjectStatus::parse("cancelled"), Some(ProjectStatus::Cancelled));
        assert_eq!(ProjectStatus::parse("bogus"), None);
    }

    #[test]
    fn test_cancellation_always_a_legal_target() {
        for status in ProjectStatus::ALL {
            assert!(
                status.can_transition_to(ProjectStatus::Cancelled),
                "{status} should allow cancellation"
            );
        }
    }

    #[test]
    fn test_only_next_in_order_is_legal() {
        for status in ProjectStatus::ALL {
            if status.is_terminal() {
                continue;
            }
            for target in ProjectStatus::ALL {
                if target == ProjectStatus::Cancelled {
                    continue;
                }
                let expected = target.order() == status.order() + 1;
                assert_eq!(
                    status.can_transition_to(target),
                    expected,
                    "{status} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_no_self_transition() {
        for status in ProjectStatus::ALL {
            if status == ProjectStatus::Cancelled {
                continue;
            }
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ProjectStatus::Closed.is_terminal());
        assert!(ProjectStatus::Cancelled.is_terminal());
        assert!(!ProjectStatus::InProgress.is_terminal());
        assert!(ProjectStatus::UnderReview.is_active());
    }

    #[test]
    fn test_allocation_uniqueness() {
        let mut project = sample_project(ProjectStatus::Started);
        project.add_allocation(101);
        project.add_allocation(101);
        assert_eq!(project.allocations.len(), 1);
        assert!(project.has_allocation(101));
    }

    #[test]
    fn test_remove_allocation() {
        let mut project = sample_project(ProjectStatus::Started);
        project.add_allocation(101);
        assert!(project.remove_allocation(101));
        assert!(!project.remove_allocation(101));
        assert!(project.allocations.is_empty());
    }

    #[test]
    fn test_status_labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            ProjectStatus::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels.len(), ProjectStatus::ALL.len());
    }
}
