//! Portfolio reporting
//!
//! Aggregates the whole portfolio into summary figures. The aggregation
//! itself is a pure function over the project list; `ReportService`
//! feeds it from the repository.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::projects::{Project, ProjectRepository, ProjectStatus};
use crate::error::Result;

/// Portfolio-wide summary figures
///
/// Status maps are keyed by display label and omit statuses with no
/// projects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Project count per status
    pub projects_by_status: HashMap<String, u64>,
    /// Summed budget in cents per status
    pub budget_by_status: HashMap<String, i64>,
    /// Mean days from start to actual end over closed projects with an
    /// end date, 0.0 when there are none
    pub average_closed_duration_days: f64,
    /// Distinct members allocated anywhere in the portfolio
    pub unique_members_allocated: u64,
}

/// Compute summary figures over a set of projects
pub fn summarize(projects: &[Project]) -> PortfolioSummary {
    let mut projects_by_status: HashMap<String, u64> = HashMap::new();
    let mut budget_by_status: HashMap<String, i64> = HashMap::new();
    let mut members: HashSet<i64> = HashSet::new();
    let mut closed_duration_days: i64 = 0;
    let mut closed_count: u64 = 0;

    for project in projects {
        let label = project.status.label().to_string();
        *projects_by_status.entry(label.clone()).or_insert(0) += 1;
        *budget_by_status.entry(label).or_insert(0) += project.total_budget_cents;

        for allocation in &project.allocations {
            members.insert(allocation.member_id);
        }

        if project.status == ProjectStatus::Closed {
            if let Some(end) = project.actual_end_date {
                closed_duration_days += (end - project.start_date).num_days();
                closed_count += 1;
            }
        }
    }

    let average_closed_duration_days = if closed_count == 0 {
        0.0
    } else {
        closed_duration_days as f64 / closed_count as f64
    };

    PortfolioSummary {
        projects_by_status,
        budget_by_status,
        average_closed_duration_days,
        unique_members_allocated: members.len() as u64,
    }
}

/// Reporting service over the project repository
pub struct ReportService {
    repository: Arc<dyn ProjectRepository>,
}

impl ReportService {
    pub fn new(repository: Arc<dyn ProjectRepository>) -> Self {
        Self { repository }
    }

    /// Summarize every project in the portfolio
    pub async fn portfolio_summary(&self) -> Result<PortfolioSummary> {
        let projects = self.repository.list_all().await?;
        Ok(summarize(&projects))
    }
}
