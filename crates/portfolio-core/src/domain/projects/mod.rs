//! Project domain
//!
//! The project aggregate and its lifecycle, risk classification,
//! allocation rules, persistence, and the orchestrating service.

pub mod allocation;
pub mod entity;
pub mod repository;
pub mod repository_trait;
pub mod risk;
pub mod service;

pub use allocation::{AllocationRules, MAX_ACTIVE_PROJECTS_PER_MEMBER, MAX_BATCH_SIZE};
pub use entity::{Allocation, Project, ProjectStatus, RiskLevel};
pub use repository::SqliteProjectRepository;
pub use repository_trait::{PageRequest, PagedResult, ProjectFilter, ProjectRepository};
pub use service::{
    MemberAllocationView, ProjectCreate, ProjectListQuery, ProjectService, ProjectUpdate,
    ProjectView,
};
