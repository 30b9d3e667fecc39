//! Portfolio Core Library
//!
//! This crate provides the core functionality for Portfolio, including:
//! - Project lifecycle state machine and risk classification
//! - Member allocation rules with quota enforcement
//! - Portfolio summary reporting
//! - Storage (SQLite via sqlx)
//! - Member directory integration (external HTTP lookup)

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::members::{MemberDirectory, MemberRecord};
    pub use crate::domain::projects::{
        Project, ProjectRepository, ProjectService, ProjectStatus, RiskLevel,
    };
    pub use crate::domain::reports::{PortfolioSummary, ReportService};
    pub use crate::error::{Error, Result};
}
