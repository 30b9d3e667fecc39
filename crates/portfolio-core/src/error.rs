//! Error types for Portfolio

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using Portfolio's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Portfolio error types
///
/// The first six variants are the business-rule failures surfaced to
/// callers; the remainder cover storage, parsing, and configuration edges.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Project with id '{0}' not found")]
    ProjectNotFound(Uuid),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Project cannot be deleted: {0}")]
    DeletionNotAllowed(String),

    #[error("Allocation rule violated: {0}")]
    AllocationViolation(String),

    #[error("Member directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised by a business rule check, as opposed to
    /// infrastructure failures.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_)
                | Self::InvalidTransition(_)
                | Self::DeletionNotAllowed(_)
                | Self::AllocationViolation(_)
                | Self::Validation(_)
        )
    }
}
