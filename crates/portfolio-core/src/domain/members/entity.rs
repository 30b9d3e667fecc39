//! Member records from the external directory

use serde::{Deserialize, Serialize};

/// Role required for a member to be allocated to a project
pub const EMPLOYEE_ROLE: &str = "employee";

/// Read-only view of a member held by the external directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// External member id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Role, e.g. "employee" or "manager"
    pub role: String,
}

impl MemberRecord {
    /// Create a new member record
    pub fn new(id: i64, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
        }
    }

    /// Whether this member holds the employee role, case-insensitively
    pub fn is_employee(&self) -> bool {
        self.role.eq_ignore_ascii_case(EMPLOYEE_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_employee_case_insensitive() {
        assert!(MemberRecord::new(1, "Ana", "employee").is_employee());
        assert!(MemberRecord::new(1, "Ana", "Employee").is_employee());
        assert!(MemberRecord::new(1, "Ana", "EMPLOYEE").is_employee());
        assert!(!MemberRecord::new(1, "Ana", "manager").is_employee());
        assert!(!MemberRecord::new(1, "Ana", "").is_employee());
    }
}
