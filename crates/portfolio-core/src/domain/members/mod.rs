//! Member directory domain
//!
//! Members live in an external directory; this module holds the read-only
//! record type and the lookup collaborator interface.

pub mod directory;
pub mod entity;

pub use directory::{HttpMemberDirectory, MemberDirectory, StaticMemberDirectory};
pub use entity::{MemberRecord, EMPLOYEE_ROLE};
