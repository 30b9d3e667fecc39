//! Member directory lookup
//!
//! The directory is an external collaborator that resolves member ids to
//! identity records. Lookups can fail or be unavailable; callers decide
//! whether that hard-fails the operation (validation) or soft-fails into
//! a placeholder (display enrichment).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use crate::error::{Error, Result};

use super::entity::MemberRecord;

/// Default request timeout for directory lookups
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// External member identity lookup
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Resolve a member id to its record
    ///
    /// Fails with [`Error::DirectoryUnavailable`] when the lookup cannot
    /// complete, whether the member is missing or the directory is down.
    async fn get_member(&self, id: i64) -> Result<MemberRecord>;
}

/// HTTP-backed member directory client
#[derive(Debug, Clone)]
pub struct HttpMemberDirectory {
    http_client: HttpClient,
    base_url: String,
}

impl HttpMemberDirectory {
    /// Create a client against the given directory base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build directory client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MemberDirectory for HttpMemberDirectory {
    async fn get_member(&self, id: i64) -> Result<MemberRecord> {
        let url = format!("{}/api/members/{}", self.base_url, id);
        debug!(member_id = id, %url, "looking up member");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::DirectoryUnavailable(format!("lookup for member {id} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::DirectoryUnavailable(format!(
                "lookup for member {id} returned {}",
                response.status()
            )));
        }

        response
            .json::<MemberRecord>()
            .await
            .map_err(|e| Error::DirectoryUnavailable(format!("invalid record for member {id}: {e}")))
    }
}

/// In-process member directory backed by a fixed member set
///
/// Serves tests and offline use. The default roster mirrors the seed data
/// of the external directory's development instance.
#[derive(Debug, Clone, Default)]
pub struct StaticMemberDirectory {
    members: HashMap<i64, MemberRecord>,
}

impl StaticMemberDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory seeded with a small development roster
    pub fn with_sample_members() -> Self {
        let mut directory = Self::new();
        directory.insert(MemberRecord::new(1, "Joan Silva", "manager"));
        directory.insert(MemberRecord::new(2, "Carl Pereira", "manager"));
        directory.insert(MemberRecord::new(101, "Maria Souza", "employee"));
        directory.insert(MemberRecord::new(102, "Peter Costa", "employee"));
        directory.insert(MemberRecord::new(103, "Ana Oliveira", "employee"));
        directory
    }

    /// Add or replace a member record
    pub fn insert(&mut self, member: MemberRecord) {
        self.members.insert(member.id, member);
    }
}

#[async_trait]
impl MemberDirectory for StaticMemberDirectory {
    async fn get_member(&self, id: i64) -> Result<MemberRecord> {
        self.members
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::DirectoryUnavailable(format!("member {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory_lookup() {
        let directory = StaticMemberDirectory::with_sample_members();
        let member = directory.get_member(101).await.expect("member should resolve");
        assert_eq!(member.name, "Maria Souza");
        assert!(member.is_employee());
    }

    #[tokio::test]
    async fn test_static_directory_missing_member() {
        let directory = StaticMemberDirectory::new();
        let err = directory.get_member(999).await.unwrap_err();
        assert!(matches!(err, Error::DirectoryUnavailable(_)));
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn test_http_directory_strips_trailing_slash() {
        let directory = HttpMemberDirectory::new("http://localhost:8081/").unwrap();
        assert_eq!(directory.base_url, "http://localhost:8081");
    }
}
