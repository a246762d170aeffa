//! Domain types: identifiers, directory objects, and the run report.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MembershipError, MembershipResult};

/// Entra object ID of a directory group.
///
/// Only the standard dashed hexadecimal form is accepted; compact or
/// URN-style UUID spellings are rejected so that malformed CLI input
/// surfaces early instead of producing a 404 from Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    /// Parses a dashed-hexadecimal object ID.
    pub fn parse(s: &str) -> MembershipResult<Self> {
        let dashed = s.len() == 36
            && s.bytes()
                .enumerate()
                .all(|(i, b)| match i {
                    8 | 13 | 18 | 23 => b == b'-',
                    _ => b.is_ascii_hexdigit(),
                });
        if !dashed {
            return Err(MembershipError::InvalidGroupId(s.to_string()));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| MembershipError::InvalidGroupId(s.to_string()))
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for GroupId {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Directory group with the fields the traversal needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryGroup {
    /// Entra object ID.
    pub id: GroupId,
    /// Group display name.
    pub display_name: String,
    /// Group description.
    pub description: Option<String>,
    /// Group email address (if mail-enabled).
    pub mail: Option<String>,
    /// Whether this is a security group.
    pub security_enabled: bool,
    /// Whether this group is mail-enabled.
    pub mail_enabled: bool,
}

impl DirectoryGroup {
    /// Parses a group from the Graph API JSON response.
    pub fn from_json(value: &serde_json::Value) -> MembershipResult<Self> {
        let raw_id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MembershipError::Decode("missing group id".into()))?;

        Ok(Self {
            id: GroupId::parse(raw_id)?,
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            description: value
                .get("description")
                .and_then(|v| v.as_str())
                .map(String::from),
            mail: value.get("mail").and_then(|v| v.as_str()).map(String::from),
            security_enabled: value
                .get("securityEnabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            mail_enabled: value
                .get("mailEnabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

/// Directory user with normalized profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Entra object ID.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// User principal name (usually email format).
    pub user_principal_name: String,
    /// Primary email address.
    pub mail: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Department.
    pub department: Option<String>,
    /// Company name.
    pub company_name: Option<String>,
    /// Whether the account is enabled.
    pub account_enabled: bool,
}

impl DirectoryUser {
    /// Parses a user from the Graph API JSON response.
    pub fn from_json(value: &serde_json::Value) -> MembershipResult<Self> {
        Ok(Self {
            id: value
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| MembershipError::Decode("missing user id".into()))?
                .to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            user_principal_name: value
                .get("userPrincipalName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            mail: value.get("mail").and_then(|v| v.as_str()).map(String::from),
            job_title: value
                .get("jobTitle")
                .and_then(|v| v.as_str())
                .map(String::from),
            department: value
                .get("department")
                .and_then(|v| v.as_str())
                .map(String::from),
            company_name: value
                .get("companyName")
                .and_then(|v| v.as_str())
                .map(String::from),
            account_enabled: value
                .get("accountEnabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
        })
    }
}

/// A discovered user plus the provenance of its first discovery.
///
/// Created once per unique user ID; later discoveries through other
/// membership paths never overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's profile.
    pub user: DirectoryUser,
    /// Group through which the user was first discovered.
    pub source_group_id: GroupId,
    /// Display name of that group.
    pub source_group_name: String,
    /// Traversal depth at first discovery.
    pub discovery_depth: u32,
}

/// Per-visited-group entry in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Entra object ID.
    pub id: GroupId,
    /// Display name, when metadata enrichment was requested and succeeded.
    pub display_name: Option<String>,
}

/// Counters and timing for a single resolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Groups whose members were fetched.
    pub groups_processed: u64,
    /// Remote call attempts, counting each retry separately.
    pub api_calls: u64,
    /// Unique users discovered.
    pub users_found: u64,
    /// Per-group failures recorded during traversal.
    pub errors: u64,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Run end time.
    pub finished_at: DateTime<Utc>,
}

impl RunStats {
    /// Wall-clock duration of the run.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Final result of a resolution run.
///
/// Consumers are expected to inspect `errors` rather than assume a
/// zero-error run; partial failures never abort the traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipReport {
    /// Unique users, sorted by display name.
    pub users: Vec<UserRecord>,
    /// Groups visited during traversal, in visit order.
    pub groups: Vec<GroupSummary>,
    /// Run statistics.
    pub stats: RunStats,
    /// Human-readable descriptions of per-group failures.
    pub errors: Vec<String>,
}
