// GitHub API response types.
// Strict wire schema for the endpoints the stats pipeline reads, plus the trimmed domain records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type string GitHub uses for pushes.
pub const PUSH_EVENT: &str = "PushEvent";

/// Login reference embedded in repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRef {
    pub login: String,
}

/// Repository as returned by `/user/repos` and `/users/{name}/repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: OwnerRef,
    pub language: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
}

/// The fields of a repository the aggregation engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub owner_login: String,
    pub language: Option<String>,
    /// Repository size as reported by GitHub (kilobytes, used as a weight).
    pub size_bytes: u64,
    pub star_count: u64,
    pub fork_count: u64,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub is_fork: bool,
    pub is_private: bool,
}

impl From<Repository> for RepoSummary {
    fn from(repo: Repository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            owner_login: repo.owner.login,
            language: repo.language,
            size_bytes: repo.size,
            star_count: repo.stargazers_count,
            fork_count: repo.forks_count,
            pushed_at: repo.pushed_at,
            updated_at: repo.updated_at,
            is_fork: repo.fork,
            is_private: repo.private,
        }
    }
}

/// Commit reference inside a push payload. Only its presence is counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushCommit {
    pub sha: Option<String>,
}

/// Event payload, reduced to the commit list push events carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPayload {
    pub commits: Option<Vec<PushCommit>>,
}

/// Public event as returned by `/users/{name}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

/// The fields of an event the aggregation engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: String,
    pub created_at: DateTime<Utc>,
    /// Commits in a push; `None` when the payload carried none.
    pub commit_count: Option<u32>,
}

impl EventRecord {
    pub fn is_push(&self) -> bool {
        self.event_type == PUSH_EVENT
    }
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        let commit_count = event
            .payload
            .commits
            .map(|commits| commits.len() as u32)
            .filter(|&n| n > 0);
        Self {
            event_type: event.event_type,
            created_at: event.created_at,
            commit_count,
        }
    }
}

/// Profile as returned by `/user` or `/users/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub login: String,
    #[serde(default)]
    pub public_repos: u64,
    /// Only present on the authenticated `/user` endpoint.
    pub total_private_repos: Option<u64>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_gists: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `/search/issues` response; only the total is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTotal {
    #[serde(default)]
    pub total_count: u64,
}

/// Byte counts per language from `/repos/{owner}/{repo}/languages`.
pub type LanguageBreakdown = HashMap<String, i64>;

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}
