use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::Result;
use super::page::{Page, PageRequest};

/// Rate limit information from a forge.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

/// Whether a name resolved to an organization or a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    Organization,
    User,
}

/// Profile of an organization or user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerProfile {
    /// Numeric account ID (needed for team member lookups).
    pub id: u64,
    /// Account login as the API spells it.
    pub login: String,
    /// Organization or user.
    pub kind: OwnerKind,
    /// Avatar URL (if available).
    pub avatar_url: Option<String>,
}

impl OwnerProfile {
    #[inline]
    pub fn is_organization(&self) -> bool {
        self.kind == OwnerKind::Organization
    }
}

/// A repository listed under an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Forge-specific numeric ID.
    pub id: u64,
    /// Repository owner (user or org).
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Whether the repository is a fork.
    pub is_fork: bool,
    /// Whether the repository is archived.
    pub is_archived: bool,
}

impl RepositoryRef {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A single commit as returned by a commit listing.
///
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Commit SHA.
    pub sha: String,
    /// Login of the linked author account. `None` when the commit email is
    /// not attached to any account.
    pub author_login: Option<String>,
    /// Committer timestamp. Listings occasionally carry commits without
    /// any date; those still count as fetched.
    pub committed_at: Option<DateTime<Utc>>,
    /// Browser URL of the commit (unique per commit).
    pub url: String,
}

/// Commit count for one week of a contributor's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WeekStat {
    /// Start of the week (Sunday 00:00 UTC).
    pub week_start: DateTime<Utc>,
    /// Number of commits authored that week.
    pub commits: u64,
}

/// Weekly commit statistics for one contributor of one repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Contributor {
    /// Contributor login, `None` when the author has no resolvable account.
    pub login: Option<String>,
    /// Repository the statistics belong to.
    pub repo: String,
    /// Per-week commit counts.
    pub weeks: Vec<WeekStat>,
}

impl Contributor {
    /// Total commits across all weeks.
    pub fn total_commits(&self) -> u64 {
        self.weeks.iter().map(|w| w.commits).sum()
    }
}

/// A team inside an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

impl fmt::Display for TeamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.slug)
    }
}

/// A user account reference (team member).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub login: String,
}

/// Filters for a commit listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    /// Only commits at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only commits at or before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Only commits authored by this login.
    pub author: Option<String>,
}

/// Capability for talking to an authenticated forge API.
///
/// One value is constructed per process and handed by reference to every
/// aggregation call. Implementations must be cheap to clone (the aggregation
/// engine hands a clone to every concurrent job).
///
/// # Implementation Notes
///
/// Implementors should:
/// - Return exactly one page per list call; walking is the caller's job
/// - Normalize "no next page" to `Page::next_page == None`
/// - Map missing repositories/orgs to `ApiError::NotFound`
/// - Map throttling to `ApiError::RateLimited`
/// - Own any retry policy (the engine never retries)
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Get current rate limit status.
    async fn get_rate_limit(&self) -> Result<RateLimitInfo>;

    /// Resolve a name to an organization or, failing that, a user.
    async fn get_owner_profile(&self, name: &str) -> Result<OwnerProfile>;

    /// List one page of an organization's source repositories.
    async fn list_repositories(&self, org: &str, page: PageRequest)
    -> Result<Page<RepositoryRef>>;

    /// List one page of a user's repositories.
    async fn list_user_repositories(
        &self,
        user: &str,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>>;

    /// List one page of commits in a repository.
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitQuery,
        page: PageRequest,
    ) -> Result<Page<CommitRecord>>;

    /// Weekly commit statistics for every contributor of a repository.
    ///
    /// A repository without contributors yields an empty list, not an error.
    async fn list_contributor_stats(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>>;

    /// List one page of an organization's teams.
    async fn list_teams(&self, org: &str, page: PageRequest) -> Result<Page<TeamRef>>;

    /// List one page of a team's members.
    async fn list_team_members(
        &self,
        org_id: u64,
        team_id: u64,
        page: PageRequest,
    ) -> Result<Page<UserRef>>;
}
