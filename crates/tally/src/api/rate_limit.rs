use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::errors::Result;
use super::page::{Page, PageRequest};
use super::types::{
    ApiClient, CommitQuery, CommitRecord, Contributor, OwnerProfile, RateLimitInfo,
    RepositoryRef, TeamRef, UserRef,
};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// GitHub allows 5000 requests/hour (~1.4/sec); 10/sec leaves room for bursts
/// while staying well clear of the secondary rate limits.
pub const GITHUB_DEFAULT_RPS: u32 = 10;

fn quota(requests_per_second: u32) -> Quota {
    Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
}

/// A standalone API rate limiter using the governor crate.
///
/// Shared by every clone, so all concurrent jobs draw from one budget.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a rate limiter. A zero rate is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota(requests_per_second))),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

/// A rate-limited wrapper around any [`ApiClient`].
///
/// Every trait method waits for the limiter before delegating, so a fan-out
/// of N jobs never exceeds the configured request rate regardless of N.
///
/// ```ignore
/// use tally::api::RateLimitedClient;
/// use tally::github::GitHubClient;
///
/// let client = GitHubClient::new(token)?;
/// let client = RateLimitedClient::new(client, tally::api::GITHUB_DEFAULT_RPS);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: Option<ApiRateLimiter>,
}

impl<C> RateLimitedClient<C> {
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        Self {
            inner,
            limiter: Some(ApiRateLimiter::new(requests_per_second)),
        }
    }

    /// Wrap `inner` without proactive pacing.
    pub fn unlimited(inner: C) -> Self {
        Self {
            inner,
            limiter: None,
        }
    }

    /// Returns true if requests are paced.
    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for RateLimitedClient<C> {
    async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        // The rate limit endpoint does not count against the quota.
        self.inner.get_rate_limit().await
    }

    async fn get_owner_profile(&self, name: &str) -> Result<OwnerProfile> {
        self.pace().await;
        self.inner.get_owner_profile(name).await
    }

    async fn list_repositories(
        &self,
        org: &str,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>> {
        self.pace().await;
        self.inner.list_repositories(org, page).await
    }

    async fn list_user_repositories(
        &self,
        user: &str,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>> {
        self.pace().await;
        self.inner.list_user_repositories(user, page).await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitQuery,
        page: PageRequest,
    ) -> Result<Page<CommitRecord>> {
        self.pace().await;
        self.inner.list_commits(owner, repo, query, page).await
    }

    async fn list_contributor_stats(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        self.pace().await;
        self.inner.list_contributor_stats(owner, repo).await
    }

    async fn list_teams(&self, org: &str, page: PageRequest) -> Result<Page<TeamRef>> {
        self.pace().await;
        self.inner.list_teams(org, page).await
    }

    async fn list_team_members(
        &self,
        org_id: u64,
        team_id: u64,
        page: PageRequest,
    ) -> Result<Page<UserRef>> {
        self.pace().await;
        self.inner.list_team_members(org_id, team_id, page).await
    }
}
