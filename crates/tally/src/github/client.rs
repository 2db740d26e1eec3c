//! GitHub API client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use octocrab::Octocrab;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use super::convert::{
    to_commit_record, to_contributor, to_owner_profile, to_repository_ref, to_team_ref,
    to_user_ref,
};
use super::error::{GitHubError, is_not_found_error, is_pending};
use super::types::{GhAccount, GhCommit, GhContributorStats, GhOwner, GhRepository, GhTeam};
use crate::api::{
    self, ApiClient, ApiError, CommitQuery, CommitRecord, Contributor, OwnerKind, OwnerProfile,
    Page, PageRequest, RateLimitInfo, RepositoryRef, TeamRef, UserRef,
};
use crate::retry::{RetryConfig, with_retry};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// Pagination information extracted from GitHub's Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/organizations/123/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel)
            && let Some(page_num) = extract_page_from_url(url)
        {
            match rel_type {
                "last" => info.last_page = Some(page_num),
                "next" => info.next_page = Some(page_num),
                _ => {}
            }
        }
    }

    info
}

/// Extract the page parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Build a `RateLimited` error from throttling response headers, if the
/// headers say this response was a throttle rather than a permission error.
fn rate_limit_from_headers(headers: &HeaderMap) -> Option<GitHubError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let exhausted = header("x-ratelimit-remaining") == Some("0");
    let retry_after = header("retry-after").and_then(|v| v.trim().parse::<i64>().ok());

    if !exhausted && retry_after.is_none() {
        return None;
    }

    let reset_at = header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        .or_else(|| retry_after.map(|secs| Utc::now() + Duration::seconds(secs)))
        .unwrap_or_else(Utc::now);

    Some(GitHubError::RateLimited { reset_at })
}

/// Result of a raw GET.
#[derive(Debug)]
pub enum RawResponse<T> {
    /// 200 with a decoded body.
    Fetched { data: T, pagination: LinkPagination },
    /// 202: the server is still preparing the resource.
    Accepted,
    /// 204, or 409 for an empty repository.
    Empty,
}

/// Create an authenticated Octocrab instance.
pub fn create_client(token: &str, api_url: &str) -> Result<Octocrab, GitHubError> {
    let builder = Octocrab::builder().personal_token(token.to_string());
    let builder = if api_url == DEFAULT_API_URL {
        builder
    } else {
        builder.base_uri(api_url)?
    };
    Ok(builder.build()?)
}

/// GitHub API client implementing [`ApiClient`].
///
/// Typed single-object lookups go through octocrab. Collection endpoints go
/// through a shared reqwest client so the Link header and non-200 success
/// codes are visible.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
    token: Arc<String>,
    http_client: reqwest::Client,
    api_url: Arc<String>,
    retry: RetryConfig,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client for api.github.com.
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        Self::with_api_url(token, DEFAULT_API_URL)
    }

    /// Create a client for a GitHub Enterprise (or mock) API root.
    pub fn with_api_url(token: &str, api_url: &str) -> Result<Self, GitHubError> {
        let api_url = api_url.trim_end_matches('/');
        let client = create_client(token, api_url)?;
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            inner: Arc::new(client),
            token: Arc::new(token.to_string()),
            http_client,
            api_url: Arc::new(api_url.to_string()),
            retry: RetryConfig::default(),
        })
    }

    /// Override the backoff used while statistics are being computed.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    /// GET `route` with query parameters, decoding a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        route: &str,
        query: &[(&str, String)],
    ) -> Result<RawResponse<T>, GitHubError> {
        let url = format!("{}{}", self.api_url, route);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Authorization", format!("Bearer {}", self.token.as_str()))
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();

        match status {
            StatusCode::OK => {
                let pagination = headers
                    .get("link")
                    .and_then(|v| v.to_str().ok())
                    .map(parse_link_header)
                    .unwrap_or_default();

                let data: T = response
                    .json()
                    .await
                    .map_err(|e| GitHubError::Internal(format!("JSON parse error: {}", e)))?;
                Ok(RawResponse::Fetched { data, pagination })
            }
            StatusCode::ACCEPTED => Ok(RawResponse::Accepted),
            StatusCode::NO_CONTENT | StatusCode::CONFLICT => Ok(RawResponse::Empty),
            StatusCode::UNAUTHORIZED => Err(GitHubError::AuthRequired),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                Err(rate_limit_from_headers(&headers)
                    .unwrap_or_else(|| GitHubError::Forbidden(route.to_string())))
            }
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound(route.to_string())),
            _ => Err(GitHubError::UnexpectedStatus {
                status: status.as_u16(),
                route: route.to_string(),
            }),
        }
    }

    /// Fetch one page of a collection endpoint.
    async fn get_page<T: DeserializeOwned>(
        &self,
        route: &str,
        mut query: Vec<(&str, String)>,
        page: PageRequest,
    ) -> Result<Page<T>, GitHubError> {
        query.push(("per_page", page.per_page.to_string()));
        query.push(("page", page.page.to_string()));

        match self.get_json::<Vec<T>>(route, &query).await? {
            RawResponse::Fetched { data, pagination } => Ok(Page::new(data, pagination.next_page)),
            RawResponse::Empty => Ok(Page::empty()),
            RawResponse::Accepted => Err(GitHubError::StatsPending(route.to_string())),
        }
    }

    async fn get_owner(&self, route: &str) -> Result<GhOwner, GitHubError> {
        Ok(self.inner.get(route, None::<&()>).await?)
    }
}

#[async_trait]
impl ApiClient for GitHubClient {
    async fn get_rate_limit(&self) -> api::Result<RateLimitInfo> {
        let rate_limit = self
            .inner
            .ratelimit()
            .get()
            .await
            .map_err(GitHubError::from)?;
        let core = &rate_limit.resources.core;

        Ok(RateLimitInfo {
            limit: core.limit,
            remaining: core.remaining,
            reset_at: DateTime::from_timestamp(core.reset as i64, 0).unwrap_or_else(Utc::now),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get_owner_profile(&self, name: &str) -> api::Result<OwnerProfile> {
        match self.get_owner(&format!("/orgs/{}", name)).await {
            Ok(org) => return Ok(to_owner_profile(org, OwnerKind::Organization)),
            Err(GitHubError::Api(e)) if is_not_found_error(&e) => {
                tracing::debug!(name, "Not an organization, trying user");
            }
            Err(e) => return Err(e.into()),
        }

        match self.get_owner(&format!("/users/{}", name)).await {
            Ok(user) => Ok(to_owner_profile(user, OwnerKind::User)),
            Err(GitHubError::Api(e)) if is_not_found_error(&e) => {
                Err(ApiError::not_found(format!("organization or user {}", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_repositories(
        &self,
        org: &str,
        page: PageRequest,
    ) -> api::Result<Page<RepositoryRef>> {
        let route = format!("/orgs/{}/repos", org);
        let page = self
            .get_page::<GhRepository>(&route, vec![("type", "sources".to_string())], page)
            .await?;
        Ok(page.map(to_repository_ref))
    }

    async fn list_user_repositories(
        &self,
        user: &str,
        page: PageRequest,
    ) -> api::Result<Page<RepositoryRef>> {
        let route = format!("/users/{}/repos", user);
        let page = self
            .get_page::<GhRepository>(&route, vec![("type", "owner".to_string())], page)
            .await?;
        Ok(page.map(to_repository_ref))
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitQuery,
        page: PageRequest,
    ) -> api::Result<Page<CommitRecord>> {
        let route = format!("/repos/{}/{}/commits", owner, repo);

        let mut params = Vec::with_capacity(5);
        if let Some(since) = query.since {
            params.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(until) = query.until {
            params.push(("until", until.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        if let Some(author) = &query.author {
            params.push(("author", author.clone()));
        }

        let page = match self.get_page::<GhCommit>(&route, params, page).await {
            Ok(page) => page,
            Err(GitHubError::NotFound(_)) => {
                return Err(ApiError::not_found(format!(
                    "repository {}/{}",
                    owner, repo
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Page::new(
            page.items.into_iter().map(to_commit_record).collect(),
            page.next_page,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn list_contributor_stats(&self, owner: &str, repo: &str) -> api::Result<Vec<Contributor>> {
        let route = format!("/repos/{}/{}/stats/contributors", owner, repo);
        let label = format!("{}/{}", owner, repo);

        let fetch = || async {
            match self.get_json::<Vec<GhContributorStats>>(&route, &[]).await? {
                RawResponse::Fetched { data, .. } => Ok::<_, GitHubError>(data),
                RawResponse::Empty => Ok(Vec::new()),
                RawResponse::Accepted => Err(GitHubError::StatsPending(label.clone())),
            }
        };

        let stats = match with_retry(fetch, is_pending, self.retry.clone(), &label).await {
            Ok(stats) => stats,
            Err(GitHubError::NotFound(_)) => {
                return Err(ApiError::not_found(format!("repository {}", label)));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(stats
            .into_iter()
            .map(|s| to_contributor(repo, s))
            .collect())
    }

    async fn list_teams(&self, org: &str, page: PageRequest) -> api::Result<Page<TeamRef>> {
        let route = format!("/orgs/{}/teams", org);
        let page = self.get_page::<GhTeam>(&route, Vec::new(), page).await?;
        Ok(page.map(to_team_ref))
    }

    async fn list_team_members(
        &self,
        org_id: u64,
        team_id: u64,
        page: PageRequest,
    ) -> api::Result<Page<UserRef>> {
        let route = format!("/organizations/{}/team/{}/members", org_id, team_id);
        let page = self.get_page::<GhAccount>(&route, Vec::new(), page).await?;
        Ok(page.map(to_user_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_github_client_implements_api_client() {
        fn assert_api_client<T: ApiClient + Clone + 'static>() {}
        assert_api_client::<GitHubClient>();
    }

    #[test]
    fn test_parse_link_header_full() {
        let header = r#"<https://api.github.com/organizations/5430905/repos?per_page=100&page=2>; rel="next", <https://api.github.com/organizations/5430905/repos?per_page=100&page=3>; rel="last""#;

        let info = parse_link_header(header);
        assert_eq!(info.next_page, Some(2));
        assert_eq!(info.last_page, Some(3));
    }

    #[test]
    fn test_parse_link_header_last_page_has_no_next() {
        let header = r#"<https://api.github.com/repositories/1/commits?per_page=100&page=1>; rel="first", <https://api.github.com/repositories/1/commits?per_page=100&page=4>; rel="prev""#;

        let info = parse_link_header(header);
        assert_eq!(info.next_page, None);
        assert_eq!(info.last_page, None);
    }

    #[test]
    fn test_parse_link_header_empty() {
        assert_eq!(parse_link_header(""), LinkPagination::default());
    }

    #[test]
    fn test_extract_page_from_url() {
        assert_eq!(
            extract_page_from_url("https://api.github.com/repos?per_page=100&page=3"),
            Some(3)
        );
        assert_eq!(
            extract_page_from_url("https://api.github.com/repos?per_page=100"),
            None
        );
        assert_eq!(extract_page_from_url("https://api.github.com/repos"), None);
    }

    #[test]
    fn test_rate_limit_from_exhausted_quota() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1710000000"));

        match rate_limit_from_headers(&headers) {
            Some(GitHubError::RateLimited { reset_at }) => {
                assert_eq!(reset_at.timestamp(), 1_710_000_000);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_from_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("60"));

        let before = Utc::now();
        match rate_limit_from_headers(&headers) {
            Some(GitHubError::RateLimited { reset_at }) => assert!(reset_at > before),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_forbidden_without_throttle_headers_is_not_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        assert!(rate_limit_from_headers(&headers).is_none());
    }
}
