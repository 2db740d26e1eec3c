//! Scripted in-memory API client shared by the integration tests.
//!
//! Every listing is answered from data registered up front. Commit listings
//! honour the query filters and paginate with the requested page size, so
//! the engine sees the same paging behavior it would from the forge.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tally::api::{
    ApiClient, ApiError, CommitQuery, CommitRecord, Contributor, OwnerKind, OwnerProfile, Page,
    PageRequest, RateLimitInfo, RepositoryRef, Result, TeamRef, UserRef, WeekStat,
};

/// Maximum time any aggregation should take in tests.
/// If exceeded, there's likely a hang.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn commit(repo: &str, sha: &str, author: Option<&str>, at: DateTime<Utc>) -> CommitRecord {
    CommitRecord {
        sha: sha.to_string(),
        author_login: author.map(String::from),
        committed_at: Some(at),
        url: format!("https://github.com/acme/{repo}/commit/{sha}"),
    }
}

/// A commit whose listing carried neither a committer nor an author date.
pub fn undated(repo: &str, sha: &str, author: Option<&str>) -> CommitRecord {
    CommitRecord {
        committed_at: None,
        ..commit(repo, sha, author, DateTime::UNIX_EPOCH)
    }
}

pub fn repo(owner: &str, name: &str) -> RepositoryRef {
    RepositoryRef {
        id: name.len() as u64,
        owner: owner.to_string(),
        name: name.to_string(),
        is_fork: false,
        is_archived: false,
    }
}

pub fn fork(owner: &str, name: &str) -> RepositoryRef {
    RepositoryRef {
        is_fork: true,
        ..repo(owner, name)
    }
}

/// Contributor stats with one entry per `(week_start, commits)` pair.
pub fn contributor(login: Option<&str>, repo: &str, weeks: &[(DateTime<Utc>, u64)]) -> Contributor {
    Contributor {
        login: login.map(String::from),
        repo: repo.to_string(),
        weeks: weeks
            .iter()
            .map(|&(week_start, commits)| WeekStat {
                week_start,
                commits,
            })
            .collect(),
    }
}

pub fn rate_limited() -> ApiError {
    ApiError::RateLimited {
        reset_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
    }
}

enum ScriptedPage {
    Items {
        repos: Vec<RepositoryRef>,
        next: Option<u32>,
    },
    Failure(ApiError),
}

#[derive(Default)]
struct Script {
    owners: HashMap<String, OwnerProfile>,
    repo_pages: HashMap<String, Vec<ScriptedPage>>,
    commits: HashMap<String, Vec<CommitRecord>>,
    commit_errors: HashMap<String, ApiError>,
    stats: HashMap<String, Vec<Contributor>>,
    delays: HashMap<String, Duration>,
    teams: HashMap<String, Vec<TeamRef>>,
    members: HashMap<u64, Vec<UserRef>>,
    requests: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory [`ApiClient`]. Clones share the same script and request log.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn with_owner(self, login: &str, kind: OwnerKind) -> Self {
        let id = 1000 + self.lock().owners.len() as u64;
        self.lock().owners.insert(
            login.to_string(),
            OwnerProfile {
                id,
                login: login.to_string(),
                kind,
                avatar_url: None,
            },
        );
        self
    }

    pub fn with_org(self, login: &str) -> Self {
        self.with_owner(login, OwnerKind::Organization)
    }

    pub fn with_user(self, login: &str) -> Self {
        self.with_owner(login, OwnerKind::User)
    }

    /// Register the owner's repositories as consecutive pages.
    pub fn with_repo_pages(self, owner: &str, pages: Vec<Vec<RepositoryRef>>) -> Self {
        let count = pages.len() as u32;
        let scripted = pages
            .into_iter()
            .enumerate()
            .map(|(i, repos)| {
                let number = i as u32 + 1;
                ScriptedPage::Items {
                    repos,
                    next: (number < count).then_some(number + 1),
                }
            })
            .collect();
        self.lock().repo_pages.insert(owner.to_string(), scripted);
        self
    }

    /// Register the owner's repositories on a single page.
    pub fn with_repos(self, owner: &str, names: &[&str]) -> Self {
        let repos = names.iter().map(|name| repo(owner, name)).collect();
        self.with_repo_pages(owner, vec![repos])
    }

    /// Make the last repository page point back at page 1.
    pub fn with_looping_repo_pages(self, owner: &str) -> Self {
        if let Some(ScriptedPage::Items { next, .. }) = self
            .lock()
            .repo_pages
            .get_mut(owner)
            .and_then(|pages| pages.last_mut())
        {
            *next = Some(1);
        }
        self
    }

    /// Make repository page `page` fail with `error`.
    pub fn with_repo_page_error(self, owner: &str, page: u32, error: ApiError) -> Self {
        if let Some(slot) = self
            .lock()
            .repo_pages
            .get_mut(owner)
            .and_then(|pages| pages.get_mut(page as usize - 1))
        {
            *slot = ScriptedPage::Failure(error);
        }
        self
    }

    pub fn with_commits(self, owner: &str, repo: &str, commits: Vec<CommitRecord>) -> Self {
        self.lock()
            .commits
            .insert(format!("{owner}/{repo}"), commits);
        self
    }

    pub fn with_commit_error(self, owner: &str, repo: &str, error: ApiError) -> Self {
        self.lock()
            .commit_errors
            .insert(format!("{owner}/{repo}"), error);
        self
    }

    pub fn with_stats(self, owner: &str, repo: &str, contributors: Vec<Contributor>) -> Self {
        self.lock()
            .stats
            .insert(format!("{owner}/{repo}"), contributors);
        self
    }

    /// Delay every commit listing of a repository.
    pub fn with_delay(self, owner: &str, repo: &str, delay: Duration) -> Self {
        self.lock().delays.insert(format!("{owner}/{repo}"), delay);
        self
    }

    pub fn with_team(self, org: &str, id: u64, slug: &str, members: &[&str]) -> Self {
        {
            let mut script = self.lock();
            script.teams.entry(org.to_string()).or_default().push(TeamRef {
                id,
                slug: slug.to_string(),
                name: slug.to_uppercase(),
            });
            script.members.insert(
                id,
                members
                    .iter()
                    .enumerate()
                    .map(|(i, login)| UserRef {
                        id: i as u64 + 1,
                        login: login.to_string(),
                    })
                    .collect(),
            );
        }
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Number of requests whose log line starts with `prefix`.
    pub fn count_requests(&self, prefix: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    /// Highest number of commit listings that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn record(&self, request: String) {
        self.lock().requests.push(request);
    }

    fn repo_page(&self, owner: &str, page: PageRequest) -> Result<Page<RepositoryRef>> {
        self.record(format!("repos {owner} page={}", page.page));
        let script = self.lock();
        let pages = script
            .repo_pages
            .get(owner)
            .ok_or_else(|| ApiError::not_found(format!("owner {owner}")))?;
        match pages.get(page.page as usize - 1) {
            Some(ScriptedPage::Items { repos, next }) => Ok(Page::new(repos.clone(), *next)),
            Some(ScriptedPage::Failure(error)) => Err(error.clone()),
            None => Ok(Page::last(Vec::new())),
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let per_page = page.per_page.max(1) as usize;
    let start = (page.page as usize - 1) * per_page;
    let chunk: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
    let next = (start + per_page < items.len()).then_some(page.page + 1);
    Page::new(chunk, next)
}

#[async_trait]
impl ApiClient for ScriptedClient {
    async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        Ok(RateLimitInfo {
            limit: 5000,
            remaining: 5000,
            reset_at: Utc::now(),
        })
    }

    async fn get_owner_profile(&self, name: &str) -> Result<OwnerProfile> {
        self.record(format!("owner {name}"));
        self.lock()
            .owners
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("owner {name}")))
    }

    async fn list_repositories(&self, org: &str, page: PageRequest) -> Result<Page<RepositoryRef>> {
        self.repo_page(org, page)
    }

    async fn list_user_repositories(
        &self,
        user: &str,
        page: PageRequest,
    ) -> Result<Page<RepositoryRef>> {
        self.repo_page(user, page)
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        query: &CommitQuery,
        page: PageRequest,
    ) -> Result<Page<CommitRecord>> {
        let key = format!("{owner}/{repo}");
        self.record(format!("commits {key} page={}", page.page));

        let delay = {
            let mut script = self.lock();
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            script.delays.get(&key).copied()
        };
        tokio::time::sleep(delay.unwrap_or(Duration::from_millis(5))).await;

        let mut script = self.lock();
        script.in_flight -= 1;

        if let Some(error) = script.commit_errors.get(&key) {
            return Err(error.clone());
        }
        let commits = script
            .commits
            .get(&key)
            .ok_or_else(|| ApiError::not_found(format!("repository {key}")))?;
        let matching: Vec<CommitRecord> = commits
            .iter()
            .filter(|c| {
                query
                    .since
                    .is_none_or(|since| c.committed_at.is_none_or(|at| at >= since))
            })
            .filter(|c| {
                query
                    .until
                    .is_none_or(|until| c.committed_at.is_none_or(|at| at <= until))
            })
            .filter(|c| {
                query
                    .author
                    .as_ref()
                    .is_none_or(|author| c.author_login.as_ref() == Some(author))
            })
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn list_contributor_stats(&self, owner: &str, repo: &str) -> Result<Vec<Contributor>> {
        let key = format!("{owner}/{repo}");
        self.record(format!("stats {key}"));
        Ok(self.lock().stats.get(&key).cloned().unwrap_or_default())
    }

    async fn list_teams(&self, org: &str, page: PageRequest) -> Result<Page<TeamRef>> {
        self.record(format!("teams {org} page={}", page.page));
        let teams = self.lock().teams.get(org).cloned().unwrap_or_default();
        Ok(paginate(&teams, page))
    }

    async fn list_team_members(
        &self,
        org_id: u64,
        team_id: u64,
        page: PageRequest,
    ) -> Result<Page<UserRef>> {
        self.record(format!("members {org_id}/{team_id} page={}", page.page));
        let members = self
            .lock()
            .members
            .get(&team_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("team {team_id}")))?;
        Ok(paginate(&members, page))
    }
}
