//! Per-item job bodies run by the fan-out.
//!
//! Each job walks its own inner collection (usually the commits of one
//! repository) and returns one partial result. A failure anywhere inside a
//! job is a job-level failure.

use super::merge::{
    AuthorCounts, CommitCount, CommitTally, ContributorSummary, LoginSet, Merge, RepoContributors,
};
use super::types::FetchJob;
use super::walker::PageWalker;
use crate::api::{self, ApiClient, CommitRecord};

/// Walk every commit matched by `job`, feeding each page to `visit`.
async fn for_each_commit_page<C: ApiClient>(
    client: &C,
    job: &FetchJob,
    per_page: u32,
    mut visit: impl FnMut(Vec<CommitRecord>),
) -> api::Result<()> {
    let query = job.commit_query();
    let (org, repo, query) = (job.org.as_str(), job.repo.as_str(), &query);

    let mut walker =
        PageWalker::new(per_page, move |req| client.list_commits(org, repo, query, req));
    while let Some(page) = walker.next_page().await {
        visit(page.map_err(|failure| failure.source)?.items);
    }
    Ok(())
}

/// Unique commit authors and the number of commits fetched.
pub async fn contributor_summary<C: ApiClient>(
    client: &C,
    job: &FetchJob,
    per_page: u32,
) -> api::Result<ContributorSummary> {
    let mut summary = ContributorSummary::default();
    for_each_commit_page(client, job, per_page, |commits| {
        summary.commits.merge(CommitCount(commits.len() as u64));
        summary
            .contributors
            .extend(commits.into_iter().filter_map(|c| c.author_login));
    })
    .await?;
    Ok(summary)
}

/// Per-author commit counts and the number of commits fetched.
pub async fn commit_tally<C: ApiClient>(
    client: &C,
    job: &FetchJob,
    per_page: u32,
) -> api::Result<CommitTally> {
    let mut tally = CommitTally::default();
    for_each_commit_page(client, job, per_page, |commits| {
        tally.commits.merge(CommitCount(commits.len() as u64));
        let mut authors = AuthorCounts::new();
        for login in commits.into_iter().filter_map(|c| c.author_login) {
            authors.add(login, 1);
        }
        tally.authors.merge(authors);
    })
    .await?;
    Ok(tally)
}

/// Weekly contributor statistics of one repository.
pub async fn contributor_stats<C: ApiClient>(
    client: &C,
    job: &FetchJob,
) -> api::Result<RepoContributors> {
    let contributors = client.list_contributor_stats(&job.org, &job.repo).await?;
    Ok(RepoContributors::single(job.repo.as_str(), contributors))
}

/// Earliest dated commit matched by `job`, keyed by the job's author filter.
///
/// Ties on the committer timestamp go to the lexicographically smaller URL.
/// Undated commits cannot be ordered and are ignored.
pub async fn earliest_commit<C: ApiClient>(
    client: &C,
    job: &FetchJob,
    per_page: u32,
) -> api::Result<Option<CommitRecord>> {
    let mut earliest: Option<CommitRecord> = None;
    for_each_commit_page(client, job, per_page, |commits| {
        for commit in commits.into_iter().filter(|c| c.committed_at.is_some()) {
            let better = earliest.as_ref().is_none_or(|current| {
                (commit.committed_at, &commit.url) < (current.committed_at, &current.url)
            });
            if better {
                earliest = Some(commit);
            }
        }
    })
    .await?;
    Ok(earliest)
}

/// Logins of every member of one team.
pub async fn team_members<C: ApiClient>(
    client: &C,
    org_id: u64,
    team_id: u64,
    per_page: u32,
) -> api::Result<LoginSet> {
    let walker =
        PageWalker::new(per_page, move |req| client.list_team_members(org_id, team_id, req));
    let members = walker.collect_items().await.map_err(|failure| failure.source)?;
    Ok(members.into_iter().map(|m| m.login).collect())
}
