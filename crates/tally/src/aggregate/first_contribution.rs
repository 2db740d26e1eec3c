//! New-contributor detection.
//!
//! Weekly statistics narrow every author down to their earliest active week
//! anywhere in the organization. Only that week is then searched for the
//! actual first commit, in every repository where the author was active that
//! week. Because the earliest week is chosen organization-wide, an author
//! whose first commit anywhere precedes the cutoff is never reported, no
//! matter what they did later elsewhere.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::engine::Aggregator;
use super::jobs;
use super::merge::{Merge, RepoContributors};
use super::progress::{AggregateProgress, emit};
use super::types::{AggregateError, AggregateResult, FetchJob};
use crate::api::{ApiClient, CommitRecord};
use crate::target::{CommitWindow, week_start};

/// An author's first commit in the organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstContribution {
    pub author: String,
    /// Committer timestamp of the first commit.
    pub date: DateTime<Utc>,
    pub commit_url: String,
    pub org: String,
    pub repo: String,
}

impl FirstContribution {
    fn from_commit(job: &FetchJob, author: &str, commit: CommitRecord) -> Option<Self> {
        Some(Self {
            author: author.to_string(),
            date: commit.committed_at?,
            commit_url: commit.url,
            org: job.org.clone(),
            repo: job.repo.clone(),
        })
    }

    fn sort_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.date, &self.repo, &self.commit_url)
    }
}

/// The first week an author committed to a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWeek {
    pub author: String,
    pub repo: String,
    pub week_start: DateTime<Utc>,
}

/// First non-empty week of every contributor with a login, per repository.
///
/// Weeks are compared by their start, whatever order the statistics list
/// them in.
pub fn first_active_weeks(stats: &RepoContributors) -> Vec<ActiveWeek> {
    stats
        .iter()
        .flat_map(|(repo, contributors)| {
            contributors.iter().filter_map(move |contributor| {
                let author = contributor.login.as_ref()?;
                let week = contributor
                    .weeks
                    .iter()
                    .filter(|w| w.commits > 0)
                    .min_by_key(|w| w.week_start)?;
                Some(ActiveWeek {
                    author: author.clone(),
                    repo: repo.to_string(),
                    week_start: week.week_start,
                })
            })
        })
        .collect()
}

/// Earliest active week per author across all repositories.
///
/// Every repository the author was active in during that week is kept,
/// sorted by name. The week alone cannot tell which of them saw the first
/// commit.
pub fn earliest_active_weeks(
    weeks: impl IntoIterator<Item = ActiveWeek>,
) -> BTreeMap<String, Vec<ActiveWeek>> {
    let mut earliest: BTreeMap<String, Vec<ActiveWeek>> = BTreeMap::new();
    for week in weeks {
        let tied = earliest.entry(week.author.clone()).or_default();
        match tied.first().map(|current| week.week_start.cmp(&current.week_start)) {
            Some(Ordering::Greater) => {}
            Some(Ordering::Equal) => tied.push(week),
            Some(Ordering::Less) | None => *tied = vec![week],
        }
    }
    for tied in earliest.values_mut() {
        tied.sort_by(|a, b| a.repo.cmp(&b.repo));
        tied.dedup_by(|a, b| a.repo == b.repo);
    }
    earliest
}

/// Earliest commit per author, merged across jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EarliestCommits(BTreeMap<String, FirstContribution>);

impl EarliestCommits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `contribution` unless an earlier one is already known.
    pub fn offer(&mut self, contribution: FirstContribution) {
        let superseded = self
            .0
            .get(&contribution.author)
            .is_none_or(|current| contribution.sort_key() < current.sort_key());
        if superseded {
            self.0.insert(contribution.author.clone(), contribution);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Contributions at or after `cutoff`, oldest first, ties by login.
    pub fn since(self, cutoff: DateTime<Utc>) -> Vec<FirstContribution> {
        let mut result: Vec<FirstContribution> = self
            .0
            .into_values()
            .filter(|c| c.date >= cutoff)
            .collect();
        result.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.author.cmp(&b.author)));
        result
    }
}

impl Merge for EarliestCommits {
    fn merge(&mut self, partial: Self) {
        for contribution in partial.0.into_values() {
            self.offer(contribution);
        }
    }
}

impl<C: ApiClient + Clone + 'static> Aggregator<C> {
    /// Authors whose first commit anywhere in `org` happened at or after
    /// `cutoff`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn new_contributors(
        &self,
        org: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<AggregateResult<Vec<FirstContribution>>, AggregateError> {
        let stats = self.org_contributor_stats(org).await?;

        let cutoff_week = week_start(cutoff);
        let candidates: Vec<Vec<ActiveWeek>> =
            earliest_active_weeks(first_active_weeks(&stats.value))
                .into_values()
                .filter(|tied| tied.first().is_some_and(|week| week.week_start >= cutoff_week))
                .collect();

        emit(
            self.on_progress(),
            AggregateProgress::ResolvingFirstCommits {
                candidates: candidates.len(),
            },
        );

        // One lookup per repository the author was active in that week.
        let lookups: Vec<FetchJob> = candidates
            .into_iter()
            .flatten()
            .map(|week| {
                FetchJob::new(org, week.repo, Some(CommitWindow::week(week.week_start)))
                    .with_author(week.author)
            })
            .collect();
        tracing::debug!(lookups = lookups.len(), "Resolving first commits");

        let client = self.client().clone();
        let per_page = self.options().page_size;
        let commits = self
            .run_jobs(
                &format!("{} first commits", org),
                lookups,
                move |job: FetchJob| {
                    let client = client.clone();
                    async move {
                        let mut earliest = EarliestCommits::new();
                        let author = job.author.clone().unwrap_or_default();
                        let first = jobs::earliest_commit(&client, &job, per_page).await?;
                        if let Some(first) = first
                            .and_then(|commit| FirstContribution::from_commit(&job, &author, commit))
                        {
                            earliest.offer(first);
                        }
                        Ok(earliest)
                    }
                },
            )
            .await?;

        let mut skipped = stats.skipped;
        skipped.extend(commits.skipped);
        Ok(AggregateResult {
            value: commits.value.since(cutoff),
            skipped,
            pages: stats.pages + commits.pages,
            jobs_merged: stats.jobs_merged + commits.jobs_merged,
        })
    }
}
