//! Aggregation operations built on the engine.

use std::collections::BTreeSet;
use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use super::engine::Aggregator;
use super::jobs;
use super::merge::{CommitTally, ContributorSummary, LoginSet, Merge, RepoContributors};
use super::progress::{AggregateProgress, emit};
use super::types::{AggregateError, AggregateResult, FetchJob};
use super::walker::PageWalker;
use crate::api::{self, ApiClient, OwnerKind, OwnerProfile, RepositoryRef, TeamRef};
use crate::target::{CommitWindow, Target, TargetParseError};

/// A configured hackfest: a target and an inclusive range of days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hackfest {
    pub target: Target,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Hackfest {
    /// The commit window covering every day of the hackfest.
    pub fn window(&self) -> Result<CommitWindow, TargetParseError> {
        CommitWindow::days(self.start, self.end)
    }

    /// Returns true if `now` falls within the hackfest.
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.window().is_ok_and(|window| window.contains(now))
    }
}

impl<C: ApiClient + Clone + 'static> Aggregator<C> {
    /// Resolve `name` to an organization or, failing that, a user.
    pub async fn resolve_owner(&self, name: &str) -> Result<OwnerProfile, AggregateError> {
        self.client()
            .get_owner_profile(name)
            .await
            .map_err(|source| AggregateError::Lookup {
                what: format!("owner {}", name),
                source,
            })
    }

    /// Unique commit authors and total commits in `window`.
    ///
    /// Walks every source repository of the owner, or just the one named by
    /// the target.
    #[tracing::instrument(skip(self, target), fields(target = %target))]
    pub async fn contributors(
        &self,
        target: &Target,
        window: CommitWindow,
    ) -> Result<AggregateResult<ContributorSummary>, AggregateError> {
        let client = self.client().clone();
        let per_page = self.options().page_size;
        self.across_target(target, Some(window), move |job: FetchJob| {
            let client = client.clone();
            async move { jobs::contributor_summary(&client, &job, per_page).await }
        })
        .await
    }

    /// Per-author commit counts and total commits in `window`.
    #[tracing::instrument(skip(self, target), fields(target = %target))]
    pub async fn committer_counts(
        &self,
        target: &Target,
        window: CommitWindow,
    ) -> Result<AggregateResult<CommitTally>, AggregateError> {
        let client = self.client().clone();
        let per_page = self.options().page_size;
        self.across_target(target, Some(window), move |job: FetchJob| {
            let client = client.clone();
            async move { jobs::commit_tally(&client, &job, per_page).await }
        })
        .await
    }

    /// Everyone who committed during a month, for a changelog.
    ///
    /// Use [`LoginSet::sorted_case_insensitive`] for display order.
    pub async fn changelog(
        &self,
        target: &Target,
        month: CommitWindow,
    ) -> Result<AggregateResult<LoginSet>, AggregateError> {
        Ok(self
            .contributors(target, month)
            .await?
            .map(|summary| summary.contributors))
    }

    /// Weekly contributor statistics for every repository of an owner.
    #[tracing::instrument(skip(self))]
    pub async fn org_contributor_stats(
        &self,
        owner: &str,
    ) -> Result<AggregateResult<RepoContributors>, AggregateError> {
        let client = self.client().clone();
        self.across_target(&Target::owner(owner), None, move |job: FetchJob| {
            let client = client.clone();
            async move { jobs::contributor_stats(&client, &job).await }
        })
        .await
    }

    /// Logins of every member of the named teams of an organization.
    ///
    /// Unknown slugs are reported as warnings. Owners that are users have no
    /// teams and yield an empty set.
    #[tracing::instrument(skip(self))]
    pub async fn team_logins(
        &self,
        org: &str,
        slugs: &[String],
    ) -> Result<AggregateResult<LoginSet>, AggregateError> {
        if slugs.is_empty() {
            return Ok(AggregateResult::new(LoginSet::new()));
        }

        let profile = self.resolve_owner(org).await?;
        if profile.kind != OwnerKind::Organization {
            warn!(owner = %profile.login, "Team exclusions ignored: owner is not an organization");
            return Ok(AggregateResult::new(LoginSet::new()));
        }

        let client = self.client();
        let login = profile.login.as_str();
        let collection = format!("{} teams", login);
        let teams = PageWalker::new(self.options().page_size, move |req| {
            client.list_teams(login, req)
        })
        .collect_items()
        .await
        .map_err(|failure| AggregateError::Page {
            collection: collection.clone(),
            page: failure.page,
            source: failure.source,
        })?;

        let wanted: BTreeSet<&str> = slugs.iter().map(String::as_str).collect();
        let matched: Vec<TeamRef> = teams
            .into_iter()
            .filter(|team| wanted.contains(team.slug.as_str()))
            .collect();

        for slug in &wanted {
            if !matched.iter().any(|team| team.slug == *slug) {
                warn!(team = %slug, org = %login, "Team not found");
                emit(
                    self.on_progress(),
                    AggregateProgress::Warning {
                        message: format!("team {} not found in {}", slug, login),
                    },
                );
            }
        }

        let client = self.client().clone();
        let org_id = profile.id;
        let per_page = self.options().page_size;
        self.run_jobs(
            &format!("{} team members", login),
            matched,
            move |team: TeamRef| {
                let client = client.clone();
                async move { jobs::team_members(&client, org_id, team.id, per_page).await }
            },
        )
        .await
    }

    /// Commit counts for a hackfest, without excluded users and without the
    /// members of excluded teams.
    ///
    /// The total commit count still covers every fetched commit.
    pub async fn hackfest_contributors(
        &self,
        target: &Target,
        window: CommitWindow,
        excluded_users: &LoginSet,
        excluded_teams: &[String],
    ) -> Result<AggregateResult<CommitTally>, AggregateError> {
        let mut result = self.committer_counts(target, window).await?;

        let teams = self.team_logins(&target.owner, excluded_teams).await?;
        let mut excluded = excluded_users.clone();
        excluded.merge(teams.value);
        result.skipped.extend(teams.skipped);

        let authors = std::mem::take(&mut result.value.authors);
        result.value.authors = authors.without(&excluded);
        Ok(result)
    }

    /// Run `job` for the target's repository, or for every repository of
    /// the target's owner.
    pub(crate) async fn across_target<R, Job, JobFut>(
        &self,
        target: &Target,
        window: Option<CommitWindow>,
        job: Job,
    ) -> Result<AggregateResult<R>, AggregateError>
    where
        R: Merge + Send + 'static,
        Job: Fn(FetchJob) -> JobFut + Send + Sync + 'static,
        JobFut: Future<Output = api::Result<R>> + Send + 'static,
    {
        if let Some(repo) = &target.repo {
            let single = FetchJob::new(target.owner.as_str(), repo.as_str(), window);
            return self.run_jobs(&target.to_string(), vec![single], job).await;
        }

        let profile = self.resolve_owner(&target.owner).await?;
        self.across_repositories(&profile, window, job).await
    }

    async fn across_repositories<R, Job, JobFut>(
        &self,
        profile: &OwnerProfile,
        window: Option<CommitWindow>,
        job: Job,
    ) -> Result<AggregateResult<R>, AggregateError>
    where
        R: Merge + Send + 'static,
        Job: Fn(FetchJob) -> JobFut + Send + Sync + 'static,
        JobFut: Future<Output = api::Result<R>> + Send + 'static,
    {
        let client = self.client();
        let owner = profile.login.as_str();
        let kind = profile.kind;

        self.walk_fan_out(
            &format!("{} repositories", owner),
            move |req| match kind {
                OwnerKind::Organization => client.list_repositories(owner, req),
                OwnerKind::User => client.list_user_repositories(owner, req),
            },
            |repo: RepositoryRef| {
                (!repo.is_fork).then(|| FetchJob::new(owner, repo.name, window))
            },
            job,
        )
        .await
    }
}
