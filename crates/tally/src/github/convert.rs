//! Conversion from GitHub wire types to forge-agnostic API types.

use chrono::DateTime;

use super::types::{GhAccount, GhCommit, GhContributorStats, GhOwner, GhRepository, GhTeam};
use crate::api::{
    CommitRecord, Contributor, OwnerKind, OwnerProfile, RepositoryRef, TeamRef, UserRef, WeekStat,
};

pub fn to_repository_ref(repo: GhRepository) -> RepositoryRef {
    RepositoryRef {
        id: repo.id,
        owner: repo.owner.login,
        name: repo.name,
        is_fork: repo.fork,
        is_archived: repo.archived,
    }
}

/// Convert a listed commit.
///
/// The committer date is preferred (it is what the `since`/`until` filters
/// match on); the author date is the fallback. A commit carrying neither is
/// kept undated so it still counts towards commit totals.
pub fn to_commit_record(commit: GhCommit) -> CommitRecord {
    let committed_at = commit
        .commit
        .committer
        .and_then(|s| s.date)
        .or_else(|| commit.commit.author.and_then(|s| s.date));

    CommitRecord {
        sha: commit.sha,
        author_login: commit.author.map(|a| a.login),
        committed_at,
        url: commit.html_url,
    }
}

pub fn to_contributor(repo: &str, stats: GhContributorStats) -> Contributor {
    let mut weeks: Vec<WeekStat> = stats
        .weeks
        .into_iter()
        .filter_map(|w| {
            DateTime::from_timestamp(w.w, 0).map(|week_start| WeekStat {
                week_start,
                commits: w.c,
            })
        })
        .collect();
    weeks.sort_by_key(|w| w.week_start);

    Contributor {
        login: stats.author.map(|a| a.login),
        repo: repo.to_string(),
        weeks,
    }
}

pub fn to_team_ref(team: GhTeam) -> TeamRef {
    TeamRef {
        id: team.id,
        slug: team.slug,
        name: team.name,
    }
}

pub fn to_user_ref(user: GhAccount) -> UserRef {
    UserRef {
        id: user.id,
        login: user.login,
    }
}

pub fn to_owner_profile(owner: GhOwner, fallback: OwnerKind) -> OwnerProfile {
    let kind = match owner.kind.as_deref() {
        Some("Organization") => OwnerKind::Organization,
        Some("User") => OwnerKind::User,
        _ => fallback,
    };
    OwnerProfile {
        id: owner.id,
        login: owner.login,
        kind,
        avatar_url: owner.avatar_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_without_linked_account() {
        let commit: GhCommit = serde_json::from_str(
            r#"{
                "sha": "abc123",
                "html_url": "https://github.com/acme/widget/commit/abc123",
                "author": null,
                "commit": {
                    "author": {"date": "2024-03-01T10:00:00Z"},
                    "committer": {"date": "2024-03-02T11:00:00Z"}
                }
            }"#,
        )
        .unwrap();

        let record = to_commit_record(commit);
        assert_eq!(record.author_login, None);
        assert_eq!(
            record.committed_at.map(|at| at.to_rfc3339()).as_deref(),
            Some("2024-03-02T11:00:00+00:00")
        );
    }

    #[test]
    fn test_commit_falls_back_to_author_date() {
        let commit: GhCommit = serde_json::from_str(
            r#"{
                "sha": "abc123",
                "author": {"id": 7, "login": "alice"},
                "commit": {"author": {"date": "2024-03-01T10:00:00Z"}, "committer": null}
            }"#,
        )
        .unwrap();

        let record = to_commit_record(commit);
        assert_eq!(record.author_login.as_deref(), Some("alice"));
        assert_eq!(
            record.committed_at.map(|at| at.to_rfc3339()).as_deref(),
            Some("2024-03-01T10:00:00+00:00")
        );
    }

    #[test]
    fn test_commit_without_dates_is_kept_undated() {
        let commit: GhCommit =
            serde_json::from_str(r#"{"sha": "abc123", "commit": {}}"#).unwrap();
        let record = to_commit_record(commit);
        assert_eq!(record.sha, "abc123");
        assert_eq!(record.committed_at, None);
    }

    #[test]
    fn test_contributor_weeks_are_sorted() {
        let stats: GhContributorStats = serde_json::from_str(
            r#"{
                "author": {"id": 1, "login": "bob"},
                "total": 5,
                "weeks": [
                    {"w": 1710028800, "a": 10, "d": 2, "c": 3},
                    {"w": 1709424000, "a": 0, "d": 0, "c": 2}
                ]
            }"#,
        )
        .unwrap();

        let contributor = to_contributor("widget", stats);
        assert_eq!(contributor.login.as_deref(), Some("bob"));
        assert_eq!(contributor.repo, "widget");
        assert!(contributor.weeks[0].week_start < contributor.weeks[1].week_start);
        assert_eq!(contributor.total_commits(), 5);
    }

    #[test]
    fn test_owner_kind_from_type_field() {
        let owner: GhOwner = serde_json::from_str(
            r#"{"id": 9, "login": "acme", "type": "Organization", "avatar_url": "https://x/y.png"}"#,
        )
        .unwrap();
        let profile = to_owner_profile(owner, OwnerKind::User);
        assert!(profile.is_organization());

        let owner: GhOwner = serde_json::from_str(r#"{"id": 9, "login": "solo"}"#).unwrap();
        let profile = to_owner_profile(owner, OwnerKind::User);
        assert_eq!(profile.kind, OwnerKind::User);
    }
}
