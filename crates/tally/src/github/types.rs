//! GitHub REST wire types.
//!
//! Only the fields the aggregation needs are modelled; serde ignores the
//! rest of each payload.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A user or organization account as embedded in other payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct GhAccount {
    pub id: u64,
    pub login: String,
}

/// `GET /orgs/{org}` and `GET /users/{user}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GhOwner {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// An entry of `GET /orgs/{org}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct GhRepository {
    pub id: u64,
    pub name: String,
    pub owner: GhAccount,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}

/// Author/committer signature inside a git commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GhSignature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhCommitDetail {
    #[serde(default)]
    pub author: Option<GhSignature>,
    #[serde(default)]
    pub committer: Option<GhSignature>,
}

/// An entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct GhCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    /// Linked account; `null` when the commit email matches no account.
    #[serde(default)]
    pub author: Option<GhAccount>,
    pub commit: GhCommitDetail,
}

/// One week of `GET /repos/{owner}/{repo}/stats/contributors`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GhWeek {
    /// Unix timestamp of the week start.
    pub w: i64,
    /// Additions.
    #[serde(default)]
    pub a: u64,
    /// Deletions.
    #[serde(default)]
    pub d: u64,
    /// Commits.
    #[serde(default)]
    pub c: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhContributorStats {
    #[serde(default)]
    pub author: Option<GhAccount>,
    #[serde(default)]
    pub weeks: Vec<GhWeek>,
}

/// An entry of `GET /orgs/{org}/teams`.
#[derive(Debug, Clone, Deserialize)]
pub struct GhTeam {
    pub id: u64,
    pub slug: String,
    pub name: String,
}
