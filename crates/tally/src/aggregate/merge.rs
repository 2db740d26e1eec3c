//! Result kinds and their combination rules.
//!
//! Every [`Merge`] implementation here is associative and commutative, so
//! the order in which concurrent jobs complete never changes the final
//! accumulator. Anything order-sensitive (ranking, display sorting) happens
//! in a separate final stage.

use std::collections::{BTreeMap, BTreeSet};

use crate::api::Contributor;

/// A partial result that can be folded into an accumulator.
pub trait Merge: Default {
    /// Fold `partial` into `self`.
    fn merge(&mut self, partial: Self);
}

/// Unique logins, keyed case-sensitively as the API spells them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSet(BTreeSet<String>);

impl LoginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a login. Returns false if it was already present.
    pub fn insert(&mut self, login: impl Into<String>) -> bool {
        self.0.insert(login.into())
    }

    pub fn contains(&self, login: &str) -> bool {
        self.0.contains(login)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Logins in byte order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Logins sorted case-insensitively, with byte order as tie-break.
    pub fn sorted_case_insensitive(&self) -> Vec<&str> {
        let mut logins: Vec<&str> = self.iter().collect();
        logins.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        logins
    }

    /// Remove every login present in `excluded`.
    pub fn remove_all(&mut self, excluded: &LoginSet) {
        self.0.retain(|login| !excluded.contains(login));
    }
}

impl Merge for LoginSet {
    fn merge(&mut self, partial: Self) {
        self.0.extend(partial.0);
    }
}

impl<S: Into<String>> FromIterator<S> for LoginSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for LoginSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl IntoIterator for LoginSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Number of commits actually fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommitCount(pub u64);

impl CommitCount {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Merge for CommitCount {
    fn merge(&mut self, partial: Self) {
        self.0 += partial.0;
    }
}

/// Per-login commit counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorCounts(BTreeMap<String, u64>);

impl AuthorCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `commits` to `login`'s count.
    pub fn add(&mut self, login: impl Into<String>, commits: u64) {
        *self.0.entry(login.into()).or_default() += commits;
    }

    pub fn get(&self, login: &str) -> Option<u64> {
        self.0.get(login).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all logins.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// The set of logins with at least one commit.
    pub fn logins(&self) -> LoginSet {
        self.0.keys().cloned().collect()
    }

    /// Counts sorted by commits descending, then login ascending.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> =
            self.0.iter().map(|(login, n)| (login.as_str(), *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Drop every login present in `excluded`.
    #[must_use]
    pub fn without(mut self, excluded: &LoginSet) -> Self {
        self.0.retain(|login, _| !excluded.contains(login));
        self
    }
}

impl Merge for AuthorCounts {
    fn merge(&mut self, partial: Self) {
        for (login, commits) in partial.0 {
            self.add(login, commits);
        }
    }
}

/// Contributor statistics bucketed by repository name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContributors(BTreeMap<String, Vec<Contributor>>);

impl RepoContributors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-repository partial. An empty list yields no bucket.
    pub fn single(repo: impl Into<String>, contributors: Vec<Contributor>) -> Self {
        let mut this = Self::new();
        this.merge(Self(BTreeMap::from([(repo.into(), contributors)])));
        this
    }

    pub fn get(&self, repo: &str) -> Option<&[Contributor]> {
        self.0.get(repo).map(Vec::as_slice)
    }

    /// Number of repository buckets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Buckets in repository name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Contributor])> {
        self.0.iter().map(|(repo, c)| (repo.as_str(), c.as_slice()))
    }
}

impl Merge for RepoContributors {
    fn merge(&mut self, partial: Self) {
        for (repo, contributors) in partial.0 {
            if contributors.is_empty() {
                continue;
            }
            let bucket = self.0.entry(repo).or_default();
            bucket.extend(contributors);
            bucket.sort();
        }
    }
}

/// Contributors and commit count for a window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorSummary {
    pub contributors: LoginSet,
    pub commits: CommitCount,
}

impl Merge for ContributorSummary {
    fn merge(&mut self, partial: Self) {
        self.contributors.merge(partial.contributors);
        self.commits.merge(partial.commits);
    }
}

/// Per-author commit counts plus the total commit count (which also covers
/// commits without a linked author).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitTally {
    pub authors: AuthorCounts,
    pub commits: CommitCount,
}

impl Merge for CommitTally {
    fn merge(&mut self, partial: Self) {
        self.authors.merge(partial.authors);
        self.commits.merge(partial.commits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logins(names: &[&str]) -> LoginSet {
        names.iter().copied().collect()
    }

    fn merged<T: Merge + Clone>(parts: &[T]) -> T {
        let mut acc = T::default();
        for part in parts {
            acc.merge(part.clone());
        }
        acc
    }

    #[test]
    fn test_union_is_idempotent() {
        let set = logins(&["alice", "bob"]);
        let mut acc = set.clone();
        acc.merge(set.clone());
        assert_eq!(acc, set);
    }

    #[test]
    fn test_union_keeps_case_distinct() {
        let set = merged(&[logins(&["Alice"]), logins(&["alice"])]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_union_order_independent() {
        let a = logins(&["alice", "bob"]);
        let b = logins(&["bob", "carol"]);
        let c = logins(&["dave"]);
        assert_eq!(
            merged(&[a.clone(), b.clone(), c.clone()]),
            merged(&[c, b, a])
        );
    }

    #[test]
    fn test_sorted_case_insensitive() {
        let set = logins(&["bob", "Alice", "carol", "alice"]);
        assert_eq!(
            set.sorted_case_insensitive(),
            vec!["Alice", "alice", "bob", "carol"]
        );
    }

    #[test]
    fn test_commit_count_sums() {
        let total = merged(&[CommitCount(3), CommitCount(0), CommitCount(4)]);
        assert_eq!(total.get(), 7);
    }

    #[test]
    fn test_author_counts_merge_and_rank() {
        let mut a = AuthorCounts::new();
        a.add("alice", 2);
        a.add("bob", 5);
        let mut b = AuthorCounts::new();
        b.add("alice", 3);
        b.add("carol", 5);

        let counts = merged(&[a, b]);
        assert_eq!(counts.get("alice"), Some(5));
        assert_eq!(counts.total(), 15);
        assert_eq!(
            counts.ranked(),
            vec![("alice", 5), ("bob", 5), ("carol", 5)]
        );
    }

    #[test]
    fn test_author_counts_without() {
        let mut counts = AuthorCounts::new();
        counts.add("alice", 1);
        counts.add("bot", 9);
        let counts = counts.without(&logins(&["bot"]));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("bot"), None);
    }

    #[test]
    fn test_repo_contributors_order_independent() {
        let alice = Contributor {
            login: Some("alice".into()),
            repo: "widget".into(),
            weeks: Vec::new(),
        };
        let bob = Contributor {
            login: Some("bob".into()),
            ..alice.clone()
        };
        let a = RepoContributors::single("widget", vec![bob.clone()]);
        let b = RepoContributors::single("widget", vec![alice.clone()]);

        let forward = merged(&[a.clone(), b.clone()]);
        let backward = merged(&[b, a]);
        assert_eq!(forward, backward);
        assert_eq!(forward.get("widget").map(<[Contributor]>::len), Some(2));
    }
}
