//! Shared aggregation types and constants.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::classify::{ErrorClass, classify, user_message};
use crate::api::{ApiError, CommitQuery, DEFAULT_PAGE_SIZE};
use crate::target::CommitWindow;

/// Default number of concurrently running fetch jobs.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// What to do when a single fetch job fails.
///
/// Page-level failures always abort the walk, and so do rate limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole aggregation, discarding partial results.
    #[default]
    FailFast,
    /// Record the failure, skip the item and keep going.
    SkipAndLog,
}

impl FailurePolicy {
    /// Returns true if a job failing with `class` must abort the walk.
    pub fn aborts_on(&self, class: ErrorClass) -> bool {
        match self {
            Self::FailFast => true,
            Self::SkipAndLog => class == ErrorClass::RateLimited,
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => f.write_str("fail_fast"),
            Self::SkipAndLog => f.write_str("skip_and_log"),
        }
    }
}

/// Options for one aggregation.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Items requested per page.
    pub page_size: u32,
    /// Upper bound on concurrently running jobs, across all pages.
    pub concurrency: usize,
    /// Job failure policy.
    pub policy: FailurePolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            policy: FailurePolicy::default(),
        }
    }
}

impl AggregateOptions {
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Parameters of one concurrent unit of work.
///
/// Moved into the task that executes it and dropped once its result has
/// been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub org: String,
    pub repo: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

impl FetchJob {
    /// A job over one repository, optionally bounded by a window.
    pub fn new(org: impl Into<String>, repo: impl Into<String>, window: Option<CommitWindow>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            since: window.map(|w| w.since),
            until: window.map(|w| w.until),
            author: None,
        }
    }

    /// Restrict the job to one author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Commit listing filters for this job.
    pub fn commit_query(&self) -> CommitQuery {
        CommitQuery {
            since: self.since,
            until: self.until,
            author: self.author.clone(),
        }
    }
}

impl fmt::Display for FetchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)?;
        if let Some(author) = &self.author {
            write!(f, " ({})", author)?;
        }
        Ok(())
    }
}

/// A job that failed and was skipped under [`FailurePolicy::SkipAndLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// The job label, e.g. `acme/ghost`.
    pub label: String,
    pub class: ErrorClass,
    pub message: String,
}

/// The merged value of one aggregation plus its bookkeeping.
#[derive(Debug, Clone)]
pub struct AggregateResult<T> {
    pub value: T,
    /// Jobs skipped under [`FailurePolicy::SkipAndLog`].
    pub skipped: Vec<SkippedItem>,
    /// Pages consumed from the parent collection.
    pub pages: u32,
    /// Jobs whose partial result was merged.
    pub jobs_merged: usize,
}

impl<T> AggregateResult<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
            pages: 0,
            jobs_merged: 0,
        }
    }

    /// Number of skipped items.
    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Returns true if some jobs were skipped.
    #[inline]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Transform the value, keeping the bookkeeping.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AggregateResult<U> {
        AggregateResult {
            value: f(self.value),
            skipped: self.skipped,
            pages: self.pages,
            jobs_merged: self.jobs_merged,
        }
    }
}

/// A fatal aggregation failure.
#[derive(Debug, Clone, Error)]
pub enum AggregateError {
    /// A page of the parent collection could not be fetched.
    #[error("failed to fetch page {page} of {collection}: {source}")]
    Page {
        collection: String,
        page: u32,
        source: ApiError,
    },

    /// A fetch job failed under a policy that does not tolerate it.
    #[error("{label}: {source}")]
    Job { label: String, source: ApiError },

    /// A single-object lookup (e.g. owner resolution) failed.
    #[error("{what}: {source}")]
    Lookup { what: String, source: ApiError },
}

impl AggregateError {
    /// The underlying capability error.
    pub fn api_error(&self) -> &ApiError {
        match self {
            Self::Page { source, .. } | Self::Job { source, .. } | Self::Lookup { source, .. } => {
                source
            }
        }
    }

    pub fn class(&self) -> ErrorClass {
        classify(self.api_error())
    }

    /// Message suitable for end users.
    pub fn user_message(&self) -> String {
        user_message(self, self.class())
    }
}
