//! Concurrent aggregation over paginated collections.
//!
//! # Module Structure
//!
//! - [`walker`] - `PageWalker`: pulls one page at a time until the API says stop
//! - [`fan_out`] - `FanOutExecutor`: one bounded task per item, results over a channel
//! - [`merge`] - Result kinds and the `Merge` trait that folds them
//! - [`classify`] - Error classes and the user-facing message
//! - [`engine`] - `Aggregator`: ties the above together under a failure policy
//! - [`first_contribution`] - New-contributor detection
//!
//! # Example
//!
//! ```ignore
//! use tally::aggregate::{AggregateOptions, Aggregator};
//! use tally::target::{CommitWindow, Target};
//!
//! let aggregator = Aggregator::new(client, AggregateOptions::default());
//! let window = CommitWindow::month(2024, 10)?;
//! let result = aggregator.committer_counts(&Target::owner("acme"), window).await?;
//! for (login, commits) in result.value.authors.ranked() {
//!     println!("{login}: {commits}");
//! }
//! ```

pub mod classify;
pub mod engine;
pub mod fan_out;
pub mod first_contribution;
mod jobs;
pub mod merge;
mod operations;
mod progress;
mod types;
pub mod walker;

pub use classify::{ErrorClass, RATE_LIMIT_MESSAGE, classify, user_message};
pub use engine::Aggregator;
pub use fan_out::{FanOutExecutor, JobReport, PageJobs};
pub use first_contribution::{
    ActiveWeek, EarliestCommits, FirstContribution, earliest_active_weeks, first_active_weeks,
};
pub use merge::{
    AuthorCounts, CommitCount, CommitTally, ContributorSummary, LoginSet, Merge, RepoContributors,
};
pub use operations::Hackfest;
pub use progress::{AggregateProgress, ProgressCallback, emit};
pub use types::{
    AggregateError, AggregateOptions, AggregateResult, DEFAULT_CONCURRENCY, FailurePolicy,
    FetchJob, SkippedItem,
};
pub use walker::{PageFailure, PageWalker, WalkedPage};
