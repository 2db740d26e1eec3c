//! Tally - contribution statistics for code forge organizations.
//!
//! Walks paginated forge collections, fans out one job per repository (or
//! author, or team) under a concurrency cap, and merges the partial results
//! into contributor sets, commit counts and first-contribution records.
//!
//! # Features
//!
//! - `github` (default) - The GitHub implementation of [`api::ApiClient`]
//!   built on octocrab and reqwest.
//!
//! # Example
//!
//! ```ignore
//! use tally::aggregate::{AggregateOptions, Aggregator};
//! use tally::api::{GITHUB_DEFAULT_RPS, RateLimitedClient};
//! use tally::github::GitHubClient;
//! use tally::target::{CommitWindow, Target};
//!
//! let client = GitHubClient::new(&token)?;
//! let client = RateLimitedClient::new(client, GITHUB_DEFAULT_RPS);
//! let aggregator = Aggregator::new(client, AggregateOptions::default());
//!
//! let window = CommitWindow::month(2024, 10)?;
//! let result = aggregator.contributors(&Target::owner("acme"), window).await?;
//! println!("{} contributors", result.value.contributors.len());
//! ```

pub mod aggregate;
pub mod api;
pub mod target;

#[cfg(feature = "github")]
pub mod retry;

#[cfg(feature = "github")]
pub mod github;

pub use aggregate::{AggregateError, AggregateOptions, Aggregator, FailurePolicy};
pub use api::{ApiClient, ApiError, ApiRateLimiter, RateLimitedClient};
pub use target::{CommitWindow, Target};
