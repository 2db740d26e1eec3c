//! Forge API abstraction.
//!
//! The aggregation engine only ever talks to an [`ApiClient`]; the GitHub
//! implementation lives in [`crate::github`], and tests substitute an
//! in-memory client.

mod errors;
mod page;
mod rate_limit;
mod types;

pub use errors::{ApiError, Result, short_error_message};
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest};
pub use rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS, RateLimitedClient};
pub use types::{
    ApiClient, CommitQuery, CommitRecord, Contributor, OwnerKind, OwnerProfile, RateLimitInfo,
    RepositoryRef, TeamRef, UserRef, WeekStat,
};
