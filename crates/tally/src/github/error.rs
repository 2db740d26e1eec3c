//! GitHub API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::ApiError;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// GitHub answered `202 Accepted`: statistics are still being computed.
    #[error("Statistics for {0} are still being computed")]
    StatsPending(String),

    #[error("Unexpected HTTP status {status} for {route}")]
    UnexpectedStatus { status: u16, route: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Check if an octocrab error indicates a rate limit (403/429).
pub fn is_rate_limit_error(e: &octocrab::Error) -> bool {
    match e {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            status == 403 || status == 429
        }
        _ => false,
    }
}

/// Check if an octocrab error is a 404.
pub fn is_not_found_error(e: &octocrab::Error) -> bool {
    matches!(e, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}

/// Check if a GitHubError asks the caller to try again shortly.
pub fn is_pending(e: &GitHubError) -> bool {
    matches!(e, GitHubError::StatsPending(_))
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { reset_at } => ApiError::RateLimited { reset_at },
            GitHubError::AuthRequired => ApiError::AuthRequired,
            GitHubError::NotFound(resource) => ApiError::not_found(resource),
            GitHubError::Api(e) if is_rate_limit_error(&e) => ApiError::RateLimited {
                // octocrab does not surface response headers on errors.
                reset_at: Utc::now(),
            },
            GitHubError::Api(e) if is_not_found_error(&e) => ApiError::not_found(e.to_string()),
            GitHubError::Api(e) => ApiError::api(e.to_string()),
            GitHubError::Http(e) => ApiError::network(e.to_string()),
            GitHubError::Forbidden(msg) => ApiError::api(format!("forbidden: {msg}")),
            e @ (GitHubError::StatsPending(_) | GitHubError::UnexpectedStatus { .. }) => {
                ApiError::api(e.to_string())
            }
            GitHubError::Internal(msg) => ApiError::internal(msg),
        }
    }
}
