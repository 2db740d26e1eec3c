use chrono::{DateTime, Utc};
use thiserror::Error;

/// A failed call on an [`ApiClient`](super::ApiClient).
///
/// Forge clients map their own errors onto these variants. The aggregation
/// engine classifies them (see [`crate::aggregate::classify`]) and never
/// looks further.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The forge throttled us until `reset_at`.
    #[error("rate limited until {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// An owner, repository or team does not exist (or is hidden from us).
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The forge answered with an error.
    #[error("request failed: {message}")]
    Api { message: String },

    /// The request never got an answer.
    #[error("network failure: {message}")]
    Network { message: String },

    #[error("authentication required, check the GitHub token")]
    AuthRequired,

    /// A bug or broken invariant on our side.
    #[error("internal failure: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// First line of an error's message.
///
/// Upstream bodies can span many lines; logs and progress output only want
/// the headline.
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    match full.lines().next() {
        Some(first) if first.len() < full.len() => first.to_string(),
        _ => full,
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
