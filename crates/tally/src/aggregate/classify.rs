//! Error classification for failure-policy decisions.

use std::fmt;

use crate::api::ApiError;

/// Fixed message shown to users when the forge throttles us.
pub const RATE_LIMIT_MESSAGE: &str = "Hit rate limit. Please try again later.";

/// Coarse class of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Throttled; continuing would keep failing.
    RateLimited,
    /// The targeted repository, org or team does not exist (or was renamed).
    NotFound,
    /// Anything else. The message is preserved verbatim.
    Transient,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Transient => "transient",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a capability error.
pub fn classify(err: &ApiError) -> ErrorClass {
    match err {
        ApiError::RateLimited { .. } => ErrorClass::RateLimited,
        ApiError::NotFound { .. } => ErrorClass::NotFound,
        ApiError::Api { .. }
        | ApiError::AuthRequired
        | ApiError::Network { .. }
        | ApiError::Internal { .. } => ErrorClass::Transient,
    }
}

/// Render an error for end users: the fixed throttle message for rate
/// limits, the error text otherwise.
pub fn user_message(err: &impl fmt::Display, class: ErrorClass) -> String {
    match class {
        ErrorClass::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
        ErrorClass::NotFound | ErrorClass::Transient => format!("Failed to fetch data: {err}"),
    }
}
