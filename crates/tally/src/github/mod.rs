//! GitHub implementation of [`ApiClient`](crate::api::ApiClient).
//!
//! # Module Structure
//!
//! - [`error`] - Error types and their mapping onto [`ApiError`](crate::api::ApiError)
//! - [`types`] - REST wire payloads
//! - [`client`] - The client and Link-header pagination
//! - [`convert`] - Wire payload to API type conversion
//!
//! ```ignore
//! use tally::api::RateLimitedClient;
//! use tally::github::GitHubClient;
//!
//! let client = RateLimitedClient::new(GitHubClient::new(&token)?, 10);
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{
    DEFAULT_API_URL, GitHubClient, LinkPagination, RawResponse, create_client, parse_link_header,
};
pub use error::{GitHubError, is_rate_limit_error};
