//! HTTP client module
//!
//! Provides the rate-limited client used by HTTP sources.
//!
//! # Features
//!
//! - **Rate Limiting**: Token bucket rate limiter using governor, shared across sources
//! - **Typed Errors**: Timeouts and non-success statuses map to `Error` variants
//!   that `Error::is_retryable` understands

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
