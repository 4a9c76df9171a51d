//! GitHub REST collector.
//!
//! - [`error`] - errors raised by a single API call
//! - [`types`] - wire shapes of the endpoints we read
//! - [`client`] - authenticated HTTP client, pagination and rate headers
//! - [`convert`] - wire to domain conversion
//! - [`collector`] - the [`crate::collector::Collector`] implementation

mod client;
mod collector;
mod convert;
mod error;
mod types;

pub use client::{
    parse_next_link, parse_rate_headers, GitHubClient, RateTracker, PER_PAGE, REQUEST_TIMEOUT,
};
pub use collector::GitHubCollector;
pub use convert::latest_reviews;
pub use error::GitHubError;
