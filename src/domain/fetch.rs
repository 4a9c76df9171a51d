use chrono::{DateTime, Utc};

/// Requests remaining below which the rate limit is logged as a warning.
pub const RATE_LIMIT_WARN_THRESHOLD: u32 = 100;

/// API quota as of the most recent response in a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateInfo {
    pub fn is_low(&self) -> bool {
        self.remaining < RATE_LIMIT_WARN_THRESHOLD
    }
}

/// Hard failure of a whole category fetch: no repository succeeded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch cancelled before any repository succeeded")]
    Cancelled,
    #[error("all {} repositories failed: {}", .failed.len(), .failed.join(", "))]
    AllFailed { failed: Vec<String> },
}

/// Outcome of one collector call for one category.
///
/// Every configured repository appears in exactly one of `succeeded` or
/// `failed`. `error` is set only when `succeeded` is empty and at least one
/// repository was configured.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<T> {
    pub records: Vec<T>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub rate: Option<RateInfo>,
    pub error: Option<FetchError>,
}

impl<T> Default for FetchResult<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            rate: None,
            error: None,
        }
    }
}

impl<T> FetchResult<T> {
    /// Records a repository as fully fetched.
    pub fn succeed(&mut self, repo: impl Into<String>, records: impl IntoIterator<Item = T>) {
        self.succeeded.push(repo.into());
        self.records.extend(records);
    }

    pub fn fail(&mut self, repo: impl Into<String>) {
        self.failed.push(repo.into());
    }

    /// Marks every configured repository not yet classified as failed and
    /// sets the hard error when nothing succeeded.
    pub fn finish<'a>(
        mut self,
        configured: impl IntoIterator<Item = &'a str>,
        cancelled: bool,
    ) -> Self {
        let mut configured_count = 0usize;
        for name in configured {
            configured_count += 1;
            let seen = self.succeeded.iter().chain(&self.failed).any(|r| r == name);
            if !seen {
                self.failed.push(name.to_string());
            }
        }

        if self.succeeded.is_empty() && configured_count > 0 {
            self.error = Some(if cancelled {
                FetchError::Cancelled
            } else {
                FetchError::AllFailed {
                    failed: self.failed.clone(),
                }
            });
        }
        self
    }
}
