use thiserror::Error;

/// Errors from a single GitHub API request.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GITHUB_TOKEN environment variable not set")]
    MissingToken,

    #[error("GitHub token contains characters not allowed in a header")]
    InvalidToken,

    #[error("invalid GitHub URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("branch {branch} has no commits")]
    NoCommits { branch: String },

    #[error("request cancelled")]
    Cancelled,
}

impl GitHubError {
    /// 403 and 429 are how GitHub signals an exhausted quota.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 403 | 429, .. })
    }
}
