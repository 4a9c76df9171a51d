use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::RepositoryConfig;
use crate::domain::{BranchCheck, FetchResult, Issue, PullRequest};

/// Performs the network side of one category fetch.
///
/// Implementations must classify every configured repository as either
/// succeeded or failed (repositories skipped because `cancel` fired count as
/// failed) and set [`FetchResult::error`] only when nothing succeeded.
#[async_trait]
pub trait Collector: Send + Sync {
    async fn fetch_issues(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<Issue>;

    async fn fetch_pull_requests(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<PullRequest>;

    async fn fetch_branch_checks(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<BranchCheck>;
}
