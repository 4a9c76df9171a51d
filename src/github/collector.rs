use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::client::{GitHubClient, RateTracker};
use super::convert::{latest_reviews, to_branch_check, to_checks, to_issue, to_pull_request};
use super::error::GitHubError;
use super::types::{WireCheckRunPage, WireCommit, WireIssue, WirePull, WirePullDetail, WireReview};
use crate::collector::Collector;
use crate::config::RepositoryConfig;
use crate::domain::{BranchCheck, Check, FetchResult, Issue, PullRequest};

/// [`Collector`] backed by the GitHub REST API.
///
/// Repositories are fetched one after another. A repository that errors is
/// reported failed and the loop moves on; cancellation stops the loop and
/// leaves the remaining repositories unattempted.
#[derive(Clone)]
pub struct GitHubCollector {
    client: GitHubClient,
}

impl GitHubCollector {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    async fn repo_issues(
        &self,
        org: &str,
        repo: &str,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<Vec<Issue>, GitHubError> {
        let raw: Vec<WireIssue> = self
            .client
            .get_all::<Vec<WireIssue>>(
                &format!("/repos/{org}/{repo}/issues"),
                &[("state", "open")],
                cancel,
                rate,
            )
            .await?;
        Ok(raw
            .into_iter()
            .filter(|i| !i.is_pull_request())
            .map(|i| to_issue(repo, i))
            .collect())
    }

    async fn repo_pull_requests(
        &self,
        org: &str,
        repo: &str,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let raw: Vec<WirePull> = self
            .client
            .get_all::<Vec<WirePull>>(
                &format!("/repos/{org}/{repo}/pulls"),
                &[("state", "open")],
                cancel,
                rate,
            )
            .await?;

        let mut prs = Vec::with_capacity(raw.len());
        for wire in raw {
            if cancel.is_cancelled() {
                return Err(GitHubError::Cancelled);
            }
            let head_sha = wire.head.sha.clone();
            let mut pr = to_pull_request(repo, wire);
            if let Err(err) = self
                .pr_details(org, repo, &head_sha, &mut pr, cancel, rate)
                .await {
                // Keep the PR with whatever detail was gathered.
                warn!(
                    repo,
                    number = pr.issue.number,
                    error = %err,
                    "fetching pull request details failed"
                );
            }
            prs.push(pr);
        }
        Ok(prs)
    }

    async fn pr_details(
        &self,
        org: &str,
        repo: &str,
        list_head_sha: &str,
        pr: &mut PullRequest,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<(), GitHubError> {
        let number = pr.issue.number;

        let reviews = self
            .client
            .get_all::<Vec<WireReview>>(
                &format!("/repos/{org}/{repo}/pulls/{number}/reviews"),
                &[],
                cancel,
                rate,
            )
            .await?;
        pr.set_reviewers(latest_reviews(reviews));

        let detail: WirePullDetail = self
            .client
            .get_json(&format!("/repos/{org}/{repo}/pulls/{number}"), &[], rate)
            .await?;
        pr.mergeable_state = detail.mergeable_state.unwrap_or_default();
        pr.review_comments = detail.review_comments;
        pr.comments = pr.comments.max(detail.comments);

        let sha = if detail.head.sha.is_empty() {
            list_head_sha.to_string()
        } else {
            detail.head.sha
        };
        let checks = self.check_runs(org, repo, &sha, cancel, rate).await?;
        pr.set_checks(checks);
        Ok(())
    }

    async fn check_runs(
        &self,
        org: &str,
        repo: &str,
        sha: &str,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<Vec<Check>, GitHubError> {
        let runs = self
            .client
            .get_all::<WireCheckRunPage>(
                &format!("/repos/{org}/{repo}/commits/{sha}/check-runs"),
                &[("filter", "latest")],
                cancel,
                rate,
            )
            .await?;
        Ok(to_checks(runs))
    }

    /// Latest commit of `branch` with its check runs. A failed check-run
    /// listing fails the branch rather than reporting it as having no checks.
    async fn branch_check(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<BranchCheck, GitHubError> {
        let commits: Vec<WireCommit> = self
            .client
            .get_json(
                &format!("/repos/{org}/{repo}/commits"),
                &[("sha", branch), ("per_page", "1")],
                rate,
            )
            .await?;
        let commit = commits
            .into_iter()
            .next()
            .ok_or_else(|| GitHubError::NoCommits {
                branch: branch.to_string(),
            })?;

        let checks = self.check_runs(org, repo, &commit.sha, cancel, rate).await?;
        Ok(to_branch_check(repo, branch, commit, checks))
    }

    /// All configured branches of `repo`. Stops at the first branch that
    /// cannot be fetched.
    async fn repo_branch_checks(
        &self,
        org: &str,
        repo: &RepositoryConfig,
        cancel: &CancellationToken,
        rate: &mut RateTracker,
    ) -> Result<Vec<BranchCheck>, GitHubError> {
        let mut checks = Vec::with_capacity(repo.branches.len());
        for branch in &repo.branches {
            if cancel.is_cancelled() {
                return Err(GitHubError::Cancelled);
            }
            match self.branch_check(org, &repo.name, branch, cancel, rate).await {
                Ok(check) => checks.push(check),
                Err(err) => {
                    warn!(
                        org,
                        repo = %repo.name,
                        branch = %branch,
                        error = %err,
                        rate_limited = err.is_rate_limited(),
                        "fetching branch checks failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(checks)
    }

    fn finish<T>(
        &self,
        mut result: FetchResult<T>,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
        rate: RateTracker,
    ) -> FetchResult<T> {
        result.rate = rate.latest();
        result.finish(repos.iter().map(|r| r.name.as_str()), cancel.is_cancelled())
    }
}

#[async_trait]
impl Collector for GitHubCollector {
    async fn fetch_issues(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<Issue> {
        let mut result = FetchResult::default();
        let mut rate = RateTracker::default();
        for repo in repos {
            if cancel.is_cancelled() {
                break;
            }
            match self.repo_issues(org, &repo.name, cancel, &mut rate).await {
                Ok(issues) => {
                    debug!(repo = %repo.name, count = issues.len(), "fetched issues");
                    result.succeed(repo.name.as_str(), issues);
                }
                Err(err) => {
                    warn!(
                        org,
                        repo = %repo.name,
                        error = %err,
                        rate_limited = err.is_rate_limited(),
                        "fetching issues failed"
                    );
                    result.fail(repo.name.as_str());
                }
            }
        }
        self.finish(result, repos, cancel, rate)
    }

    async fn fetch_pull_requests(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<PullRequest> {
        let mut result = FetchResult::default();
        let mut rate = RateTracker::default();
        for repo in repos {
            if cancel.is_cancelled() {
                break;
            }
            match self
                .repo_pull_requests(org, &repo.name, cancel, &mut rate)
                .await
            {
                Ok(prs) => {
                    debug!(repo = %repo.name, count = prs.len(), "fetched pull requests");
                    result.succeed(repo.name.as_str(), prs);
                }
                Err(err) => {
                    warn!(
                        org,
                        repo = %repo.name,
                        error = %err,
                        rate_limited = err.is_rate_limited(),
                        "fetching pull requests failed"
                    );
                    result.fail(repo.name.as_str());
                }
            }
        }
        self.finish(result, repos, cancel, rate)
    }

    async fn fetch_branch_checks(
        &self,
        org: &str,
        repos: &[RepositoryConfig],
        cancel: &CancellationToken,
    ) -> FetchResult<BranchCheck> {
        let mut result = FetchResult::default();
        let mut rate = RateTracker::default();
        for repo in repos {
            if cancel.is_cancelled() {
                break;
            }
            // A repository only counts as fetched when every configured
            // branch was; otherwise its previous branch records are kept.
            match self.repo_branch_checks(org, repo, cancel, &mut rate).await {
                Ok(checks) => {
                    debug!(repo = %repo.name, count = checks.len(), "fetched branch checks");
                    result.succeed(repo.name.as_str(), checks);
                }
                Err(_) => result.fail(repo.name.as_str()),
            }
        }
        self.finish(result, repos, cancel, rate)
    }
}
