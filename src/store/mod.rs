pub mod memory;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{BranchCheck, Category, Issue, PullRequest};

/// Records of one category with its freshness, all taken under one read lock
/// so the records and the fetch times describe the same merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    /// `None` until at least one repository has succeeded.
    pub last_update: Option<DateTime<Utc>>,
    pub repo_times: HashMap<String, DateTime<Utc>>,
}

/// Global last-update times of all three categories, read in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastFetchTimes {
    pub issues: Option<DateTime<Utc>>,
    pub pull_requests: Option<DateTime<Utc>>,
    pub branch_checks: Option<DateTime<Utc>>,
}

impl LastFetchTimes {
    pub fn for_category(&self, category: Category) -> Option<DateTime<Utc>> {
        match category {
            Category::Issues => self.issues,
            Category::PullRequests => self.pull_requests,
            Category::BranchChecks => self.branch_checks,
        }
    }
}

/// What a merge did to the stored records of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Existing records carried forward for failed or unattempted repositories.
    pub retained: usize,
    /// New records inserted.
    pub inserted: usize,
    /// New records ignored because their repository was reported failed.
    pub ignored: usize,
}

/// The snapshot store the schedulers write to and the query service reads from.
///
/// Reads return owned copies; writes take ownership of their input, so a
/// caller can never alias stored state. Unknown category names are answered
/// with empty results rather than errors.
#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    async fn get_issues(&self) -> Snapshot<Issue>;

    async fn get_pull_requests(&self) -> Snapshot<PullRequest>;

    async fn get_branch_checks(&self) -> Snapshot<BranchCheck>;

    /// Replaces all issues and stamps every repository present in `issues`.
    async fn set_issues(&self, issues: Vec<Issue>);

    async fn set_pull_requests(&self, prs: Vec<PullRequest>);

    async fn set_branch_checks(&self, checks: Vec<BranchCheck>);

    /// Reconciles one fetch cycle. Data for `failed` (and for repositories
    /// missing from both lists) is retained; data for `succeeded` is replaced.
    async fn merge_issues(
        &self,
        issues: Vec<Issue>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary;

    async fn merge_pull_requests(
        &self,
        prs: Vec<PullRequest>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary;

    async fn merge_branch_checks(
        &self,
        checks: Vec<BranchCheck>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary;

    async fn repo_fetch_times(&self, category: Category) -> HashMap<String, DateTime<Utc>>;

    /// Like [`Store::repo_fetch_times`], keyed by short name (`issues`, `prs`, `checks`).
    async fn repo_fetch_times_named(&self, category: &str) -> HashMap<String, DateTime<Utc>> {
        match Category::parse(category) {
            Some(category) => self.repo_fetch_times(category).await,
            None => HashMap::new(),
        }
    }

    async fn last_fetch_times(&self) -> LastFetchTimes;
}
