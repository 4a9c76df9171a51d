use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::freshness::{self, FetchStamp, RepoFetchTimes};
use crate::domain::{BranchCheck, Category, Issue, PullRequest, RepoScoped};

use super::{LastFetchTimes, MergeSummary, Snapshot, Store};

/// Latest-known records of one category with their freshness bookkeeping.
#[derive(Debug)]
struct CategorySlot<T> {
    records: Vec<T>,
    last_update: Option<FetchStamp>,
    repo_times: RepoFetchTimes,
}

impl<T> Default for CategorySlot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            last_update: None,
            repo_times: RepoFetchTimes::default(),
        }
    }
}

impl<T: RepoScoped + Clone> CategorySlot<T> {
    fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            records: self.records.clone(),
            last_update: self.last_update.map(|s| s.at()),
            repo_times: freshness::reveal(&self.repo_times),
        }
    }

    fn replace(&mut self, records: Vec<T>, now: DateTime<Utc>) {
        let repos: HashSet<String> = records
            .iter()
            .map(|r| r.repository().to_string())
            .collect();
        freshness::stamp_global(&mut self.last_update, now);
        freshness::stamp_repos(&mut self.repo_times, &repos, now);
        self.records = records;
    }

    fn merge(
        &mut self,
        records: Vec<T>,
        failed: &[String],
        succeeded: &[String],
        now: DateTime<Utc>,
    ) -> MergeSummary {
        let failed: HashSet<&str> = failed.iter().map(String::as_str).collect();

        // A partial page from a repository that ultimately failed must not
        // land next to the data retained for it.
        let (incoming, ignored): (Vec<T>, Vec<T>) = records
            .into_iter()
            .partition(|r| !failed.contains(r.repository()));

        let replaced: HashSet<&str> = succeeded
            .iter()
            .map(String::as_str)
            .chain(incoming.iter().map(RepoScoped::repository))
            .filter(|repo| !failed.contains(repo))
            .collect();

        let mut merged: Vec<T> = std::mem::take(&mut self.records)
            .into_iter()
            .filter(|r| !replaced.contains(r.repository()))
            .collect();
        let summary = MergeSummary {
            retained: merged.len(),
            inserted: incoming.len(),
            ignored: ignored.len(),
        };
        merged.extend(incoming);
        self.records = merged;

        if !succeeded.is_empty() {
            freshness::stamp_global(&mut self.last_update, now);
            freshness::stamp_repos(&mut self.repo_times, succeeded, now);
        }

        summary
    }
}

/// Internal mutable state behind the RwLock.
#[derive(Debug, Default)]
struct InnerState {
    issues: CategorySlot<Issue>,
    pull_requests: CategorySlot<PullRequest>,
    branch_checks: CategorySlot<BranchCheck>,
}

impl InnerState {
    fn repo_times(&self, category: Category) -> &RepoFetchTimes {
        match category {
            Category::Issues => &self.issues.repo_times,
            Category::PullRequests => &self.pull_requests.repo_times,
            Category::BranchChecks => &self.branch_checks.repo_times,
        }
    }
}

/// Maps a record type to its slot in [`InnerState`].
trait Slotted: RepoScoped + Clone + Sized {
    fn slot(state: &InnerState) -> &CategorySlot<Self>;
    fn slot_mut(state: &mut InnerState) -> &mut CategorySlot<Self>;
}

impl Slotted for Issue {
    fn slot(state: &InnerState) -> &CategorySlot<Self> {
        &state.issues
    }
    fn slot_mut(state: &mut InnerState) -> &mut CategorySlot<Self> {
        &mut state.issues
    }
}

impl Slotted for PullRequest {
    fn slot(state: &InnerState) -> &CategorySlot<Self> {
        &state.pull_requests
    }
    fn slot_mut(state: &mut InnerState) -> &mut CategorySlot<Self> {
        &mut state.pull_requests
    }
}

impl Slotted for BranchCheck {
    fn slot(state: &InnerState) -> &CategorySlot<Self> {
        &state.branch_checks
    }
    fn slot_mut(state: &mut InnerState) -> &mut CategorySlot<Self> {
        &mut state.branch_checks
    }
}

/// In-memory implementation of the [`Store`] trait.
///
/// All state is held behind a single [`RwLock`]: readers share it, writers
/// take it exclusively. No I/O ever happens while the lock is held. Cloning
/// the store clones the handle, not the data.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<InnerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(InnerState::default())),
        }
    }

    async fn get<T: Slotted>(&self) -> Snapshot<T> {
        let state = self.state.read().await;
        T::slot(&state).snapshot()
    }

    async fn set<T: Slotted>(&self, records: Vec<T>) {
        let mut state = self.state.write().await;
        T::slot_mut(&mut state).replace(records, Utc::now());
    }

    async fn merge<T: Slotted>(
        &self,
        records: Vec<T>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary {
        let mut state = self.state.write().await;
        T::slot_mut(&mut state).merge(records, failed, succeeded, Utc::now())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    async fn get_issues(&self) -> Snapshot<Issue> {
        self.get().await
    }

    async fn get_pull_requests(&self) -> Snapshot<PullRequest> {
        self.get().await
    }

    async fn get_branch_checks(&self) -> Snapshot<BranchCheck> {
        self.get().await
    }

    async fn set_issues(&self, issues: Vec<Issue>) {
        self.set(issues).await
    }

    async fn set_pull_requests(&self, prs: Vec<PullRequest>) {
        self.set(prs).await
    }

    async fn set_branch_checks(&self, checks: Vec<BranchCheck>) {
        self.set(checks).await
    }

    async fn merge_issues(
        &self,
        issues: Vec<Issue>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary {
        self.merge(issues, failed, succeeded).await
    }

    async fn merge_pull_requests(
        &self,
        prs: Vec<PullRequest>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary {
        self.merge(prs, failed, succeeded).await
    }

    async fn merge_branch_checks(
        &self,
        checks: Vec<BranchCheck>,
        failed: &[String],
        succeeded: &[String],
    ) -> MergeSummary {
        self.merge(checks, failed, succeeded).await
    }

    async fn repo_fetch_times(&self, category: Category) -> HashMap<String, DateTime<Utc>> {
        let state = self.state.read().await;
        freshness::reveal(state.repo_times(category))
    }

    async fn last_fetch_times(&self) -> LastFetchTimes {
        let state = self.state.read().await;
        LastFetchTimes {
            issues: state.issues.last_update.map(|s| s.at()),
            pull_requests: state.pull_requests.last_update.map(|s| s.at()),
            branch_checks: state.branch_checks.last_update.map(|s| s.at()),
        }
    }
}
