//! Periodic fetch-and-merge loops, one per data category.
//!
//! Each category runs as its own tokio task on its own interval so a slow
//! branch-checks fetch never delays issue refreshes. All tasks share one
//! [`CancellationToken`]; once it fires no task writes to the store again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collector::Collector;
use crate::config::{Config, FetchIntervals, RepositoryConfig};
use crate::domain::{Category, FetchResult};
use crate::store::memory::InMemoryStore;
use crate::store::{MergeSummary, Store};

/// What a scheduler needs from the configuration.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub organization: String,
    pub repositories: Vec<RepositoryConfig>,
    pub intervals: FetchIntervals,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            organization: config.github.organization.clone(),
            repositories: config.github.repositories.clone(),
            intervals: config.fetch_intervals,
        }
    }

    pub fn interval(&self, category: Category) -> Duration {
        self.intervals.for_category(category)
    }
}

/// Result of a single [`Scheduler::run_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The store was updated.
    Merged {
        records: usize,
        succeeded: Vec<String>,
        failed: Vec<String>,
    },
    /// Nothing succeeded; the store was left untouched.
    Skipped,
    /// Cancellation fired before the merge.
    Cancelled,
}

#[derive(Clone)]
pub struct Scheduler {
    settings: Arc<SchedulerSettings>,
    collector: Arc<dyn Collector>,
    store: InMemoryStore,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        collector: Arc<dyn Collector>,
        store: InMemoryStore,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            collector,
            store,
        }
    }

    /// Spawns one task per category and returns immediately.
    pub fn start(&self, token: CancellationToken) -> SchedulerHandle {
        let tasks = Category::ALL
            .into_iter()
            .map(|category| {
                let scheduler = self.clone();
                let token = token.clone();
                tokio::spawn(async move { scheduler.run_category(category, token).await })
            })
            .collect();
        SchedulerHandle { token, tasks }
    }

    async fn run_category(self, category: Category, token: CancellationToken) {
        let period = self.settings.interval(category);
        info!(%category, interval_secs = period.as_secs(), "scheduler started");

        // First tick completes immediately.
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_cycle(category, &token).await;
                }
            }
        }

        info!(%category, "scheduler stopped");
    }

    /// One fetch-and-merge pass for `category`.
    pub async fn run_cycle(&self, category: Category, token: &CancellationToken) -> CycleOutcome {
        let org = self.settings.organization.as_str();
        let repos = self.settings.repositories.as_slice();

        match category {
            Category::Issues => {
                let fetch = self.collector.fetch_issues(org, repos, token);
                let Some(result) = token.run_until_cancelled(fetch).await else {
                    return cancelled(category);
                };
                if let Some(outcome) = screen(category, &result, token) {
                    return outcome;
                }
                let count = result.records.len();
                let summary = self
                    .store
                    .merge_issues(result.records, &result.failed, &result.succeeded)
                    .await;
                merged(category, count, summary, result.succeeded, result.failed)
            }
            Category::PullRequests => {
                let fetch = self.collector.fetch_pull_requests(org, repos, token);
                let Some(result) = token.run_until_cancelled(fetch).await else {
                    return cancelled(category);
                };
                if let Some(outcome) = screen(category, &result, token) {
                    return outcome;
                }
                let count = result.records.len();
                let summary = self
                    .store
                    .merge_pull_requests(result.records, &result.failed, &result.succeeded)
                    .await;
                merged(category, count, summary, result.succeeded, result.failed)
            }
            Category::BranchChecks => {
                let fetch = self.collector.fetch_branch_checks(org, repos, token);
                let Some(result) = token.run_until_cancelled(fetch).await else {
                    return cancelled(category);
                };
                if let Some(outcome) = screen(category, &result, token) {
                    return outcome;
                }
                let count = result.records.len();
                let summary = self
                    .store
                    .merge_branch_checks(result.records, &result.failed, &result.succeeded)
                    .await;
                merged(category, count, summary, result.succeeded, result.failed)
            }
        }
    }
}

/// Logs rate-limit state and decides whether the result may be merged.
/// Returns the outcome to report when it may not.
fn screen<T>(
    category: Category,
    result: &FetchResult<T>,
    token: &CancellationToken,
) -> Option<CycleOutcome> {
    if let Some(rate) = result.rate {
        if rate.is_low() {
            warn!(
                %category,
                remaining = rate.remaining,
                limit = rate.limit,
                reset_at = %rate.reset_at,
                "GitHub rate limit running low"
            );
        } else {
            debug!(%category, remaining = rate.remaining, limit = rate.limit, "rate limit");
        }
    }

    if let Some(err) = &result.error {
        error!(%category, error = %err, "fetch failed, keeping previous data");
        return Some(CycleOutcome::Skipped);
    }
    if token.is_cancelled() {
        return Some(cancelled(category));
    }
    None
}

fn cancelled(category: Category) -> CycleOutcome {
    debug!(%category, "fetch cycle cancelled");
    CycleOutcome::Cancelled
}

fn merged(
    category: Category,
    records: usize,
    summary: MergeSummary,
    succeeded: Vec<String>,
    failed: Vec<String>,
) -> CycleOutcome {
    if failed.is_empty() {
        info!(
            %category,
            records,
            succeeded = succeeded.len(),
            retained = summary.retained,
            "fetch cycle merged"
        );
    } else {
        warn!(
            %category,
            records,
            succeeded = succeeded.len(),
            failed = ?failed,
            retained = summary.retained,
            ignored = summary.ignored,
            "fetch cycle merged with failures, keeping previous data for failed repositories"
        );
    }
    CycleOutcome::Merged {
        records,
        succeeded,
        failed,
    }
}

/// Owns the spawned category tasks.
pub struct SchedulerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Waits for every category task to stop.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                error!(error = %err, "scheduler task panicked");
            }
        }
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        self.join().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{BranchCheck, Issue, PullRequest, RateInfo};

    fn make_issue(repo: &str, number: u64) -> Issue {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Issue {
            repository: repo.into(),
            number,
            title: format!("issue {number}"),
            url: String::new(),
            author: "octocat".into(),
            author_avatar: String::new(),
            author_association: Default::default(),
            is_external: true,
            created_at: ts,
            updated_at: ts,
            labels: Vec::new(),
        }
    }

    /// Scripted collector: every repository not listed in `failing` succeeds
    /// with one record. Counts calls per category.
    #[derive(Default)]
    struct FakeCollector {
        failing: Mutex<Vec<String>>,
        hang: bool,
        calls: Mutex<HashMap<Category, usize>>,
        rate_remaining: Option<u32>,
        issues_calls: AtomicUsize,
    }

    impl FakeCollector {
        fn set_failing(&self, repos: &[&str]) {
            *self.failing.lock().unwrap() = repos.iter().map(|r| r.to_string()).collect();
        }

        fn calls(&self, category: Category) -> usize {
            self.calls.lock().unwrap().get(&category).copied().unwrap_or(0)
        }

        async fn respond<T>(
            &self,
            category: Category,
            repos: &[RepositoryConfig],
            cancel: &CancellationToken,
            make: impl Fn(&str) -> T,
        ) -> FetchResult<T> {
            *self.calls.lock().unwrap().entry(category).or_default() += 1;
            if self.hang {
                cancel.cancelled().await;
            }
            let failing = self.failing.lock().unwrap().clone();
            let mut result = FetchResult::default();
            for repo in repos {
                if failing.contains(&repo.name) {
                    result.fail(repo.name.clone());
                } else {
                    result.succeed(repo.name.clone(), [make(&repo.name)]);
                }
            }
            result.rate = self.rate_remaining.map(|remaining| RateInfo {
                limit: 5000,
                remaining,
                reset_at: Utc::now(),
            });
            result.finish(repos.iter().map(|r| r.name.as_str()), cancel.is_cancelled())
        }
    }

    #[async_trait]
    impl Collector for FakeCollector {
        async fn fetch_issues(
            &self,
            _org: &str,
            repos: &[RepositoryConfig],
            cancel: &CancellationToken,
        ) -> FetchResult<Issue> {
            let n = self.issues_calls.fetch_add(1, Ordering::SeqCst) as u64;
            self.respond(Category::Issues, repos, cancel, |r| make_issue(r, n))
                .await
        }

        async fn fetch_pull_requests(
            &self,
            _org: &str,
            repos: &[RepositoryConfig],
            cancel: &CancellationToken,
        ) -> FetchResult<PullRequest> {
            self.respond(Category::PullRequests, repos, cancel, |r| {
                PullRequest::new(make_issue(r, 1))
            })
            .await
        }

        async fn fetch_branch_checks(
            &self,
            _org: &str,
            repos: &[RepositoryConfig],
            cancel: &CancellationToken,
        ) -> FetchResult<BranchCheck> {
            self.respond(Category::BranchChecks, repos, cancel, |r| BranchCheck {
                repository: r.into(),
                branch: "main".into(),
                commit_sha: "abc".into(),
                commit_url: String::new(),
                updated_at: Utc::now(),
                checks: Vec::new(),
            })
            .await
        }
    }

    fn settings() -> SchedulerSettings {
        SchedulerSettings {
            organization: "acme".into(),
            repositories: vec![
                RepositoryConfig::new("a", &["main"]),
                RepositoryConfig::new("b", &["main"]),
            ],
            intervals: FetchIntervals {
                issues: 60,
                pull_requests: 120,
                actions: 30,
            },
        }
    }

    fn scheduler(collector: Arc<FakeCollector>, store: InMemoryStore) -> Scheduler {
        Scheduler::new(settings(), collector, store)
    }

    #[tokio::test]
    async fn cycle_merges_successful_fetch() {
        let collector = Arc::new(FakeCollector::default());
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector, store.clone());

        let outcome = scheduler
            .run_cycle(Category::Issues, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            CycleOutcome::Merged {
                records: 2,
                succeeded: vec!["a".into(), "b".into()],
                failed: vec![],
            }
        );
        let snapshot = store.get_issues().await;
        assert_eq!(snapshot.records.len(), 2);
        assert!(snapshot.last_update.is_some());
    }

    #[tokio::test]
    async fn hard_error_skips_merge() {
        let collector = Arc::new(FakeCollector::default());
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector.clone(), store.clone());
        let token = CancellationToken::new();

        scheduler.run_cycle(Category::PullRequests, &token).await;
        let before = store.get_pull_requests().await;
        let before_times = store.repo_fetch_times(Category::PullRequests).await;
        assert_eq!(before.records.len(), 2);
        assert!(before.last_update.is_some());

        tokio::time::sleep(Duration::from_millis(2)).await;
        collector.set_failing(&["a", "b"]);
        let outcome = scheduler.run_cycle(Category::PullRequests, &token).await;

        assert_eq!(outcome, CycleOutcome::Skipped);
        assert_eq!(store.get_pull_requests().await, before);
        assert_eq!(
            store.repo_fetch_times(Category::PullRequests).await,
            before_times
        );
    }

    #[tokio::test]
    async fn partial_failure_keeps_previous_data() {
        let collector = Arc::new(FakeCollector::default());
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector.clone(), store.clone());
        let token = CancellationToken::new();

        scheduler.run_cycle(Category::Issues, &token).await;
        collector.set_failing(&["b"]);
        let outcome = scheduler.run_cycle(Category::Issues, &token).await;

        assert_eq!(
            outcome,
            CycleOutcome::Merged {
                records: 1,
                succeeded: vec!["a".into()],
                failed: vec!["b".into()],
            }
        );
        let mut kept: Vec<(String, u64)> = store
            .get_issues()
            .await
            .records
            .into_iter()
            .map(|i| (i.repository, i.number))
            .collect();
        kept.sort();
        // "a" refreshed from the second call, "b" retained from the first.
        assert_eq!(kept, vec![("a".into(), 1), ("b".into(), 0)]);
    }

    #[tokio::test]
    async fn low_rate_limit_still_merges() {
        let collector = Arc::new(FakeCollector {
            rate_remaining: Some(5),
            ..Default::default()
        });
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector, store.clone());

        let outcome = scheduler
            .run_cycle(Category::BranchChecks, &CancellationToken::new())
            .await;
        assert!(matches!(outcome, CycleOutcome::Merged { records: 2, .. }));
    }

    #[tokio::test]
    async fn cancelled_fetch_writes_nothing() {
        let collector = Arc::new(FakeCollector {
            hang: true,
            ..Default::default()
        });
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector, store.clone());
        let token = CancellationToken::new();

        let cycle = {
            let scheduler = scheduler.clone();
            let token = token.clone();
            tokio::spawn(async move { scheduler.run_cycle(Category::Issues, &token).await })
        };
        tokio::task::yield_now().await;
        token.cancel();

        assert_eq!(cycle.await.unwrap(), CycleOutcome::Cancelled);
        assert!(store.get_issues().await.records.is_empty());
        assert!(store.last_fetch_times().await.issues.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn each_category_ticks_on_its_own_interval() {
        let collector = Arc::new(FakeCollector::default());
        let store = InMemoryStore::new();
        let scheduler = scheduler(collector.clone(), store.clone());

        let handle = scheduler.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(130)).await;
        handle.shutdown().await;

        // Immediate first cycle, then one per interval.
        assert_eq!(collector.calls(Category::Issues), 3);
        assert_eq!(collector.calls(Category::PullRequests), 2);
        assert_eq!(collector.calls(Category::BranchChecks), 5);
        assert!(store.last_fetch_times().await.branch_checks.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycles_after_shutdown() {
        let collector = Arc::new(FakeCollector::default());
        let scheduler = scheduler(collector.clone(), InMemoryStore::new());
        let token = CancellationToken::new();

        let handle = scheduler.start(token.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.shutdown().await;
        assert!(token.is_cancelled());

        let before = collector.calls(Category::BranchChecks);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(collector.calls(Category::BranchChecks), before);
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_hanging_fetch() {
        let collector = Arc::new(FakeCollector {
            hang: true,
            ..Default::default()
        });
        let store = InMemoryStore::new();
        let handle = scheduler(collector, store.clone()).start(CancellationToken::new());

        tokio::task::yield_now().await;
        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("scheduler should stop promptly");
        assert!(store.get_issues().await.records.is_empty());
    }
}
