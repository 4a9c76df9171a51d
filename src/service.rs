use tonic::{Request, Response, Status};

use crate::config::{Config, FetchIntervals};
use crate::domain::Category;
use crate::proto::dashboard_server::Dashboard;
use crate::proto::{
    BranchCheckSnapshot, HealthStatus, IssueSnapshot, PullRequestSnapshot, RepoFetchTimes,
    RepoFetchTimesRequest,
};
use crate::proto_convert::to_timestamp;
use crate::staleness::StalenessReport;
use crate::store::memory::InMemoryStore;
use crate::store::{Snapshot, Store};

/// What staleness is measured against.
#[derive(Debug, Clone)]
struct StalenessContext {
    repos: Vec<String>,
    intervals: FetchIntervals,
}

/// Read-only gRPC facade over the snapshot store.
#[derive(Clone)]
pub struct DashboardService {
    store: InMemoryStore,
    staleness: Option<StalenessContext>,
}

impl DashboardService {
    /// Serves snapshots without staleness information.
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            staleness: None,
        }
    }

    pub fn with_config(store: InMemoryStore, config: &Config) -> Self {
        Self {
            store,
            staleness: Some(StalenessContext {
                repos: config.repo_names(),
                intervals: config.fetch_intervals,
            }),
        }
    }

    /// Staleness of one snapshot, measured against the fetch times read with it.
    fn staleness<T>(&self, category: Category, snapshot: &Snapshot<T>) -> StalenessReport {
        let Some(ctx) = &self.staleness else {
            return StalenessReport::not_computed();
        };
        StalenessReport::compute(
            ctx.intervals.for_category(category),
            snapshot.last_update,
            &snapshot.repo_times,
            &ctx.repos,
        )
    }
}

#[tonic::async_trait]
impl Dashboard for DashboardService {
    async fn get_issues(&self, _request: Request<()>) -> Result<Response<IssueSnapshot>, Status> {
        let snapshot = self.store.get_issues().await;
        let report = self.staleness(Category::Issues, &snapshot);
        Ok(Response::new(IssueSnapshot {
            issues: snapshot.records.into_iter().map(Into::into).collect(),
            last_update: snapshot.last_update.map(to_timestamp),
            staleness_computed: report.computed,
            stale_repos: report.stale,
        }))
    }

    async fn get_pull_requests(
        &self,
        _request: Request<()>,
    ) -> Result<Response<PullRequestSnapshot>, Status> {
        let snapshot = self.store.get_pull_requests().await;
        let report = self.staleness(Category::PullRequests, &snapshot);
        Ok(Response::new(PullRequestSnapshot {
            pull_requests: snapshot.records.into_iter().map(Into::into).collect(),
            last_update: snapshot.last_update.map(to_timestamp),
            staleness_computed: report.computed,
            stale_repos: report.stale,
        }))
    }

    async fn get_branch_checks(
        &self,
        _request: Request<()>,
    ) -> Result<Response<BranchCheckSnapshot>, Status> {
        let snapshot = self.store.get_branch_checks().await;
        let report = self.staleness(Category::BranchChecks, &snapshot);
        Ok(Response::new(BranchCheckSnapshot {
            branch_checks: snapshot.records.into_iter().map(Into::into).collect(),
            last_update: snapshot.last_update.map(to_timestamp),
            staleness_computed: report.computed,
            stale_repos: report.stale,
        }))
    }

    async fn get_repo_fetch_times(
        &self,
        request: Request<RepoFetchTimesRequest>,
    ) -> Result<Response<RepoFetchTimes>, Status> {
        let req = request.into_inner();
        let times = self
            .store
            .repo_fetch_times_named(&req.category)
            .await
            .into_iter()
            .map(|(repo, at)| (repo, to_timestamp(at)))
            .collect();
        Ok(Response::new(RepoFetchTimes { times }))
    }

    async fn health(&self, _request: Request<()>) -> Result<Response<HealthStatus>, Status> {
        let last = self.store.last_fetch_times().await;
        Ok(Response::new(HealthStatus {
            status: "ok".to_string(),
            issues: last.issues.map(to_timestamp),
            pull_requests: last.pull_requests.map(to_timestamp),
            branch_checks: last.branch_checks.map(to_timestamp),
        }))
    }
}
