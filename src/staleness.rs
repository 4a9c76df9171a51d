use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// A repository is stale once its data is older than this many fetch intervals.
pub const STALENESS_MULTIPLIER: u32 = 3;

pub fn staleness_threshold(interval: Duration) -> Duration {
    interval * STALENESS_MULTIPLIER
}

/// Configured repositories whose data is older than `threshold`.
///
/// A repository with no recorded fetch time is stale. Age exactly equal to
/// the threshold is not. Returns `None` when there is nothing to report,
/// including when no repositories are configured.
pub fn classify_stale_at(
    now: DateTime<Utc>,
    repo_times: &HashMap<String, DateTime<Utc>>,
    threshold: Duration,
    repos: &[String],
) -> Option<BTreeSet<String>> {
    if repos.is_empty() {
        return None;
    }

    let stale: BTreeSet<String> = repos
        .iter()
        .filter(|repo| match repo_times.get(repo.as_str()) {
            None => true,
            Some(at) => match (now - *at).to_std() {
                Ok(age) => age > threshold,
                // Fetched after `now`: fresh.
                Err(_) => false,
            },
        })
        .cloned()
        .collect();

    if stale.is_empty() {
        None
    } else {
        Some(stale)
    }
}

pub fn classify_stale(
    repo_times: &HashMap<String, DateTime<Utc>>,
    threshold: Duration,
    repos: &[String],
) -> Option<BTreeSet<String>> {
    classify_stale_at(Utc::now(), repo_times, threshold, repos)
}

/// Staleness as attached to a query response.
///
/// `computed` is false until the category has been fetched at least once,
/// so a cold start is not reported as "everything stale".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StalenessReport {
    pub computed: bool,
    /// Sorted by name.
    pub stale: Vec<String>,
}

impl StalenessReport {
    pub fn not_computed() -> Self {
        Self::default()
    }

    pub fn compute(
        interval: Duration,
        last_update: Option<DateTime<Utc>>,
        repo_times: &HashMap<String, DateTime<Utc>>,
        repos: &[String],
    ) -> Self {
        Self::compute_at(Utc::now(), interval, last_update, repo_times, repos)
    }

    pub fn compute_at(
        now: DateTime<Utc>,
        interval: Duration,
        last_update: Option<DateTime<Utc>>,
        repo_times: &HashMap<String, DateTime<Utc>>,
        repos: &[String],
    ) -> Self {
        if last_update.is_none() {
            return Self::not_computed();
        }
        let stale = classify_stale_at(now, repo_times, staleness_threshold(interval), repos)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        Self {
            computed: true,
            stale,
        }
    }
}
