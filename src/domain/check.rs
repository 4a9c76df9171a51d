use chrono::{DateTime, Utc};

use super::RepoScoped;

/// A single CI check run as reported by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub status: String,
    pub conclusion: String,
    pub url: String,
}

impl Check {
    pub fn outcome(&self) -> CheckOutcome {
        CheckOutcome::classify(&self.status, &self.conclusion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    Running,
    Success,
    Failure,
}

impl CheckOutcome {
    /// Only an explicit `success` conclusion passes. Every other completed
    /// conclusion (failure, timed_out, cancelled, action_required, neutral,
    /// stale, unknown) is a failure. Skipped runs are filtered out before
    /// they get here.
    pub fn classify(status: &str, conclusion: &str) -> Self {
        match status {
            "in_progress" | "queued" | "waiting" | "pending" => Self::Running,
            _ if conclusion == "success" => Self::Success,
            _ => Self::Failure,
        }
    }
}

/// Running/success/failure tallies over a list of checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckCounts {
    pub success: u32,
    pub failure: u32,
    pub running: u32,
}

impl CheckCounts {
    pub fn tally<'a>(checks: impl IntoIterator<Item = &'a Check>) -> Self {
        let mut counts = Self::default();
        for check in checks {
            match check.outcome() {
                CheckOutcome::Running => counts.running += 1,
                CheckOutcome::Success => counts.success += 1,
                CheckOutcome::Failure => counts.failure += 1,
            }
        }
        counts
    }
}

/// CI state of the latest commit on one configured branch.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchCheck {
    pub repository: String,
    pub branch: String,
    pub commit_sha: String,
    pub commit_url: String,
    pub updated_at: DateTime<Utc>,
    pub checks: Vec<Check>,
}

impl RepoScoped for BranchCheck {
    fn repository(&self) -> &str {
        &self.repository
    }
}
