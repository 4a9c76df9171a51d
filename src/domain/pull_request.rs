use super::check::{Check, CheckCounts};
use super::issue::Issue;
use super::RepoScoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PullState {
    #[default]
    Open,
    Closed,
    Merged,
}

impl PullState {
    /// GitHub reports merged PRs as `closed`; `merged` is derived from `merged_at`.
    pub fn from_api(state: &str, merged: bool) -> Self {
        match (state, merged) {
            (_, true) => Self::Merged,
            ("closed", false) => Self::Closed,
            _ => Self::Open,
        }
    }
}

/// A reviewer's most recent non-comment review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

impl ReviewState {
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "APPROVED" => Some(Self::Approved),
            "CHANGES_REQUESTED" => Some(Self::ChangesRequested),
            "COMMENTED" => Some(Self::Commented),
            "DISMISSED" => Some(Self::Dismissed),
            "PENDING" => Some(Self::Pending),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Commented => "COMMENTED",
            Self::Dismissed => "DISMISSED",
            Self::Pending => "PENDING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reviewer {
    pub login: String,
    pub avatar: String,
    pub state: ReviewState,
}

/// Aggregate review verdict across all reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
}

impl ReviewStatus {
    /// Any change request wins, then any approval, otherwise pending.
    pub fn derive<'a>(reviewers: impl IntoIterator<Item = &'a Reviewer>) -> Self {
        let mut status = Self::Pending;
        for reviewer in reviewers {
            match reviewer.state {
                ReviewState::ChangesRequested => return Self::ChangesRequested,
                ReviewState::Approved => status = Self::Approved,
                _ => {}
            }
        }
        status
    }
}

/// An open pull request. Shares its identity fields with [`Issue`].
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub issue: Issue,
    pub state: PullState,
    pub draft: bool,
    pub base_branch: String,
    pub head_branch: String,
    pub review_status: ReviewStatus,
    pub reviewers: Vec<Reviewer>,
    pub mergeable_state: String,
    pub comments: u64,
    pub review_comments: u64,
    pub checks: Vec<Check>,
    pub check_counts: CheckCounts,
}

impl PullRequest {
    pub fn new(issue: Issue) -> Self {
        Self {
            issue,
            state: PullState::Open,
            draft: false,
            base_branch: String::new(),
            head_branch: String::new(),
            review_status: ReviewStatus::Pending,
            reviewers: Vec::new(),
            mergeable_state: String::new(),
            comments: 0,
            review_comments: 0,
            checks: Vec::new(),
            check_counts: CheckCounts::default(),
        }
    }

    /// Replaces the reviewer list and recomputes the aggregate status.
    pub fn set_reviewers(&mut self, reviewers: Vec<Reviewer>) {
        self.review_status = ReviewStatus::derive(&reviewers);
        self.reviewers = reviewers;
    }

    /// Replaces the check list and recomputes the tallies.
    pub fn set_checks(&mut self, checks: Vec<Check>) {
        self.check_counts = CheckCounts::tally(&checks);
        self.checks = checks;
    }
}

impl RepoScoped for PullRequest {
    fn repository(&self) -> &str {
        &self.issue.repository
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer(login: &str, state: ReviewState) -> Reviewer {
        Reviewer {
            login: login.into(),
            avatar: String::new(),
            state,
        }
    }

    #[test]
    fn no_reviewers_is_pending() {
        assert_eq!(ReviewStatus::derive(&[]), ReviewStatus::Pending);
    }

    #[test]
    fn approval_without_objection_is_approved() {
        let reviewers = [
            reviewer("a", ReviewState::Approved),
            reviewer("b", ReviewState::Pending),
        ];
        assert_eq!(ReviewStatus::derive(&reviewers), ReviewStatus::Approved);
    }

    #[test]
    fn changes_requested_beats_approval() {
        let reviewers = [
            reviewer("a", ReviewState::Approved),
            reviewer("b", ReviewState::ChangesRequested),
            reviewer("c", ReviewState::Approved),
        ];
        assert_eq!(
            ReviewStatus::derive(&reviewers),
            ReviewStatus::ChangesRequested
        );
    }

    #[test]
    fn merged_flag_overrides_state() {
        assert_eq!(PullState::from_api("closed", true), PullState::Merged);
        assert_eq!(PullState::from_api("closed", false), PullState::Closed);
        assert_eq!(PullState::from_api("open", false), PullState::Open);
    }

    #[test]
    fn review_state_parse_round_trips() {
        for state in [
            ReviewState::Approved,
            ReviewState::ChangesRequested,
            ReviewState::Commented,
            ReviewState::Dismissed,
            ReviewState::Pending,
        ] {
            assert_eq!(ReviewState::parse(state.as_str()), Some(state));
        }
        assert_eq!(ReviewState::parse(""), None);
    }
}
