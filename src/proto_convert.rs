use chrono::{DateTime, Utc};
use prost_types::Timestamp;

use crate::domain::{
    AuthorAssociation, BranchCheck, Check, Issue, Label, PullRequest, PullState, ReviewStatus,
    Reviewer,
};
use crate::proto;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },
}

// --- Timestamps ---

pub fn to_timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

pub fn from_timestamp(ts: &Timestamp) -> Result<DateTime<Utc>, ConversionError> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(ts.seconds, nanos))
        .ok_or(ConversionError::InvalidTimestamp {
            seconds: ts.seconds,
            nanos: ts.nanos,
        })
}

// --- Enum conversions ---

impl From<AuthorAssociation> for proto::AuthorAssociation {
    fn from(value: AuthorAssociation) -> Self {
        match value {
            AuthorAssociation::Owner => Self::Owner,
            AuthorAssociation::Member => Self::Member,
            AuthorAssociation::Collaborator => Self::Collaborator,
            AuthorAssociation::Contributor => Self::Contributor,
            AuthorAssociation::FirstTimeContributor => Self::FirstTimeContributor,
            AuthorAssociation::FirstTimer => Self::FirstTimer,
            AuthorAssociation::Mannequin => Self::Mannequin,
            AuthorAssociation::None => Self::None,
        }
    }
}

impl From<PullState> for proto::PullState {
    fn from(value: PullState) -> Self {
        match value {
            PullState::Open => Self::Open,
            PullState::Closed => Self::Closed,
            PullState::Merged => Self::Merged,
        }
    }
}

impl From<ReviewStatus> for proto::ReviewStatus {
    fn from(value: ReviewStatus) -> Self {
        match value {
            ReviewStatus::Pending => Self::Pending,
            ReviewStatus::Approved => Self::Approved,
            ReviewStatus::ChangesRequested => Self::ChangesRequested,
        }
    }
}

// --- Records ---

impl From<Label> for proto::Label {
    fn from(label: Label) -> Self {
        let text_color = label.text_color().to_string();
        proto::Label {
            name: label.name,
            color: label.color,
            text_color,
        }
    }
}

impl From<Issue> for proto::Issue {
    fn from(issue: Issue) -> Self {
        proto::Issue {
            repository: issue.repository,
            number: issue.number,
            title: issue.title,
            url: issue.url,
            author: issue.author,
            author_avatar: issue.author_avatar,
            author_association: proto::AuthorAssociation::from(issue.author_association) as i32,
            is_external: issue.is_external,
            created_at: Some(to_timestamp(issue.created_at)),
            updated_at: Some(to_timestamp(issue.updated_at)),
            labels: issue.labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Reviewer> for proto::Reviewer {
    fn from(reviewer: Reviewer) -> Self {
        proto::Reviewer {
            login: reviewer.login,
            avatar: reviewer.avatar,
            state: reviewer.state.as_str().to_string(),
        }
    }
}

impl From<Check> for proto::Check {
    fn from(check: Check) -> Self {
        proto::Check {
            name: check.name,
            status: check.status,
            conclusion: check.conclusion,
            url: check.url,
        }
    }
}

impl From<PullRequest> for proto::PullRequest {
    fn from(pr: PullRequest) -> Self {
        proto::PullRequest {
            issue: Some(pr.issue.into()),
            state: proto::PullState::from(pr.state) as i32,
            draft: pr.draft,
            base_branch: pr.base_branch,
            head_branch: pr.head_branch,
            review_status: proto::ReviewStatus::from(pr.review_status) as i32,
            reviewers: pr.reviewers.into_iter().map(Into::into).collect(),
            mergeable_state: pr.mergeable_state,
            comments: pr.comments,
            review_comments: pr.review_comments,
            checks: pr.checks.into_iter().map(Into::into).collect(),
            checks_success: pr.check_counts.success,
            checks_failure: pr.check_counts.failure,
            checks_running: pr.check_counts.running,
        }
    }
}

impl From<BranchCheck> for proto::BranchCheck {
    fn from(branch: BranchCheck) -> Self {
        proto::BranchCheck {
            repository: branch.repository,
            branch: branch.branch,
            commit_sha: branch.commit_sha,
            commit_url: branch.commit_url,
            updated_at: Some(to_timestamp(branch.updated_at)),
            checks: branch.checks.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::ReviewState;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap() + chrono::Duration::milliseconds(250)
    }

    #[test]
    fn timestamp_keeps_subsecond_precision() {
        let proto_ts = to_timestamp(ts());
        assert_eq!(proto_ts.nanos, 250_000_000);
        assert_eq!(from_timestamp(&proto_ts).unwrap(), ts());
    }

    #[test]
    fn negative_nanos_rejected() {
        let bad = Timestamp {
            seconds: 0,
            nanos: -1,
        };
        assert!(from_timestamp(&bad).is_err());
    }

    #[test]
    fn enums_never_map_to_unspecified() {
        assert_ne!(
            proto::AuthorAssociation::from(AuthorAssociation::None),
            proto::AuthorAssociation::Unspecified
        );
        assert_eq!(
            proto::PullState::from(PullState::Merged),
            proto::PullState::Merged
        );
        assert_eq!(
            proto::ReviewStatus::from(ReviewStatus::Pending),
            proto::ReviewStatus::Pending
        );
    }

    #[test]
    fn pull_request_carries_counts_and_reviewers() {
        let issue = Issue {
            repository: "widgets".into(),
            number: 4,
            title: "t".into(),
            url: "u".into(),
            author: "a".into(),
            author_avatar: String::new(),
            author_association: AuthorAssociation::Member,
            is_external: false,
            created_at: ts(),
            updated_at: ts(),
            labels: vec![Label::new("bug", "000000")],
        };
        let mut pr = PullRequest::new(issue);
        pr.set_reviewers(vec![Reviewer {
            login: "alice".into(),
            avatar: String::new(),
            state: ReviewState::ChangesRequested,
        }]);
        pr.set_checks(vec![
            Check {
                name: "build".into(),
                status: "completed".into(),
                conclusion: "success".into(),
                url: String::new(),
            },
            Check {
                name: "test".into(),
                status: "queued".into(),
                conclusion: String::new(),
                url: String::new(),
            },
        ]);

        let out = proto::PullRequest::from(pr);
        assert_eq!(out.checks_success, 1);
        assert_eq!(out.checks_running, 1);
        assert_eq!(out.checks_failure, 0);
        assert_eq!(
            out.review_status,
            proto::ReviewStatus::ChangesRequested as i32
        );
        assert_eq!(out.reviewers[0].state, "CHANGES_REQUESTED");
        let issue = out.issue.unwrap();
        assert_eq!(issue.labels[0].text_color, "#ffffff");
        assert!(from_timestamp(&issue.created_at.unwrap()).is_ok());
    }
}
