//! Wire to domain conversion.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{WireCheckRun, WireCommit, WireIssue, WireLabel, WirePull, WireReview, WireUser};
use crate::domain::{
    AuthorAssociation, BranchCheck, Check, Issue, Label, PullRequest, PullState, ReviewState,
    Reviewer,
};

fn labels(raw: Vec<WireLabel>) -> Vec<Label> {
    raw.into_iter()
        .map(|l| Label::new(l.name, &l.color))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn issue_fields(
    repo: &str,
    number: u64,
    title: String,
    url: String,
    user: Option<WireUser>,
    association: AuthorAssociation,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    raw_labels: Vec<WireLabel>,
) -> Issue {
    let user = user.unwrap_or_default();
    Issue {
        repository: repo.to_string(),
        number,
        title,
        url,
        author: user.login,
        author_avatar: user.avatar_url,
        author_association: association,
        is_external: false,
        created_at,
        updated_at,
        labels: labels(raw_labels),
    }
    .with_association(association)
}

pub fn to_issue(repo: &str, raw: WireIssue) -> Issue {
    issue_fields(
        repo,
        raw.number,
        raw.title,
        raw.html_url,
        raw.user,
        raw.author_association,
        raw.created_at,
        raw.updated_at,
        raw.labels,
    )
}

/// List-level fields only; reviews, checks and mergeability come from
/// follow-up requests.
pub fn to_pull_request(repo: &str, raw: WirePull) -> PullRequest {
    let issue = issue_fields(
        repo,
        raw.number,
        raw.title,
        raw.html_url,
        raw.user,
        raw.author_association,
        raw.created_at,
        raw.updated_at,
        raw.labels,
    );
    let mut pr = PullRequest::new(issue);
    pr.state = PullState::from_api(&raw.state, raw.merged_at.is_some());
    pr.draft = raw.draft;
    pr.base_branch = raw.base.name;
    pr.head_branch = raw.head.name;
    pr.comments = raw.comments;
    pr
}

/// Skipped runs are dropped.
pub fn to_checks(runs: Vec<WireCheckRun>) -> Vec<Check> {
    runs.into_iter()
        .filter(|run| run.conclusion.as_deref() != Some("skipped"))
        .map(|run| Check {
            name: run.name,
            status: run.status,
            conclusion: run.conclusion.unwrap_or_default(),
            url: run.html_url.unwrap_or_default(),
        })
        .collect()
}

pub fn to_branch_check(repo: &str, branch: &str, commit: WireCommit, checks: Vec<Check>) -> BranchCheck {
    let updated_at = commit
        .commit
        .committer
        .and_then(|c| c.date)
        .unwrap_or_default();
    BranchCheck {
        repository: repo.to_string(),
        branch: branch.to_string(),
        commit_sha: commit.sha,
        commit_url: commit.html_url,
        updated_at,
        checks,
    }
}

/// Collapses a PR's review history to one state per reviewer.
///
/// Comment-only and empty reviews are ignored, a dismissal clears the
/// reviewer, and otherwise the latest submitted review wins. Output is
/// sorted by login.
pub fn latest_reviews(reviews: Vec<WireReview>) -> Vec<Reviewer> {
    let mut latest: BTreeMap<String, (Option<DateTime<Utc>>, Reviewer)> = BTreeMap::new();

    for review in reviews {
        let Some(state) = ReviewState::parse(&review.state) else {
            continue;
        };
        if state == ReviewState::Commented {
            continue;
        }
        let user = review.user.unwrap_or_default();
        if state == ReviewState::Dismissed {
            latest.remove(&user.login);
            continue;
        }

        let newer = match latest.get(&user.login) {
            None => true,
            Some((seen, _)) => review.submitted_at > *seen,
        };
        if newer {
            let reviewer = Reviewer {
                login: user.login.clone(),
                avatar: user.avatar_url,
                state,
            };
            latest.insert(user.login, (review.submitted_at, reviewer));
        }
    }

    latest.into_values().map(|(_, reviewer)| reviewer).collect()
}
