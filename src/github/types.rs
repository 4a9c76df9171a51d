//! Wire shapes of the GitHub REST endpoints the collector reads. Only the
//! fields we use are declared; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::domain::AuthorAssociation;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUser {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// An entry of `GET /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct WireIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: Option<WireUser>,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    /// Present when the "issue" is really a pull request.
    pub pull_request: Option<IgnoredAny>,
}

impl WireIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireRef {
    #[serde(rename = "ref", default)]
    pub name: String,
    #[serde(default)]
    pub sha: String,
}

/// An entry of `GET /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePull {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: Option<WireUser>,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<WireLabel>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub base: WireRef,
    #[serde(default)]
    pub head: WireRef,
    #[serde(default)]
    pub comments: u64,
}

/// `GET /repos/{owner}/{repo}/pulls/{number}`; only the fields the list
/// endpoint leaves out.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePullDetail {
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub head: WireRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireReview {
    pub user: Option<WireUser>,
    #[serde(default)]
    pub state: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCheckRun {
    pub name: String,
    #[serde(default)]
    pub status: String,
    pub conclusion: Option<String>,
    pub html_url: Option<String>,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}/check-runs` wraps its list.
#[derive(Debug, Clone, Deserialize)]
pub struct WireCheckRunPage {
    #[serde(default)]
    pub check_runs: Vec<WireCheckRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: WireCommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireCommitDetail {
    pub committer: Option<WireSignature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSignature {
    pub date: Option<DateTime<Utc>>,
}

/// One page of a paginated endpoint.
pub trait Paged: DeserializeOwned {
    type Item;

    fn into_items(self) -> Vec<Self::Item>;
}

impl<T: DeserializeOwned> Paged for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

impl Paged for WireCheckRunPage {
    type Item = WireCheckRun;

    fn into_items(self) -> Vec<WireCheckRun> {
        self.check_runs
    }
}
