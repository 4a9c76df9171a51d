pub mod category;
pub mod check;
pub mod fetch;
pub mod freshness;
pub mod issue;
pub mod pull_request;

pub use category::Category;
pub use check::{BranchCheck, Check, CheckCounts, CheckOutcome};
pub use fetch::{FetchError, FetchResult, RateInfo};
pub use issue::{AuthorAssociation, Issue, Label};
pub use pull_request::{PullRequest, PullState, ReviewState, ReviewStatus, Reviewer};

/// A record that belongs to exactly one repository.
///
/// The merge store partitions each category by this name.
pub trait RepoScoped {
    fn repository(&self) -> &str;
}
