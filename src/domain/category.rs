/// One of the three independently fetched data kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Issues,
    PullRequests,
    BranchChecks,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Issues,
        Category::PullRequests,
        Category::BranchChecks,
    ];

    /// Stable short name used in logs and on the query API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::PullRequests => "prs",
            Self::BranchChecks => "checks",
        }
    }

    /// Total lookup by short name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Category::parse("actions"), None);
        assert_eq!(Category::parse(""), None);
    }
}
