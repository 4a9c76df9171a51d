use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::RepoScoped;

/// Fallback for label colors that are not six hex digits.
pub const DEFAULT_LABEL_COLOR: &str = "cccccc";

/// Relative luminance above which dark text is used on a label.
const LUMINANCE_THRESHOLD: f64 = 0.179;

/// How the author of an issue or pull request relates to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Owner,
    Member,
    Collaborator,
    Contributor,
    FirstTimeContributor,
    FirstTimer,
    Mannequin,
    #[default]
    #[serde(other)]
    None,
}

impl AuthorAssociation {
    /// Owners, members and collaborators are internal; everyone else is external.
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Owner | Self::Member | Self::Collaborator)
    }
}

impl std::fmt::Display for AuthorAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "OWNER"),
            Self::Member => write!(f, "MEMBER"),
            Self::Collaborator => write!(f, "COLLABORATOR"),
            Self::Contributor => write!(f, "CONTRIBUTOR"),
            Self::FirstTimeContributor => write!(f, "FIRST_TIME_CONTRIBUTOR"),
            Self::FirstTimer => write!(f, "FIRST_TIMER"),
            Self::Mannequin => write!(f, "MANNEQUIN"),
            Self::None => write!(f, "NONE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    /// Six hex digits, no leading `#`.
    pub color: String,
}

impl Label {
    /// Builds a label, replacing an unusable color with [`DEFAULT_LABEL_COLOR`].
    pub fn new(name: impl Into<String>, color: &str) -> Self {
        Self {
            name: name.into(),
            color: sanitize_color(color),
        }
    }

    /// `#000000` or `#ffffff`, whichever contrasts with the label background.
    pub fn text_color(&self) -> &'static str {
        contrast_text_color(&self.color)
    }
}

/// An open issue in one of the tracked repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub repository: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub author_avatar: String,
    pub author_association: AuthorAssociation,
    pub is_external: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub labels: Vec<Label>,
}

impl Issue {
    /// Sets the association and derives the external-contributor flag from it.
    pub fn with_association(mut self, association: AuthorAssociation) -> Self {
        self.author_association = association;
        self.is_external = !association.is_internal();
        self
    }
}

impl RepoScoped for Issue {
    fn repository(&self) -> &str {
        &self.repository
    }
}

pub fn sanitize_color(color: &str) -> String {
    if color.len() == 6 && color.bytes().all(|b| b.is_ascii_hexdigit()) {
        color.to_string()
    } else {
        DEFAULT_LABEL_COLOR.to_string()
    }
}

/// WCAG relative luminance of a six-digit hex color.
fn relative_luminance(hex: &str) -> f64 {
    let channel = |range: std::ops::Range<usize>| {
        let raw = hex
            .get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0xcc);
        linearize(f64::from(raw) / 255.0)
    };
    0.2126 * channel(0..2) + 0.7152 * channel(2..4) + 0.0722 * channel(4..6)
}

fn linearize(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn contrast_text_color(hex: &str) -> &'static str {
    if relative_luminance(hex) > LUMINANCE_THRESHOLD {
        "#000000"
    } else {
        "#ffffff"
    }
}
