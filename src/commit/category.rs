//! Path-based commit classification.
//!
//! A path is matched against an ordered rule table; the first matching rule
//! decides the category. Test markers are checked before extensions, so
//! `foo.test.ts` is a `test` change rather than a `feature` change.

use std::fmt;
use std::str::FromStr;

/// The category a changed file is committed under.
///
/// The classifier only produces `Documentation`, `Feature`, `Test` and
/// `Maintenance`. The remaining variants exist so templates can be configured
/// for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommitCategory {
    Documentation,
    Feature,
    Test,
    Maintenance,
    Fix,
    Style,
    Refactor,
    /// A category named in configuration that has no built-in meaning.
    Custom(String),
}

impl CommitCategory {
    /// The conventional-commit type word used as the message prefix.
    pub fn word(&self) -> &str {
        match self {
            CommitCategory::Documentation => "docs",
            CommitCategory::Feature => "feat",
            CommitCategory::Test => "test",
            CommitCategory::Maintenance => "chore",
            CommitCategory::Fix => "fix",
            CommitCategory::Style => "style",
            CommitCategory::Refactor => "refactor",
            CommitCategory::Custom(name) => name,
        }
    }

    /// Human-readable name, used for aggregate subjects like
    /// "multiple documentation files".
    pub fn name(&self) -> &str {
        match self {
            CommitCategory::Documentation => "documentation",
            CommitCategory::Feature => "feature",
            CommitCategory::Test => "test",
            CommitCategory::Maintenance => "maintenance",
            CommitCategory::Fix => "fix",
            CommitCategory::Style => "style",
            CommitCategory::Refactor => "refactor",
            CommitCategory::Custom(name) => name,
        }
    }
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommitCategory {
    type Err = std::convert::Infallible;

    /// Accepts either the type word or the name. Anything else becomes
    /// `Custom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "docs" | "documentation" => Self::Documentation,
            "feat" | "feature" => Self::Feature,
            "test" | "tests" => Self::Test,
            "chore" | "maintenance" => Self::Maintenance,
            "fix" => Self::Fix,
            "style" => Self::Style,
            "refactor" => Self::Refactor,
            other => Self::Custom(other.to_string()),
        })
    }
}

enum Matcher {
    Suffix(&'static [&'static str]),
    Contains(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Suffix(suffixes) => suffixes.iter().any(|s| path.ends_with(s)),
            Matcher::Contains(markers) => markers.iter().any(|m| path.contains(m)),
        }
    }
}

const TEST_MARKERS: &[&str] = &[".test.", ".spec."];
const DOC_EXTENSIONS: &[&str] = &[".md", ".txt"];
const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".js", ".py", ".java"];

// First match wins.
fn rules() -> [(Matcher, CommitCategory); 3] {
    [
        (Matcher::Contains(TEST_MARKERS), CommitCategory::Test),
        (Matcher::Suffix(DOC_EXTENSIONS), CommitCategory::Documentation),
        (Matcher::Suffix(SOURCE_EXTENSIONS), CommitCategory::Feature),
    ]
}

/// Classify a path into a commit category.
///
/// Matching is case-sensitive and never fails: paths matching no rule are
/// `Maintenance`.
pub fn classify(path: &str) -> CommitCategory {
    rules()
        .into_iter()
        .find(|(matcher, _)| matcher.matches(path))
        .map(|(_, category)| category)
        .unwrap_or(CommitCategory::Maintenance)
}
