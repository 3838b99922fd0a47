//! Commit message templates.
//!
//! Each category maps to a pattern containing a `{filename}` placeholder.
//! Categories without a pattern fall back to `<word>: update <subject>`.

use std::collections::HashMap;

use crate::commit::category::CommitCategory;

/// Placeholder substituted with the commit subject.
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// Read-only mapping from category to message pattern.
#[derive(Debug, Clone)]
pub struct TemplateTable {
    templates: HashMap<CommitCategory, String>,
}

impl Default for TemplateTable {
    fn default() -> Self {
        let templates = [
            (CommitCategory::Feature, "feat: add {filename}"),
            (CommitCategory::Fix, "fix: resolve issue in {filename}"),
            (
                CommitCategory::Documentation,
                "docs: update documentation for {filename}",
            ),
            (CommitCategory::Style, "style: format {filename}"),
            (
                CommitCategory::Refactor,
                "refactor: improve code structure in {filename}",
            ),
            (CommitCategory::Test, "test: add tests for {filename}"),
            (CommitCategory::Maintenance, "chore: update {filename}"),
        ]
        .into_iter()
        .map(|(category, pattern)| (category, pattern.to_string()))
        .collect();

        Self { templates }
    }
}

impl TemplateTable {
    /// A table with no patterns; every category uses the fallback.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Replace (or add) the pattern for one category.
    pub fn with_template(mut self, category: CommitCategory, pattern: impl Into<String>) -> Self {
        self.templates.insert(category, pattern.into());
        self
    }

    /// The pattern configured for `category`, if any.
    pub fn pattern(&self, category: &CommitCategory) -> Option<&str> {
        self.templates.get(category).map(String::as_str)
    }

    /// Render a commit message.
    ///
    /// `subject` is a single path or an aggregate descriptor. A non-blank
    /// `detail` becomes the message body, separated by a blank line.
    pub fn render(&self, category: &CommitCategory, subject: &str, detail: Option<&str>) -> String {
        let mut message = match self.pattern(category) {
            Some(pattern) => pattern.replace(FILENAME_PLACEHOLDER, subject),
            None => format!("{}: update {}", category.word(), subject),
        };

        if let Some(detail) = detail.map(str::trim).filter(|d| !d.is_empty()) {
            message.push_str("\n\n");
            message.push_str(detail);
        }

        message
    }
}
