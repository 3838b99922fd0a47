//! Grouping pending changes into one commit per category.

use crate::commit::category::{CommitCategory, classify};
use crate::commit::template::TemplateTable;
use crate::git::PendingChange;

/// A commit the batch path intends to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommit {
    pub category: CommitCategory,
    /// Paths committed together, in first-seen order.
    pub files: Vec<String>,
    /// Paths the commit is limited to: `files` plus rename sources.
    pub pathspecs: Vec<String>,
    pub message: String,
}

/// Group paths by category.
///
/// Groups appear in the order their first path appears, and paths keep
/// their input order within a group.
pub fn group_by_category(paths: &[String]) -> Vec<(CommitCategory, Vec<String>)> {
    let mut groups: Vec<(CommitCategory, Vec<String>)> = Vec::new();

    for path in paths {
        let category = classify(path);
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, files)) => files.push(path.clone()),
            None => groups.push((category, vec![path.clone()])),
        }
    }

    groups
}

/// Subject for a group: the path itself for a single file, otherwise an
/// aggregate descriptor.
pub fn group_subject(category: &CommitCategory, files: &[String]) -> String {
    match files {
        [only] => only.clone(),
        _ => format!("multiple {} files", category.name()),
    }
}

/// Build the commit plan for a set of pending changes.
pub fn plan_commits(changes: &[PendingChange], templates: &TemplateTable) -> Vec<PlannedCommit> {
    let paths: Vec<String> = changes.iter().map(|c| c.path.clone()).collect();

    group_by_category(&paths)
        .into_iter()
        .map(|(category, files)| {
            let pathspecs = changes
                .iter()
                .filter(|c| files.contains(&c.path))
                .flat_map(|c| c.pathspecs().map(str::to_string))
                .collect();
            let subject = group_subject(&category, &files);
            let detail = (files.len() > 1).then(|| {
                files
                    .iter()
                    .map(|f| format!("- {}", f))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            let message = templates.render(&category, &subject, detail.as_deref());

            PlannedCommit {
                category,
                files,
                pathspecs,
                message,
            }
        })
        .collect()
}
