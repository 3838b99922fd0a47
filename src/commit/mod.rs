//! Commit decisions: classification, message templates, grouping and the
//! orchestrator that drives git.

pub mod batch;
pub mod category;
pub mod orchestrator;
pub mod template;

pub use batch::{PlannedCommit, group_by_category, plan_commits};
pub use category::{CommitCategory, classify};
pub use orchestrator::{BatchOutcome, Orchestrator};
pub use template::TemplateTable;
