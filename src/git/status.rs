//! Parsing of `git status --porcelain` (v1) output.
//!
//! Each line is a two-character status code, a space, then the path:
//!
//! ```text
//!  M src/main.ts
//! ?? notes.md
//! R  old.md -> new.md
//! ```

/// Width of the `XY ` status prefix.
const STATUS_PREFIX_LEN: usize = 3;

/// One changed path from the status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub path: String,
    /// Old path of a staged rename. Committing the rename needs both sides.
    pub renamed_from: Option<String>,
}

impl PendingChange {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            renamed_from: None,
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            path: to.into(),
            renamed_from: Some(from.into()),
        }
    }

    /// Paths git must stage and commit for this change, rename source first.
    pub fn pathspecs(&self) -> impl Iterator<Item = &str> {
        self.renamed_from
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.path.as_str()))
    }
}

/// Extract the changed paths from porcelain status output.
///
/// Renames yield their destination path and keep the source. Copies yield
/// only the destination. Quoted paths are unquoted. Duplicates are dropped,
/// keeping first-seen order.
pub fn parse_porcelain(output: &str) -> Vec<PendingChange> {
    let mut changes: Vec<PendingChange> = Vec::new();

    for line in output.lines() {
        let Some(change) = parse_line(line) else {
            continue;
        };
        if !changes.iter().any(|c| c.path == change.path) {
            changes.push(change);
        }
    }

    changes
}

fn parse_line(line: &str) -> Option<PendingChange> {
    if line.len() <= STATUS_PREFIX_LEN || !line.is_char_boundary(STATUS_PREFIX_LEN) {
        return None;
    }

    let (code, rest) = line.split_at(STATUS_PREFIX_LEN);
    let rest = rest.trim_end_matches('\r');

    let change = match rest.rsplit_once(" -> ") {
        Some((from, to)) if has_code(code, 'R') => PendingChange::renamed(unquote(from), unquote(to)),
        Some((_, to)) if has_code(code, 'C') => PendingChange::new(unquote(to)),
        _ => PendingChange::new(unquote(rest)),
    };

    if change.path.is_empty() { None } else { Some(change) }
}

fn has_code(code: &str, status: char) -> bool {
    code.chars().take(2).any(|c| c == status)
}

/// Undo git's C-style quoting for paths with special characters.
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
