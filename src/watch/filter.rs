//! Ignore rules for raw change events.
//!
//! Sources, checked in order:
//! 1. Built-in directories and file names (always active)
//! 2. Extra patterns from configuration (gitignore syntax)
//! 3. Every `.gitignore` in the tree, deepest first
//! 4. `.git/info/exclude`, then the user's `core.excludesFile`
//!
//! From step 3 on, the first rule set with an opinion decides, so a `!`
//! pattern in a nested `.gitignore` re-includes what the root file ignores.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder, gitconfig_excludes_path};
use tracing::{debug, warn};

use crate::error::WatchError;

/// Directories whose contents never produce commits.
const IGNORED_DIRS: &[&str] = &[".git", "__pycache__", ".venv", "venv", ".idea", ".vscode"];

/// Exact file names never committed automatically.
const IGNORED_NAMES: &[&str] = &[".env"];

/// File suffixes for editor swap files and bytecode.
const IGNORED_SUFFIXES: &[&str] = &[".pyc", ".swp"];

pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

pub struct PathFilter {
    root: PathBuf,
    extra: Option<Gitignore>,
    /// Per-directory `.gitignore` files, deepest first.
    gitignores: Vec<Gitignore>,
    /// Repository-wide exclude files.
    excludes: Vec<Gitignore>,
}

impl PathFilter {
    /// Load the filter for a repository root.
    pub fn load(root: &Path, extra_patterns: &[String]) -> Result<Self, WatchError> {
        let extra = if extra_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(root);
            for pattern in extra_patterns {
                builder
                    .add_line(None, pattern)
                    .map_err(|source| WatchError::IgnoreRules {
                        path: PathBuf::from(pattern),
                        source,
                    })?;
            }
            Some(build(&mut builder, root)?)
        };

        let mut excludes = Vec::new();
        let info_exclude = root.join(".git").join("info").join("exclude");
        if let Some(rules) = load_rooted(root, &info_exclude)? {
            excludes.push(rules);
        }
        if let Some(global) = gitconfig_excludes_path() {
            if let Some(rules) = load_rooted(root, &global)? {
                excludes.push(rules);
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            extra,
            gitignores: discover_gitignores(root),
            excludes,
        })
    }

    /// A filter with only the built-in rules.
    pub fn builtin() -> Self {
        Self {
            root: PathBuf::new(),
            extra: None,
            gitignores: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Whether a repository-relative path should be ignored.
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        if is_builtin_ignored(relative) {
            return true;
        }

        let path = self.root.join(relative);
        if let Some(extra) = &self.extra {
            if extra.matched_path_or_any_parents(&path, is_dir).is_ignore() {
                return true;
            }
        }

        for rules in self.gitignores.iter().chain(&self.excludes) {
            if !path.starts_with(rules.path()) {
                continue;
            }
            let matched = rules.matched_path_or_any_parents(&path, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        false
    }
}

/// Every `.gitignore` under `root`, skipping directories git would not
/// descend into.
fn discover_gitignores(root: &Path) -> Vec<Gitignore> {
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .require_git(false)
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !IGNORED_DIRS.contains(&name))
        })
        .build();

    let mut found: Vec<(usize, Gitignore)> = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_name() != GITIGNORE_FILE_NAME || entry.path().is_dir() {
            continue;
        }

        let (rules, err) = Gitignore::new(entry.path());
        if let Some(err) = err {
            warn!("Some rules in {} were skipped: {}", entry.path().display(), err);
        }
        found.push((entry.depth(), rules));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, rules)| rules).collect()
}

/// Rules from `file`, matched relative to `root`. Missing files yield `None`.
fn load_rooted(root: &Path, file: &Path) -> Result<Option<Gitignore>, WatchError> {
    if !file.is_file() {
        return Ok(None);
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(file) {
        warn!("Some rules in {} were skipped: {}", file.display(), err);
    }
    build(&mut builder, file).map(Some)
}

fn build(builder: &mut GitignoreBuilder, path: &Path) -> Result<Gitignore, WatchError> {
    builder.build().map_err(|source| WatchError::IgnoreRules {
        path: path.to_path_buf(),
        source,
    })
}

fn is_builtin_ignored(path: &Path) -> bool {
    let in_ignored_dir = path.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name)),
        _ => false,
    });
    if in_ignored_dir {
        return true;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    IGNORED_NAMES.contains(&name) || IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Run `f` with git's global config looked up under `home` only.
    fn with_home<T>(home: &Path, f: impl FnOnce() -> T) -> T {
        temp_env::with_vars(
            [
                ("HOME", Some(home.as_os_str())),
                ("XDG_CONFIG_HOME", None),
                ("GIT_CONFIG_GLOBAL", None),
            ],
            f,
        )
    }

    #[test]
    fn test_builtin_rules() {
        let filter = PathFilter::builtin();
        assert!(filter.is_ignored(Path::new(".git/index"), false));
        assert!(filter.is_ignored(Path::new("pkg/__pycache__/mod.cpython-312.pyc"), false));
        assert!(filter.is_ignored(Path::new("venv/lib/site.py"), false));
        assert!(filter.is_ignored(Path::new(".env"), false));
        assert!(filter.is_ignored(Path::new("src/.app.ts.swp"), false));
        assert!(!filter.is_ignored(Path::new("src/app.ts"), false));
        assert!(!filter.is_ignored(Path::new(".envrc"), false));
        assert!(!filter.is_ignored(Path::new("docs/git.md"), false));
    }

    #[test]
    fn test_gitignore_rules_apply_to_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n*.log\n").unwrap();

        let filter = PathFilter::load(dir.path(), &[]).unwrap();
        assert!(filter.is_ignored(Path::new("target/debug/app"), false));
        assert!(filter.is_ignored(Path::new("logs/run.log"), false));
        assert!(!filter.is_ignored(Path::new("src/main.ts"), false));
    }

    #[test]
    fn test_extra_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let filter = PathFilter::load(dir.path(), &["*.tmp".to_string(), "build/".to_string()])
            .unwrap();

        assert!(filter.is_ignored(Path::new("scratch.tmp"), false));
        assert!(filter.is_ignored(Path::new("build/out.js"), false));
        assert!(!filter.is_ignored(Path::new("src/build.ts"), false));
    }

    #[test]
    fn test_nested_gitignore_applies_below_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("web/src")).unwrap();
        std::fs::write(dir.path().join("web/.gitignore"), "dist/\n*.map\n").unwrap();

        let filter = PathFilter::load(dir.path(), &[]).unwrap();
        assert!(filter.is_ignored(Path::new("web/dist/app.js"), false));
        assert!(filter.is_ignored(Path::new("web/src/app.js.map"), false));
        assert!(!filter.is_ignored(Path::new("app.js.map"), false));
        assert!(!filter.is_ignored(Path::new("web/src/app.js"), false));
    }

    #[test]
    fn test_nested_negation_overrides_root_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("fixtures")).unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        std::fs::write(dir.path().join("fixtures/.gitignore"), "!expected.log\n").unwrap();

        let filter = PathFilter::load(dir.path(), &[]).unwrap();
        assert!(filter.is_ignored(Path::new("run.log"), false));
        assert!(filter.is_ignored(Path::new("fixtures/other.log"), false));
        assert!(!filter.is_ignored(Path::new("fixtures/expected.log"), false));
    }

    #[test]
    fn test_gitignore_inside_ignored_dir_is_not_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("venv/lib")).unwrap();
        std::fs::write(dir.path().join("venv/.gitignore"), "*\n").unwrap();

        let filter = PathFilter::load(dir.path(), &[]).unwrap();
        assert!(filter.gitignores.is_empty());
    }

    #[test]
    #[serial]
    fn test_info_exclude_rules() {
        let dir = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/info")).unwrap();
        std::fs::write(dir.path().join(".git/info/exclude"), "scratch/\n").unwrap();

        let filter = with_home(home.path(), || PathFilter::load(dir.path(), &[]).unwrap());
        assert!(filter.is_ignored(Path::new("scratch/notes.md"), false));
        assert!(!filter.is_ignored(Path::new("notes.md"), false));
    }

    #[test]
    #[serial]
    fn test_global_excludes_file() {
        let dir = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let excludes = home.path().join("global-ignore");
        std::fs::write(&excludes, ".DS_Store\n*.orig\n").unwrap();
        std::fs::write(
            home.path().join(".gitconfig"),
            format!("[core]\n\texcludesFile = {}\n", excludes.display()),
        )
        .unwrap();

        let filter = with_home(home.path(), || PathFilter::load(dir.path(), &[]).unwrap());
        assert!(filter.is_ignored(Path::new("src/.DS_Store"), false));
        assert!(filter.is_ignored(Path::new("app.ts.orig"), false));
        assert!(!filter.is_ignored(Path::new("app.ts"), false));
    }

    #[test]
    fn test_missing_gitignore_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let filter = PathFilter::load(dir.path(), &[]).unwrap();
        assert!(!filter.is_ignored(Path::new("README.md"), false));
    }
}
