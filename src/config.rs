//! Configuration: defaults, then `.autocommit.toml`, then environment.
//!
//! ```toml
//! delay = 30
//! auto_push = false
//! enabled = true
//! remote = "origin"
//! ignore = ["*.tmp", "build/"]
//!
//! [templates]
//! feat = "feat: implement {filename}"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use toml_edit::{DocumentMut, Item};
use tracing::warn;

use crate::commit::{CommitCategory, TemplateTable};
use crate::error::ConfigError;
use crate::git::DEFAULT_REMOTE;

/// Config file looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = ".autocommit.toml";

/// Default quiet period before a changed file is committed.
pub const DEFAULT_DELAY_SECS: u64 = 30;

/// Environment variable overriding the debounce delay (seconds).
const DELAY_ENV_VAR: &str = "AUTOCOMMIT_DELAY";

/// Environment variable overriding auto-push.
const AUTO_PUSH_ENV_VAR: &str = "AUTOCOMMIT_AUTO_PUSH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub delay_secs: u64,
    pub auto_push: bool,
    pub enabled: bool,
    pub remote: String,
    /// Extra ignore patterns, gitignore syntax.
    pub ignore: Vec<String>,
    /// Template overrides, applied on top of the defaults.
    pub templates: Vec<(CommitCategory, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_DELAY_SECS,
            auto_push: false,
            enabled: false,
            remote: DEFAULT_REMOTE.to_string(),
            ignore: Vec::new(),
            templates: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration for a repository root.
    ///
    /// A missing config file is not an error.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| {
                ConfigError::ReadFailed {
                    path: path.clone(),
                    source,
                }
            })?;
            Self::from_toml(&path, &content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse config file content. `path` is only used in error messages.
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| invalid(path, format!("Invalid TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(item) = doc.get("delay") {
            let delay = item
                .as_integer()
                .ok_or_else(|| invalid(path, "'delay' must be an integer"))?;
            config.delay_secs = u64::try_from(delay)
                .map_err(|_| invalid(path, "'delay' must not be negative"))?;
        }

        if let Some(item) = doc.get("auto_push") {
            config.auto_push = bool_value(path, "auto_push", item)?;
        }

        if let Some(item) = doc.get("enabled") {
            config.enabled = bool_value(path, "enabled", item)?;
        }

        if let Some(item) = doc.get("remote") {
            config.remote = item
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| invalid(path, "'remote' must be a non-empty string"))?
                .to_string();
        }

        if let Some(item) = doc.get("ignore") {
            let array = item
                .as_array()
                .ok_or_else(|| invalid(path, "'ignore' must be an array of strings"))?;
            for value in array.iter() {
                let pattern = value
                    .as_str()
                    .ok_or_else(|| invalid(path, "'ignore' must be an array of strings"))?;
                config.ignore.push(pattern.to_string());
            }
        }

        if let Some(item) = doc.get("templates") {
            let table = item
                .as_table_like()
                .ok_or_else(|| invalid(path, "'templates' must be a table"))?;
            for (key, value) in table.iter() {
                let pattern = value
                    .as_str()
                    .ok_or_else(|| invalid(path, format!("template '{}' must be a string", key)))?;
                let category = key.parse::<CommitCategory>().unwrap_or_else(|e| match e {});
                config.templates.push((category, pattern.to_string()));
            }
        }

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var(DELAY_ENV_VAR) {
            if !value.is_empty() {
                match value.trim().parse::<u64>() {
                    Ok(secs) => self.delay_secs = secs,
                    Err(_) => warn!(
                        "Invalid {} value '{}', using {}s",
                        DELAY_ENV_VAR, value, self.delay_secs
                    ),
                }
            }
        }

        if let Ok(value) = env::var(AUTO_PUSH_ENV_VAR) {
            if !value.is_empty() {
                match parse_bool(&value) {
                    Some(flag) => self.auto_push = flag,
                    None => warn!(
                        "Invalid {} value '{}', using {}",
                        AUTO_PUSH_ENV_VAR, value, self.auto_push
                    ),
                }
            }
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Default templates with the configured overrides applied.
    pub fn template_table(&self) -> TemplateTable {
        self.templates
            .iter()
            .fold(TemplateTable::default(), |table, (category, pattern)| {
                table.with_template(category.clone(), pattern.clone())
            })
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

fn bool_value(path: &Path, key: &str, item: &Item) -> Result<bool, ConfigError> {
    item.as_bool()
        .ok_or_else(|| invalid(path, format!("'{}' must be true or false", key)))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
