//! Runtime configuration and inbox exclusion rules.
//!
//! Configuration is read from TOML. Every key is optional; omitted keys take
//! the built-in defaults shown here:
//!
//! ```toml
//! [inbox]
//! target_dir = "Downloads"
//!
//! [probe]
//! backend = "file"          # or "infer"
//! command = "file"
//! timeout_secs = 10
//!
//! [actions]
//! opener = "open"
//! torrent_app = "/Applications/Transmission Remote GUI.app"
//! timeout_secs = 30
//!
//! [move]
//! on_collision = "rename"   # "skip" or "overwrite"
//!
//! [exclude]
//! filenames = [".DS_Store", "1-Applications", "..."]
//! patterns = ["*.part"]
//! regex = []
//! skip_hidden = false
//! ```

use crate::file_organizer::CollisionPolicy;
use crate::registry::CATEGORY_DIRS;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the inbox folder under the home directory.
pub const TARGET_DIR_ENV: &str = "TARGET_DIR";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
    /// No inbox was given and `HOME` is not set.
    #[error("HOME is not set; pass --inbox explicitly")]
    HomeNotSet,
}

/// Which content inspector backs the content-based classifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// External `file`-compatible command.
    #[default]
    File,
    /// In-process magic-byte sniffing.
    Infer,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub inbox: InboxSettings,
    pub probe: ProbeSettings,
    pub actions: ActionSettings,
    #[serde(rename = "move")]
    pub moves: MoveSettings,
    pub exclude: ExcludeRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSettings {
    /// Inbox folder relative to the home directory.
    pub target_dir: String,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            target_dir: "Downloads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub backend: ProbeBackend,
    pub command: String,
    pub timeout_secs: u64,
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            backend: ProbeBackend::File,
            command: "file".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Launcher invoked as `<opener> <application> <file>`.
    pub opener: String,
    /// Application torrent files are opened in.
    pub torrent_app: PathBuf,
    pub timeout_secs: u64,
}

impl ActionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            opener: "open".to_string(),
            torrent_app: PathBuf::from("/Applications/Transmission Remote GUI.app"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveSettings {
    pub on_collision: CollisionPolicy,
}

/// Rules for leaving inbox entries alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact entry names (system artifacts, category folders).
    pub filenames: Vec<String>,
    /// Glob patterns matched against the entry name.
    pub patterns: Vec<String>,
    /// Regex patterns matched against the entry name.
    pub regex: Vec<String>,
    /// Skip every entry whose name starts with `.`.
    pub skip_hidden: bool,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        let mut filenames: Vec<String> = ["$RECYCLE.BIN", ".DS_Store", ".localized"]
            .into_iter()
            .map(String::from)
            .collect();
        filenames.extend(CATEGORY_DIRS.iter().map(|dir| dir.to_string()));
        filenames.extend(["Icon\r".to_string(), "Telegram Desktop".to_string()]);

        Self {
            filenames,
            patterns: Vec::new(),
            regex: Vec::new(),
            skip_hidden: false,
        }
    }
}

impl SortConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.sortboxrc.toml` in the current directory
    /// 3. Look for `~/.config/sortbox/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid configuration.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").ok();
        Self::load_from(config_path, Path::new("."), home.as_deref())
    }

    fn load_from(
        config_path: Option<&Path>,
        cwd: &Path,
        home: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = cwd.join(".sortboxrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(home) = home.filter(|h| !h.is_empty()) {
            let home_config = Path::new(home)
                .join(".config")
                .join("sortbox")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Resolves the inbox directory from the process environment.
    ///
    /// An explicit path wins; otherwise `$HOME/$TARGET_DIR`, with the configured
    /// `target_dir` standing in when `TARGET_DIR` is unset.
    pub fn resolve_inbox(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").ok();
        let target = std::env::var(TARGET_DIR_ENV).ok();
        self.inbox_from(explicit, home.as_deref(), target.as_deref())
    }

    fn inbox_from(
        &self,
        explicit: Option<&Path>,
        home: Option<&str>,
        target_dir: Option<&str>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let home = home.filter(|h| !h.is_empty()).ok_or(ConfigError::HomeNotSet)?;
        let target = target_dir
            .filter(|t| !t.is_empty())
            .unwrap_or(self.inbox.target_dir.as_str());
        Ok(Path::new(home).join(target))
    }

    /// Compile the exclusion rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_excludes(&self) -> Result<ExcludeFilter, ConfigError> {
        ExcludeFilter::new(&self.exclude)
    }
}

/// Compiled exclusion rules, matched against inbox entry names.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    skip_hidden: bool,
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl ExcludeFilter {
    fn new(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: rules.skip_hidden,
            filenames: rules.filenames.iter().cloned().collect(),
            patterns,
            regexes,
        })
    }

    /// Check if an inbox entry should be left alone.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Exact name match
    /// 2. Hidden entry, when hidden entries are skipped
    /// 3. Glob pattern match
    /// 4. Regex pattern match
    pub fn is_excluded(&self, name: &str) -> bool {
        self.filenames.contains(name)
            || (self.skip_hidden && name.starts_with('.'))
            || self.patterns.iter().any(|pattern| pattern.matches(name))
            || self.regexes.iter().any(|regex| regex.is_match(name))
    }
}
