//! Ruleset configuration.
//!
//! A configuration describes one organization run: the target folder, the
//! folder-placement rules, the filter/action overrides and the run-wide
//! settings. It is loaded once, validated, and then handed to the
//! [`Organizer`](crate::organizer::Organizer) as a read-only value.
//!
//! # Configuration File Format
//!
//! JSON is the canonical format. Files ending in `.toml` are read and written
//! as TOML instead.
//!
//! ```json
//! {
//!   "target_folder": "/home/user/Downloads",
//!   "folder_rules": [
//!     { "name": "By month", "hierarchy_level": 1, "is_time_based": true,
//!       "time_pattern": "MMM", "date_source": "modified" },
//!     { "name": "Documents", "hierarchy_level": 2, "folder_name": "Documents",
//!       "file_extensions": [".pdf", ".docx"] }
//!   ],
//!   "filter_actions": [
//!     { "name": "Old temp files", "file_types": [".tmp"], "older_than_days": 30,
//!       "action_type": "delete", "priority": 10 }
//!   ],
//!   "settings": { "exclude_files": ["Thumbs.db"] }
//! }
//! ```
//!
//! Unknown fields are rejected; omitted optional fields take their defaults.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Lowest hierarchy level a folder rule may use.
pub const MIN_HIERARCHY_LEVEL: u8 = 1;
/// Highest hierarchy level a folder rule may use.
pub const MAX_HIERARCHY_LEVEL: u8 = 5;

/// Placeholder substituted with the original file stem in rename patterns.
pub const RENAME_PLACEHOLDER: &str = "{original}";

/// Name of the per-directory configuration file picked up by [`Config::load`].
pub const LOCAL_CONFIG_FILE: &str = ".tidyfold.json";

/// Errors that can occur while loading, validating or saving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// IO error while reading configuration.
    #[error("IO error reading configuration {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON/TOML or does not match the schema.
    #[error("Invalid configuration syntax: {0}")]
    ConfigParse(String),

    /// The file parsed but violates a rule invariant.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Writing the configuration back to disk failed.
    #[error("Failed to write configuration {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

/// Date-derived folder naming scheme for time-based rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimePattern {
    /// Three-letter month name, e.g. `Mar`.
    #[default]
    #[serde(rename = "MMM")]
    MonthAbbrev,
    /// `YYYY-MM`
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    /// `Week_<iso week>_<iso year>`
    Weekly,
    /// `YYYY-MM-DD`
    Daily,
    /// `YYYY`
    Yearly,
}

/// Which file timestamp feeds a time-based rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    #[default]
    Modified,
    Created,
    Accessed,
}

/// What a matching filter does with the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionType {
    /// Move into a folder inside the organized structure.
    #[default]
    #[serde(rename = "move")]
    MoveToStructure,
    /// Move to a folder outside the target tree.
    #[serde(rename = "move_external")]
    MoveExternal,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "exclude")]
    Exclude,
    #[serde(rename = "rename")]
    Rename,
}

impl ActionType {
    /// Returns true for either move variant.
    pub fn is_move(self) -> bool {
        matches!(self, ActionType::MoveToStructure | ActionType::MoveExternal)
    }
}

/// A folder-placement rule producing one path segment at its hierarchy level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderRule {
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 1..=5, lower levels become outer directories.
    #[serde(default = "default_hierarchy_level")]
    pub hierarchy_level: u8,

    /// Static folder name used by extension-based rules.
    #[serde(default)]
    pub folder_name: String,

    /// Extensions with a leading dot, compared case-insensitively.
    #[serde(default)]
    pub file_extensions: Vec<String>,

    #[serde(default)]
    pub is_time_based: bool,

    #[serde(default)]
    pub time_pattern: TimePattern,

    #[serde(default)]
    pub date_source: DateSource,

    /// Cosmetic only.
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl FolderRule {
    /// Creates an enabled extension-based rule.
    pub fn by_extension(name: &str, level: u8, folder_name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            hierarchy_level: level,
            folder_name: folder_name.to_string(),
            file_extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            is_time_based: false,
            time_pattern: TimePattern::default(),
            date_source: DateSource::default(),
            icon: default_icon(),
        }
    }

    /// Creates an enabled time-based rule.
    pub fn by_time(name: &str, level: u8, pattern: TimePattern, source: DateSource) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            hierarchy_level: level,
            folder_name: String::new(),
            file_extensions: Vec::new(),
            is_time_based: true,
            time_pattern: pattern,
            date_source: source,
            icon: "📅".to_string(),
        }
    }

    /// Checks whether `extension` (with or without leading dot) belongs to this rule.
    pub fn matches_extension(&self, extension: &str) -> bool {
        let wanted = normalize_extension(extension);
        !wanted.is_empty()
            && self
                .file_extensions
                .iter()
                .any(|ext| normalize_extension(ext) == wanted)
    }
}

/// A higher-priority override rule evaluated before placement rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterAction {
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Extension criterion. Empty means any extension.
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Case-insensitive substring criterion on the file name. Empty means any name.
    #[serde(default)]
    pub name_contains: String,

    /// Minimum file age in whole days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub older_than_days: Option<u64>,

    #[serde(default)]
    pub action_type: ActionType,

    /// Destination folder for move actions. Relative paths are taken from the target root.
    #[serde(default)]
    pub destination: PathBuf,

    /// Rename pattern containing [`RENAME_PLACEHOLDER`].
    #[serde(default)]
    pub rename_pattern: String,

    /// Higher values are evaluated first.
    #[serde(default)]
    pub priority: i32,
}

impl FilterAction {
    /// Creates an enabled filter with no criteria and the given action.
    pub fn new(name: &str, action_type: ActionType) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            file_types: Vec::new(),
            name_contains: String::new(),
            older_than_days: None,
            action_type,
            destination: PathBuf::new(),
            rename_pattern: String::new(),
            priority: 0,
        }
    }
}

/// Run-wide policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Persist a backup log after an apply run.
    #[serde(default = "default_true")]
    pub create_backup_log: bool,

    /// On a name collision keep the newer file instead of auto-renaming.
    #[serde(default)]
    pub delete_duplicates: bool,

    /// Skip directories that already look organized.
    #[serde(default = "default_true")]
    pub exclude_organized_folders: bool,

    /// `YYYY-MM-DD`; files modified before it are left alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_before_date: Option<String>,

    /// Directory-name substrings to skip.
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,

    /// File-name substrings to skip.
    #[serde(default = "default_exclude_files")]
    pub exclude_files: Vec<String>,

    /// Where backup logs are written.
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
}

impl Settings {
    /// Parses `exclude_before_date`.
    ///
    /// A malformed date yields `None` so that nothing gets excluded by it.
    pub fn exclude_before(&self) -> Option<NaiveDate> {
        let raw = self.exclude_before_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(date = raw, error = %e, "ignoring malformed exclude_before_date");
                None
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            create_backup_log: true,
            delete_duplicates: false,
            exclude_organized_folders: true,
            exclude_before_date: None,
            exclude_folders: default_exclude_folders(),
            exclude_files: default_exclude_files(),
            log_directory: default_log_directory(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_hierarchy_level() -> u8 {
    MIN_HIERARCHY_LEVEL
}

fn default_icon() -> String {
    "📁".to_string()
}

fn default_exclude_folders() -> Vec<String> {
    ["node_modules", ".git", ".vscode", "__pycache__"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_files() -> Vec<String> {
    ["desktop.ini", "Thumbs.db", ".DS_Store"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_invoice_folder() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .map(|documents| documents.join("Invoices"))
        .unwrap_or_else(|| PathBuf::from("Invoices"))
}

fn default_log_directory() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("TidyfoldLogs")
}

/// Lower-cases an extension and gives it a leading dot. Blank input stays blank.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    format!(".{}", trimmed.to_lowercase())
}

/// A complete, validated ruleset for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub target_folder: PathBuf,

    #[serde(default)]
    pub folder_rules: Vec<FolderRule>,

    #[serde(default)]
    pub filter_actions: Vec<FilterAction>,

    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    /// Creates an empty ruleset for `target_folder`.
    pub fn new(target_folder: impl Into<PathBuf>) -> Self {
        Self {
            target_folder: target_folder.into(),
            folder_rules: Vec::new(),
            filter_actions: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Builds the stock ruleset: months at level 1, file kinds at level 2,
    /// executables in their own level-1 folder, plus two example filters
    /// that send invoices to `<documents>/Invoices` and delete temp files
    /// older than 30 days.
    pub fn default_rules(target_folder: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(target_folder);
        config.folder_rules = vec![
            FolderRule::by_time(
                "Time-Based Organization",
                1,
                TimePattern::MonthAbbrev,
                DateSource::Modified,
            ),
            FolderRule::by_extension(
                "Images",
                2,
                "Images",
                &[
                    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".tiff",
                    ".raw",
                ],
            ),
            FolderRule::by_extension(
                "Documents",
                2,
                "Documents",
                &[
                    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".csv",
                    ".rtf", ".odt",
                ],
            ),
            FolderRule::by_extension(
                "Code",
                2,
                "Code",
                &[
                    ".js", ".py", ".html", ".css", ".java", ".cpp", ".c", ".h", ".php", ".rb",
                    ".go", ".rs", ".swift", ".kt", ".ts", ".jsx", ".vue", ".json", ".xml",
                    ".yaml", ".sql",
                ],
            ),
            FolderRule::by_extension(
                "Videos",
                2,
                "Videos",
                &[
                    ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".m4v", ".mpg",
                    ".mpeg", ".3gp", ".ogv",
                ],
            ),
            FolderRule::by_extension(
                "Executables",
                1,
                "Exe",
                &[
                    ".exe", ".msi", ".app", ".deb", ".dmg", ".pkg", ".bat", ".sh", ".appimage",
                ],
            ),
        ];
        config.filter_actions = vec![
            FilterAction {
                file_types: vec![".pdf".to_string(), ".xlsx".to_string()],
                name_contains: "invoice".to_string(),
                destination: default_invoice_folder(),
                ..FilterAction::new("Invoice Handler", ActionType::MoveExternal)
            },
            FilterAction {
                file_types: vec![".tmp".to_string(), ".temp".to_string(), ".cache".to_string()],
                older_than_days: Some(30),
                ..FilterAction::new("Delete Old Temp Files", ActionType::Delete)
            },
        ];
        config
    }

    /// Load configuration from a file, with fallback to discovery.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tidyfold.json` in the current directory
    /// 3. Look for `<config dir>/tidyfold/config.json`
    /// 4. Fall back to [`Config::default_rules`] targeting the current directory
    ///
    /// # Errors
    ///
    /// Returns an error if a discovered or explicit file cannot be read,
    /// parsed or validated.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tidyfold").join("config.json");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        tracing::debug!("no configuration file found, using default rules");
        Ok(Self::default_rules("."))
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        if is_toml(path) {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ConfigParse(e.to_string()))?;
        config.validated()
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigParse(e.to_string()))?;
        config.validated()
    }

    /// Writes this configuration to `path`, as TOML if the extension says so.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |reason: String| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason,
        };

        let content = if is_toml(path) {
            toml::to_string_pretty(self).map_err(|e| write_failed(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| write_failed(e.to_string()))?
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| write_failed(e.to_string()))
    }

    /// Checks rule invariants and normalizes extensions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigInvalid` naming the first offending rule.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        for rule in &mut self.folder_rules {
            if !(MIN_HIERARCHY_LEVEL..=MAX_HIERARCHY_LEVEL).contains(&rule.hierarchy_level) {
                return Err(ConfigError::ConfigInvalid(format!(
                    "folder rule '{}' has hierarchy level {}, expected {}-{}",
                    rule.name, rule.hierarchy_level, MIN_HIERARCHY_LEVEL, MAX_HIERARCHY_LEVEL
                )));
            }
            if rule.is_time_based && !rule.file_extensions.is_empty() {
                return Err(ConfigError::ConfigInvalid(format!(
                    "folder rule '{}' is time-based and cannot list extensions",
                    rule.name
                )));
            }
            if !rule.is_time_based && rule.folder_name.trim().is_empty() {
                return Err(ConfigError::ConfigInvalid(format!(
                    "folder rule '{}' needs a folder name",
                    rule.name
                )));
            }
            rule.file_extensions = normalize_all(&rule.file_extensions);
        }

        for filter in &mut self.filter_actions {
            if filter.action_type.is_move() && filter.destination.as_os_str().is_empty() {
                return Err(ConfigError::ConfigInvalid(format!(
                    "filter '{}' moves files but has no destination",
                    filter.name
                )));
            }
            if filter.action_type == ActionType::Rename && filter.rename_pattern.trim().is_empty() {
                return Err(ConfigError::ConfigInvalid(format!(
                    "filter '{}' renames files but has no rename pattern",
                    filter.name
                )));
            }
            filter.file_types = normalize_all(&filter.file_types);
        }

        Ok(self)
    }
}

fn normalize_all(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| normalize_extension(e))
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
