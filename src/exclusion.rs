//! Exclusion checks applied before any rule is consulted.
//!
//! Files are excluded by name substring or by an optional modification-date
//! cutoff. Directories are skipped by name substring or, when enabled, because
//! they already look like output of a previous run.

use crate::config::{Config, DateSource, Settings};
use crate::destination::file_date;
use chrono::{NaiveDate, NaiveTime};
use std::path::Path;

/// Decides which files and directories are left out of a run entirely.
#[derive(Debug)]
pub struct ExclusionEvaluator<'a> {
    settings: &'a Settings,
    cutoff: Option<NaiveDate>,
    organized_folder_names: Vec<&'a str>,
}

impl<'a> ExclusionEvaluator<'a> {
    /// Builds an evaluator for one run. The cutoff date is parsed once here.
    pub fn new(config: &'a Config) -> Self {
        let organized_folder_names = if config.settings.exclude_organized_folders {
            config
                .folder_rules
                .iter()
                .filter(|rule| rule.enabled && !rule.is_time_based)
                .map(|rule| rule.folder_name.as_str())
                .filter(|name| !name.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        Self {
            settings: &config.settings,
            cutoff: config.settings.exclude_before(),
            organized_folder_names,
        }
    }

    /// Returns true when the file must not be touched.
    ///
    /// A timestamp that cannot be read never excludes the file.
    pub fn is_file_excluded(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .settings
            .exclude_files
            .iter()
            .any(|pattern| !pattern.is_empty() && file_name.contains(pattern.as_str()))
        {
            return true;
        }

        if let Some(cutoff) = self.cutoff {
            match file_date(file_path, DateSource::Modified) {
                Ok(modified) => {
                    return modified.naive_local() < cutoff.and_time(NaiveTime::MIN);
                }
                Err(e) => {
                    tracing::debug!(path = %file_path.display(), error = %e, "cannot read timestamp for date exclusion");
                }
            }
        }

        false
    }

    /// Returns true when the walk should not descend into `dir`.
    ///
    /// `root` itself is never skipped, and folder-name matching for organized
    /// folders only looks at the part of the path below `root`.
    pub fn is_dir_skipped(&self, root: &Path, dir: &Path) -> bool {
        let Ok(relative) = dir.strip_prefix(root) else {
            return false;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self
            .settings
            .exclude_folders
            .iter()
            .any(|pattern| !pattern.is_empty() && dir_name.contains(pattern.as_str()))
        {
            return true;
        }

        let relative = relative.to_string_lossy();
        self.organized_folder_names
            .iter()
            .any(|name| relative.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FolderRule, TimePattern};
    use chrono::{Local, TimeZone};
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn config_with(settings: Settings) -> Config {
        let mut config = Config::new("/target");
        config.settings = settings;
        config
    }

    #[test]
    fn test_excluded_by_name_substring() {
        let config = config_with(Settings {
            exclude_files: vec!["Thumbs.db".to_string()],
            ..Settings::default()
        });
        let evaluator = ExclusionEvaluator::new(&config);

        assert!(evaluator.is_file_excluded(Path::new("/target/Thumbs.db")));
        assert!(evaluator.is_file_excluded(Path::new("/target/old_Thumbs.db.bak")));
        assert!(!evaluator.is_file_excluded(Path::new("/target/thumbs.png")));
    }

    #[test]
    fn test_cutoff_date_excludes_older_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let old_file = temp_dir.path().join("old.txt");
        let new_file = temp_dir.path().join("new.txt");
        fs::write(&old_file, "old").unwrap();
        fs::write(&new_file, "new").unwrap();

        let old_time: SystemTime = Local
            .with_ymd_and_hms(2019, 6, 1, 12, 0, 0)
            .unwrap()
            .into();
        fs::File::options()
            .write(true)
            .open(&old_file)
            .unwrap()
            .set_modified(old_time)
            .unwrap();

        let config = config_with(Settings {
            exclude_before_date: Some("2020-01-01".to_string()),
            ..Settings::default()
        });
        let evaluator = ExclusionEvaluator::new(&config);

        assert!(evaluator.is_file_excluded(&old_file));
        assert!(!evaluator.is_file_excluded(&new_file));
    }

    #[test]
    fn test_cutoff_ignored_for_missing_file_and_bad_date() {
        let config = config_with(Settings {
            exclude_before_date: Some("2099-01-01".to_string()),
            ..Settings::default()
        });
        let evaluator = ExclusionEvaluator::new(&config);
        assert!(!evaluator.is_file_excluded(Path::new("/non/existent/file.txt")));

        let config = config_with(Settings {
            exclude_before_date: Some("not a date".to_string()),
            ..Settings::default()
        });
        let evaluator = ExclusionEvaluator::new(&config);
        assert!(!evaluator.is_file_excluded(Path::new("/non/existent/file.txt")));
    }

    #[test]
    fn test_dir_skipped_by_exclude_folders() {
        let config = config_with(Settings::default());
        let evaluator = ExclusionEvaluator::new(&config);
        let root = Path::new("/target");

        assert!(evaluator.is_dir_skipped(root, Path::new("/target/app/node_modules")));
        assert!(evaluator.is_dir_skipped(root, Path::new("/target/.git")));
        assert!(!evaluator.is_dir_skipped(root, Path::new("/target/src")));
        assert!(!evaluator.is_dir_skipped(root, root));
    }

    #[test]
    fn test_dir_skipped_when_already_organized() {
        let mut config = config_with(Settings::default());
        config.folder_rules = vec![
            FolderRule::by_extension("Docs", 2, "Documents", &[".pdf"]),
            FolderRule::by_time("Month", 1, TimePattern::MonthAbbrev, DateSource::Modified),
        ];
        let evaluator = ExclusionEvaluator::new(&config);
        let root = Path::new("/home/user/Documents/inbox");

        assert!(evaluator.is_dir_skipped(root, &root.join("Mar").join("Documents")));
        // The target's own ancestors do not count.
        assert!(!evaluator.is_dir_skipped(root, &root.join("Mar")));

        config.settings.exclude_organized_folders = false;
        let evaluator = ExclusionEvaluator::new(&config);
        assert!(!evaluator.is_dir_skipped(root, &root.join("Mar").join("Documents")));
    }
}
