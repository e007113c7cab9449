//! Destination path composition from folder-placement rules.
//!
//! Rules are grouped by hierarchy level. Each level contributes at most one
//! path segment, outer levels first:
//!
//! ```
//! use tidyfold::config::FolderRule;
//! use tidyfold::destination::DestinationResolver;
//! use std::path::Path;
//!
//! let rules = vec![
//!     FolderRule::by_extension("Docs", 2, "Documents", &[".pdf"]),
//!     FolderRule::by_extension("Exe", 1, "Exe", &[".exe"]),
//! ];
//! let resolver = DestinationResolver::new(Path::new("/data"), &rules);
//! assert_eq!(
//!     resolver.resolve(Path::new("/data/setup.exe")).unwrap(),
//!     Some(Path::new("/data/Exe").to_path_buf())
//! );
//! assert_eq!(resolver.resolve(Path::new("/data/notes.md")).unwrap(), None);
//! ```

use crate::config::{DateSource, FolderRule, MAX_HIERARCHY_LEVEL, MIN_HIERARCHY_LEVEL, TimePattern};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads the requested timestamp of a file as local time.
///
/// `Created` falls back to the modification time where the platform or
/// filesystem does not record birth time.
pub fn file_date(path: &Path, source: DateSource) -> io::Result<DateTime<Local>> {
    let metadata = fs::metadata(path)?;
    let time = match source {
        DateSource::Modified => metadata.modified()?,
        DateSource::Accessed => metadata.accessed()?,
        DateSource::Created => match metadata.created() {
            Ok(created) => created,
            Err(_) => metadata.modified()?,
        },
    };
    Ok(DateTime::<Local>::from(time))
}

/// Formats the folder name a time-based rule produces for `date`.
pub fn time_segment(date: &DateTime<Local>, pattern: TimePattern) -> String {
    match pattern {
        TimePattern::MonthAbbrev => date.format("%b").to_string(),
        TimePattern::YearMonth => date.format("%Y-%m").to_string(),
        TimePattern::Weekly => date.format("Week_%V_%G").to_string(),
        TimePattern::Daily => date.format("%Y-%m-%d").to_string(),
        TimePattern::Yearly => date.format("%Y").to_string(),
    }
}

/// Lower-cased extension of `path` with a leading dot, or an empty string.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Composes target directories from the enabled folder rules.
#[derive(Debug)]
pub struct DestinationResolver<'a> {
    root: &'a Path,
    levels: Vec<Vec<&'a FolderRule>>,
}

impl<'a> DestinationResolver<'a> {
    /// Groups the enabled rules by level, keeping declaration order within a level.
    pub fn new(root: &'a Path, rules: &'a [FolderRule]) -> Self {
        let levels = (MIN_HIERARCHY_LEVEL..=MAX_HIERARCHY_LEVEL)
            .map(|level| {
                rules
                    .iter()
                    .filter(|rule| rule.enabled && rule.hierarchy_level == level)
                    .collect()
            })
            .collect();

        Self { root, levels }
    }

    /// Computes the destination directory for the file currently at `file_path`.
    ///
    /// Returns `Ok(None)` when no level produced a segment.
    ///
    /// # Errors
    ///
    /// Fails only when a time-based rule needs a timestamp that cannot be read.
    pub fn resolve(&self, file_path: &Path) -> io::Result<Option<PathBuf>> {
        let extension = dotted_extension(file_path);
        let mut destination = self.root.to_path_buf();
        let mut matched_any = false;

        for level_rules in &self.levels {
            for rule in level_rules {
                let segment = if rule.is_time_based {
                    let date = file_date(file_path, rule.date_source)?;
                    time_segment(&date, rule.time_pattern)
                } else if rule.matches_extension(&extension) {
                    rule.folder_name.clone()
                } else {
                    continue;
                };

                destination.push(segment);
                matched_any = true;
                break;
            }
        }

        Ok(matched_any.then_some(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, date: DateTime<Local>) {
        let time: SystemTime = date.into();
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_time_segments() {
        let date = Local.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();

        assert_eq!(time_segment(&date, TimePattern::MonthAbbrev), "Mar");
        assert_eq!(time_segment(&date, TimePattern::YearMonth), "2024-03");
        assert_eq!(time_segment(&date, TimePattern::Weekly), "Week_10_2024");
        assert_eq!(time_segment(&date, TimePattern::Daily), "2024-03-05");
        assert_eq!(time_segment(&date, TimePattern::Yearly), "2024");
    }

    #[test]
    fn test_weekly_uses_iso_week_year() {
        // 2024-12-30 belongs to ISO week 1 of 2025.
        let date = Local.with_ymd_and_hms(2024, 12, 30, 12, 0, 0).unwrap();
        assert_eq!(time_segment(&date, TimePattern::Weekly), "Week_01_2025");
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension(Path::new("a/Report.PDF")), ".pdf");
        assert_eq!(dotted_extension(Path::new("archive.tar.gz")), ".gz");
        assert_eq!(dotted_extension(Path::new("Makefile")), "");
    }

    #[test]
    fn test_no_matching_rule_means_no_destination() {
        let rules = vec![FolderRule::by_extension("Docs", 1, "Documents", &[".pdf"])];
        let resolver = DestinationResolver::new(Path::new("/t"), &rules);
        assert_eq!(resolver.resolve(Path::new("/t/song.mp3")).unwrap(), None);
    }

    #[test]
    fn test_first_matching_rule_per_level_wins() {
        let rules = vec![
            FolderRule::by_extension("Pictures", 1, "Pictures", &[".png"]),
            FolderRule::by_extension("Images", 1, "Images", &[".png", ".jpg"]),
        ];
        let resolver = DestinationResolver::new(Path::new("/t"), &rules);

        assert_eq!(
            resolver.resolve(Path::new("/t/a.png")).unwrap(),
            Some(PathBuf::from("/t/Pictures"))
        );
        assert_eq!(
            resolver.resolve(Path::new("/t/a.JPG")).unwrap(),
            Some(PathBuf::from("/t/Images"))
        );
    }

    #[test]
    fn test_disabled_rules_and_gaps_are_skipped() {
        let mut disabled = FolderRule::by_extension("Off", 1, "Off", &[".pdf"]);
        disabled.enabled = false;
        let rules = vec![
            disabled,
            FolderRule::by_extension("Deep", 4, "Deep", &[".pdf"]),
            FolderRule::by_extension("Mid", 2, "Mid", &[".pdf"]),
        ];
        let resolver = DestinationResolver::new(Path::new("/t"), &rules);

        assert_eq!(
            resolver.resolve(Path::new("/t/x.pdf")).unwrap(),
            Some(PathBuf::from("/t/Mid/Deep"))
        );
    }

    #[test]
    fn test_time_rule_outermost() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("report.pdf");
        fs::write(&file, "pdf").unwrap();
        set_mtime(&file, Local.with_ymd_and_hms(2023, 3, 14, 9, 0, 0).unwrap());

        let rules = vec![
            FolderRule::by_extension("Docs", 2, "Documents", &[".pdf"]),
            FolderRule::by_time("Month", 1, TimePattern::MonthAbbrev, DateSource::Modified),
        ];
        let resolver = DestinationResolver::new(temp_dir.path(), &rules);

        assert_eq!(
            resolver.resolve(&file).unwrap(),
            Some(temp_dir.path().join("Mar").join("Documents"))
        );
    }

    #[test]
    fn test_time_rule_on_missing_file_errors() {
        let rules = vec![FolderRule::by_time(
            "Year",
            1,
            TimePattern::Yearly,
            DateSource::Modified,
        )];
        let resolver = DestinationResolver::new(Path::new("/t"), &rules);
        assert!(resolver.resolve(Path::new("/non/existent.txt")).is_err());
    }
}
