//! Filter/action overrides.
//!
//! Filters are consulted before any folder rule. They are ordered by priority
//! (highest first, declaration order on ties) and the first filter whose
//! criteria all match decides what happens to the file.

use crate::config::{ActionType, DateSource, FilterAction, RENAME_PLACEHOLDER};
use crate::destination::{dotted_extension, file_date};
use chrono::{DateTime, Local};
use std::cmp::Reverse;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// What the caller should do with a file a filter matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDirective {
    /// Remove the file.
    Delete,
    /// Leave the file alone and stop processing it.
    Exclude,
    /// Move the file into this directory, bypassing folder rules.
    MoveTo(PathBuf),
    /// Rename the file in place to this file name, then continue with folder rules.
    Rename(OsString),
}

/// A directive together with the filter that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMatch<'a> {
    pub filter: &'a FilterAction,
    pub directive: FilterDirective,
}

/// Evaluates the enabled filters of a ruleset in priority order.
#[derive(Debug)]
pub struct FilterEngine<'a> {
    root: &'a Path,
    ordered: Vec<&'a FilterAction>,
    now: DateTime<Local>,
}

impl<'a> FilterEngine<'a> {
    /// Orders the enabled filters without touching the configured list.
    pub fn new(root: &'a Path, filters: &'a [FilterAction]) -> Self {
        Self::at(root, filters, Local::now())
    }

    /// Same as [`new`](Self::new) with a fixed reference time for age checks.
    pub fn at(root: &'a Path, filters: &'a [FilterAction], now: DateTime<Local>) -> Self {
        let mut ordered: Vec<&FilterAction> = filters.iter().filter(|f| f.enabled).collect();
        // sort_by_key is stable, so equal priorities keep declaration order
        ordered.sort_by_key(|f| Reverse(f.priority));

        Self { root, ordered, now }
    }

    /// The enabled filters in evaluation order.
    pub fn ordered(&self) -> &[&'a FilterAction] {
        &self.ordered
    }

    /// Returns the directive of the first matching filter, if any.
    ///
    /// # Errors
    ///
    /// Fails when an age criterion has to be checked and the file's
    /// modification time cannot be read.
    pub fn evaluate(&self, file_path: &Path) -> io::Result<Option<FilterMatch<'a>>> {
        for &filter in &self.ordered {
            if self.matches(filter, file_path)? {
                tracing::debug!(path = %file_path.display(), filter = %filter.name, "filter matched");
                return Ok(Some(FilterMatch {
                    filter,
                    directive: self.directive_for(filter, file_path),
                }));
            }
        }
        Ok(None)
    }

    fn matches(&self, filter: &FilterAction, file_path: &Path) -> io::Result<bool> {
        if !filter.file_types.is_empty() {
            let extension = dotted_extension(file_path);
            if !filter.file_types.iter().any(|t| t == &extension) {
                return Ok(false);
            }
        }

        if !filter.name_contains.is_empty() {
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !file_name.contains(&filter.name_contains.to_lowercase()) {
                return Ok(false);
            }
        }

        // Zero days is no age criterion at all.
        if let Some(threshold) = filter.older_than_days
            && threshold > 0
        {
            let modified = file_date(file_path, DateSource::Modified)?;
            let age_days = (self.now - modified).num_days();
            if age_days < 0 || (age_days as u64) < threshold {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn directive_for(&self, filter: &FilterAction, file_path: &Path) -> FilterDirective {
        match filter.action_type {
            ActionType::Delete => FilterDirective::Delete,
            ActionType::Exclude => FilterDirective::Exclude,
            ActionType::MoveToStructure | ActionType::MoveExternal => {
                FilterDirective::MoveTo(self.root.join(&filter.destination))
            }
            ActionType::Rename => {
                FilterDirective::Rename(renamed_file_name(&filter.rename_pattern, file_path))
            }
        }
    }
}

/// Applies a rename pattern to the stem of `file_path`, keeping its extension.
///
/// The stem and extension are spliced in as raw OS strings, so names that
/// are not valid UTF-8 keep their bytes.
///
/// ```
/// use tidyfold::filter::renamed_file_name;
/// use std::path::Path;
///
/// assert_eq!(renamed_file_name("old_{original}", Path::new("/x/Photo.JPG")), "old_Photo.JPG");
/// ```
pub fn renamed_file_name(pattern: &str, file_path: &Path) -> OsString {
    let stem = file_path.file_stem().unwrap_or_default();

    let mut pieces = pattern.split(RENAME_PLACEHOLDER);
    let mut name = OsString::from(pieces.next().unwrap_or_default());
    for piece in pieces {
        name.push(stem);
        name.push(piece);
    }

    if let Some(ext) = file_path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}
