//! Read-only statistics about a folder before organizing it.

use crate::destination::dotted_extension;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How many extensions [`FolderAnalysis`] keeps.
pub const TOP_EXTENSIONS: usize = 10;

/// File counts and sizes of a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderAnalysis {
    pub target_folder: PathBuf,
    pub total_files: usize,
    pub total_bytes: u64,
    /// Most common extensions, most frequent first. Files without an extension
    /// are counted in `total_files` only.
    pub top_extensions: Vec<(String, usize)>,
}

impl fmt::Display for FolderAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total files: {}", self.total_files)?;
        writeln!(
            f,
            "Total size: {:.2} MB\n",
            self.total_bytes as f64 / (1024.0 * 1024.0)
        )?;
        writeln!(f, "Top file types:")?;
        for (extension, count) in &self.top_extensions {
            writeln!(
                f,
                "  {}: {} {}",
                extension,
                count,
                if *count == 1 { "file" } else { "files" }
            )?;
        }
        Ok(())
    }
}

/// Counts every file below `target` by extension and adds up their sizes.
///
/// Unreadable entries are skipped.
///
/// # Errors
///
/// Returns `TargetMissing` if `target` does not exist.
pub fn analyze_folder(target: &Path) -> OrganizeResult<FolderAnalysis> {
    if !target.is_dir() {
        return Err(OrganizeError::TargetMissing {
            path: target.to_path_buf(),
        });
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut analysis = FolderAnalysis {
        target_folder: target.to_path_buf(),
        ..FolderAnalysis::default()
    };

    for entry in WalkDir::new(target).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        analysis.total_files += 1;
        analysis.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);

        let extension = dotted_extension(entry.path());
        if !extension.is_empty() {
            *counts.entry(extension).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(TOP_EXTENSIONS);
    analysis.top_extensions = sorted;

    tracing::debug!(files = analysis.total_files, "folder analyzed");
    Ok(analysis)
}
