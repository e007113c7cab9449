//! File relocation with collision handling.
//!
//! This module moves, renames and deletes files on behalf of the organizer.
//! It creates destination directories as needed, resolves name collisions at
//! the destination, and describes every mutation it performs as an
//! [`Operation`] so the run can log it.
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A single applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A file was moved to a new directory.
    Moved { from: PathBuf, to: PathBuf },
    /// A file was renamed in place.
    Renamed { from: PathBuf, to: PathBuf },
    /// A file was removed.
    Deleted { path: PathBuf },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moved { from, to } => {
                write!(f, "Moved: {} → {}", from.display(), to.display())
            }
            Self::Renamed { from, to } => {
                write!(f, "Renamed: {} → {}", from.display(), to.display())
            }
            Self::Deleted { path } => write!(f, "Deleted: {}", path.display()),
        }
    }
}

/// Result of moving one file into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at the contained path.
    Moved(Operation),
    /// An older file with the same name was deleted and the source took its place.
    ReplacedOlder { removed: Operation, moved: Operation },
    /// The destination already held a newer file, so the source was deleted.
    SourceDiscarded(Operation),
}

impl MoveOutcome {
    /// All mutations in the order they happened.
    pub fn operations(&self) -> Vec<&Operation> {
        match self {
            Self::Moved(moved) => vec![moved],
            Self::ReplacedOlder { removed, moved } => vec![removed, moved],
            Self::SourceDiscarded(removed) => vec![removed],
        }
    }

    /// True when the source file ended up at the destination.
    pub fn is_moved(&self) -> bool {
        !matches!(self, Self::SourceDiscarded(_))
    }
}

/// Errors that can occur during file organization operations.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The target directory does not exist.
    #[error("Target folder does not exist: {}", .path.display())]
    TargetMissing { path: PathBuf },

    /// The target path exists but is not a directory.
    #[error("Target is not a directory: {}", .path.display())]
    TargetNotDirectory { path: PathBuf },

    /// Another run is already working on this target.
    #[error("An organization run is already in progress for {}", .path.display())]
    RunInProgress { path: PathBuf },

    /// The organizer already completed a run; runs are single-pass.
    #[error("This organizer has already run")]
    AlreadyRun,

    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to move or rename a file.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    FileMoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to remove a file.
    #[error("Failed to delete {}: {source}", .path.display())]
    FileDeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File metadata needed for a decision could not be read.
    #[error("Failed to read metadata of {}: {source}", .path.display())]
    MetadataFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write the backup log.
    #[error("Failed to write backup log {}: {reason}", .path.display())]
    LogWriteFailed { path: PathBuf, reason: String },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Moves, renames and deletes files for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOrganizer {
    delete_duplicates: bool,
}

impl FileOrganizer {
    /// With `delete_duplicates` set, a name collision keeps only the newer file;
    /// otherwise the incoming file gets a `_N` suffix.
    pub fn new(delete_duplicates: bool) -> Self {
        Self { delete_duplicates }
    }

    /// Lists `dir` and its ancestors that do not exist yet, outermost first.
    pub fn missing_directories(dir: &Path) -> Vec<PathBuf> {
        let mut missing: Vec<PathBuf> = dir
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        missing.reverse();
        missing
    }

    /// Creates `dir` including intermediate directories and returns those it created.
    pub fn ensure_directory(dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
        let missing = Self::missing_directories(dir);
        if !missing.is_empty() {
            fs::create_dir_all(dir).map_err(|source| OrganizeError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(missing)
    }

    /// Finds a free path for `file_name` in `dir`, appending `_1`, `_2`, …
    /// before the extension while the name is taken.
    ///
    /// The name is handled as raw OS bytes, so names that are not valid
    /// UTF-8 come out unchanged apart from the suffix.
    pub fn free_path(dir: &Path, file_name: impl AsRef<OsStr>) -> PathBuf {
        let file_name = file_name.as_ref();
        let candidate = dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }

        let name = Path::new(file_name);
        let stem = name.file_stem().unwrap_or_default();
        let extension = name.extension();

        (1..)
            .map(|counter| {
                let mut numbered = OsString::from(stem);
                numbered.push(format!("_{}", counter));
                if let Some(ext) = extension {
                    numbered.push(".");
                    numbered.push(ext);
                }
                dir.join(numbered)
            })
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }

    /// Moves `file_path` into `dest_dir`, creating the directory if necessary.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidyfold::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let mover = FileOrganizer::new(false);
    /// match mover.move_into(Path::new("/data/a.pdf"), Path::new("/data/Documents")) {
    ///     Ok(outcome) => outcome.operations().iter().for_each(|op| println!("{}", op)),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn move_into(&self, file_path: &Path, dest_dir: &Path) -> OrganizeResult<MoveOutcome> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::FileMoveFailure {
                from: file_path.to_path_buf(),
                to: dest_dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
            })?;

        Self::ensure_directory(dest_dir)?;

        let candidate = dest_dir.join(file_name);
        if !candidate.exists() {
            return Ok(MoveOutcome::Moved(relocate(file_path, &candidate)?));
        }

        if self.delete_duplicates {
            let source_modified = modified(file_path)?;
            let existing_modified = modified(&candidate)?;

            if source_modified > existing_modified {
                let removed = Self::delete(&candidate)?;
                let moved = relocate(file_path, &candidate)?;
                return Ok(MoveOutcome::ReplacedOlder { removed, moved });
            }

            tracing::debug!(
                source = %file_path.display(),
                existing = %candidate.display(),
                "destination copy is newer, discarding source"
            );
            return Ok(MoveOutcome::SourceDiscarded(Self::delete(file_path)?));
        }

        let destination = Self::free_path(dest_dir, file_name);
        Ok(MoveOutcome::Moved(relocate(file_path, &destination)?))
    }

    /// Renames a file within its directory, picking a free name on collision.
    pub fn rename_in_place(
        file_path: &Path,
        new_name: impl AsRef<OsStr>,
    ) -> OrganizeResult<Operation> {
        let new_name = new_name.as_ref();
        let parent = file_path.parent().unwrap_or_else(|| Path::new(""));
        let target = parent.join(new_name);
        if target == file_path {
            return Ok(Operation::Renamed {
                from: file_path.to_path_buf(),
                to: target,
            });
        }

        let target = Self::free_path(parent, new_name);
        fs::rename(file_path, &target).map_err(|source| OrganizeError::FileMoveFailure {
            from: file_path.to_path_buf(),
            to: target.clone(),
            source,
        })?;

        Ok(Operation::Renamed {
            from: file_path.to_path_buf(),
            to: target,
        })
    }

    /// Removes a file.
    pub fn delete(file_path: &Path) -> OrganizeResult<Operation> {
        fs::remove_file(file_path).map_err(|source| OrganizeError::FileDeleteFailed {
            path: file_path.to_path_buf(),
            source,
        })?;
        Ok(Operation::Deleted {
            path: file_path.to_path_buf(),
        })
    }
}

fn modified(path: &Path) -> OrganizeResult<std::time::SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| OrganizeError::MetadataFailed {
            path: path.to_path_buf(),
            source,
        })
}

/// Renames `from` to `to`, falling back to copy + verify + delete across devices.
fn relocate(from: &Path, to: &Path) -> OrganizeResult<Operation> {
    let result = fs::rename(from, to).or_else(|e| {
        if e.kind() != io::ErrorKind::CrossesDevices {
            return Err(e);
        }
        let source_size = fs::metadata(from)?.len();
        fs::copy(from, to)?;

        let dest_size = fs::metadata(to)?.len();
        if dest_size != source_size {
            let _ = fs::remove_file(to);
            return Err(io::Error::other(format!(
                "Copy verification failed: source {} bytes, dest {} bytes",
                source_size, dest_size
            )));
        }

        fs::remove_file(from)
    });

    result.map_err(|source| OrganizeError::FileMoveFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;

    Ok(Operation::Moved {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_with_mtime(path: &Path, content: &str, age: Duration) {
        fs::write(path, content).expect("Failed to write test file");
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[test]
    fn test_move_creates_nested_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let dest = base_path.join("Mar").join("Documents");
        let outcome = FileOrganizer::new(false)
            .move_into(&file_path, &dest)
            .expect("Failed to move file");

        assert!(outcome.is_moved());
        assert!(!file_path.exists());
        assert!(dest.join("test.txt").exists());
        assert_eq!(
            outcome.operations()[0].to_string(),
            format!(
                "Moved: {} → {}",
                file_path.display(),
                dest.join("test.txt").display()
            )
        );
    }

    #[test]
    fn test_collisions_get_numbered_suffixes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let dest = base_path.join("Documents");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("report.pdf"), "existing").unwrap();

        let mover = FileOrganizer::new(false);
        for (i, dir) in ["a", "b"].iter().enumerate() {
            let src_dir = base_path.join(dir);
            fs::create_dir(&src_dir).unwrap();
            let src = src_dir.join("report.pdf");
            fs::write(&src, format!("incoming {}", i)).unwrap();
            mover.move_into(&src, &dest).expect("Failed to move file");
        }

        assert_eq!(fs::read_to_string(dest.join("report.pdf")).unwrap(), "existing");
        assert_eq!(fs::read_to_string(dest.join("report_1.pdf")).unwrap(), "incoming 0");
        assert_eq!(fs::read_to_string(dest.join("report_2.pdf")).unwrap(), "incoming 1");
    }

    #[test]
    fn test_dedup_discards_older_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Documents");
        fs::create_dir(&dest).unwrap();
        let existing = dest.join("a.txt");
        let source = temp_dir.path().join("a.txt");
        write_with_mtime(&existing, "newer", Duration::from_secs(60));
        write_with_mtime(&source, "older", Duration::from_secs(3600));

        let outcome = FileOrganizer::new(true).move_into(&source, &dest).unwrap();

        assert!(!outcome.is_moved());
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "newer");
    }

    #[test]
    fn test_dedup_replaces_older_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let dest = temp_dir.path().join("Documents");
        fs::create_dir(&dest).unwrap();
        let existing = dest.join("a.txt");
        let source = temp_dir.path().join("a.txt");
        write_with_mtime(&existing, "older", Duration::from_secs(3600));
        write_with_mtime(&source, "newer", Duration::from_secs(60));

        let outcome = FileOrganizer::new(true).move_into(&source, &dest).unwrap();

        assert!(outcome.is_moved());
        assert_eq!(outcome.operations().len(), 2);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&existing).unwrap(), "newer");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = FileOrganizer::new(false)
            .move_into(&temp_dir.path().join("gone.txt"), &temp_dir.path().join("x"));
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
    }

    #[test]
    fn test_rename_in_place_avoids_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        fs::write(&source, "a").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();

        let op = FileOrganizer::rename_in_place(&source, "b.txt").unwrap();

        assert_eq!(
            op,
            Operation::Renamed {
                from: source.clone(),
                to: temp_dir.path().join("b_1.txt"),
            }
        );
        assert_eq!(fs::read_to_string(temp_dir.path().join("b.txt")).unwrap(), "b");
    }

    #[test]
    fn test_missing_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("x").join("y");

        assert_eq!(
            FileOrganizer::missing_directories(&nested),
            vec![temp_dir.path().join("x"), nested.clone()]
        );
        let created = FileOrganizer::ensure_directory(&nested).unwrap();
        assert_eq!(created.len(), 2);
        assert!(FileOrganizer::missing_directories(&nested).is_empty());
    }

    // Linux filesystems accept arbitrary bytes in names; macOS rejects them.
    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_survive_moves_and_collisions() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let dest = base_path.join("Documents");
        let latin1 = OsStr::from_bytes(b"caf\xe9.pdf");
        let other = OsStr::from_bytes(b"caf\xe8.pdf");

        fs::write(base_path.join(latin1), "first").unwrap();
        fs::write(base_path.join(other), "second").unwrap();
        let mover = FileOrganizer::new(false);
        mover.move_into(&base_path.join(latin1), &dest).unwrap();
        mover.move_into(&base_path.join(other), &dest).unwrap();

        // Distinct undecodable names must not collapse onto one another.
        assert_eq!(fs::read_to_string(dest.join(latin1)).unwrap(), "first");
        assert_eq!(fs::read_to_string(dest.join(other)).unwrap(), "second");

        fs::write(base_path.join(latin1), "third").unwrap();
        mover.move_into(&base_path.join(latin1), &dest).unwrap();
        let numbered = dest.join(OsStr::from_bytes(b"caf\xe9_1.pdf"));
        assert_eq!(fs::read_to_string(numbered).unwrap(), "third");
    }
}
