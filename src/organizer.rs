//! Run orchestration.
//!
//! An [`Organizer`] takes a validated [`Config`], snapshots the target tree,
//! and pushes every file through the pipeline
//!
//! 1. directory skip check (during the walk)
//! 2. [`ExclusionEvaluator`]
//! 3. [`FilterEngine`]
//! 4. [`DestinationResolver`] when no filter decided the outcome
//! 5. [`FileOrganizer`] in apply mode, or a tally in dry-run mode
//!
//! A run moves through `Scanning → Simulating | Applying → Reporting → Done`
//! exactly once. Per-file failures end up in the report; only a missing target
//! or a concurrent run on the same target abort it.

use crate::config::Config;
use crate::destination::DestinationResolver;
use crate::exclusion::ExclusionEvaluator;
use crate::file_organizer::{FileOrganizer, MoveOutcome, Operation, OrganizeError, OrganizeResult};
use crate::filter::{FilterDirective, FilterEngine};
use crate::operation_log::OperationLog;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use walkdir::WalkDir;

/// Maximum number of sample moves or errors carried in a report.
pub const SAMPLE_LIMIT: usize = 10;

/// Whether a run touches the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Simulate only; nothing on disk changes.
    DryRun,
    /// Perform moves, renames and deletes.
    Apply,
}

/// Lifecycle of a run. States only ever advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    /// Created, not started.
    Idle,
    /// Walking the target to take the file snapshot.
    Scanning,
    /// Dry run in progress.
    Simulating,
    /// Apply run in progress.
    Applying,
    /// All files handled, report being assembled.
    Reporting,
    Done,
}

/// Per-file progress notification.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'p> {
    /// 1-based position of the file in the snapshot.
    pub index: usize,
    /// Number of files in the snapshot.
    pub total: usize,
    /// The file about to be processed.
    pub path: &'p Path,
}

/// A move a dry run would perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    /// Destination directory.
    pub destination: PathBuf,
}

/// Outcome of a dry run.
#[derive(Debug, Clone, Default)]
pub struct DryRunReport {
    pub target_folder: PathBuf,
    pub files_to_move: usize,
    pub files_to_delete: usize,
    pub files_to_rename: usize,
    pub folders_to_create: usize,
    /// First [`SAMPLE_LIMIT`] planned moves.
    pub sample_moves: Vec<PlannedMove>,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

/// Outcome of an apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub target_folder: PathBuf,
    pub files_moved: usize,
    pub files_deleted: usize,
    pub files_renamed: usize,
    pub folders_created: usize,
    /// Every per-file failure, in processing order.
    pub errors: Vec<String>,
    /// Where the backup log was written, if one was.
    pub backup_log: Option<PathBuf>,
    pub cancelled: bool,
}

/// Report of a finished run, as returned by [`Organizer::run`].
///
/// `Display` renders the same text the CLI prints.
#[derive(Debug, Clone)]
pub enum RunReport {
    DryRun(DryRunReport),
    Applied(ApplyReport),
}

impl RunReport {
    /// Per-file error messages collected during the run, in processing order.
    pub fn errors(&self) -> &[String] {
        match self {
            Self::DryRun(report) => &report.errors,
            Self::Applied(report) => &report.errors,
        }
    }
}

const RULE: &str = "==================================================";

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRY RUN REPORT\n{}\n", RULE)?;
        writeln!(f, "Target folder: {}\n", self.target_folder.display())?;
        writeln!(f, "Files to move: {}", self.files_to_move)?;
        writeln!(f, "Files to delete: {}", self.files_to_delete)?;
        writeln!(f, "Files to rename: {}", self.files_to_rename)?;
        writeln!(f, "Folders to create: {}", self.folders_to_create)?;

        if !self.sample_moves.is_empty() {
            writeln!(f, "\nSample moves (first {}):", SAMPLE_LIMIT)?;
            for planned in &self.sample_moves {
                let name = planned
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                writeln!(f, "  {} → {}", name, planned.destination.display())?;
            }
        }

        write_errors(f, &self.errors)?;
        if self.cancelled {
            writeln!(f, "\nRun cancelled before all files were analyzed.")?;
        }
        Ok(())
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ORGANIZATION COMPLETE\n{}\n", RULE)?;
        writeln!(f, "Files moved: {}", self.files_moved)?;
        writeln!(f, "Files deleted: {}", self.files_deleted)?;
        writeln!(f, "Files renamed: {}", self.files_renamed)?;
        writeln!(f, "Folders created: {}", self.folders_created)?;
        writeln!(f, "Errors: {}", self.errors.len())?;

        write_errors(f, &self.errors)?;
        if let Some(log) = &self.backup_log {
            writeln!(f, "\nBackup log: {}", log.display())?;
        }
        if self.cancelled {
            writeln!(f, "\nRun cancelled before all files were processed.")?;
        }
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun(report) => report.fmt(f),
            Self::Applied(report) => report.fmt(f),
        }
    }
}

fn write_errors(f: &mut fmt::Formatter<'_>, errors: &[String]) -> fmt::Result {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(f, "\nErrors encountered:")?;
    for error in errors.iter().take(SAMPLE_LIMIT) {
        writeln!(f, "  {}", error)?;
    }
    if errors.len() > SAMPLE_LIMIT {
        writeln!(f, "  ... and {} more", errors.len() - SAMPLE_LIMIT)?;
    }
    Ok(())
}

/// Holds a target root in the set of in-flight runs until dropped.
#[derive(Debug)]
struct RunGuard {
    key: PathBuf,
}

fn active_runs() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

impl RunGuard {
    fn acquire(target: &Path) -> OrganizeResult<Self> {
        let key = target
            .canonicalize()
            .unwrap_or_else(|_| target.to_path_buf());
        let mut active = active_runs().lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return Err(OrganizeError::RunInProgress { path: key });
        }
        Ok(Self { key })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = active_runs().lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}

/// Counters shared by both modes while files are processed.
#[derive(Debug, Default)]
struct Tally {
    moved: usize,
    deleted: usize,
    renamed: usize,
    folders: HashSet<PathBuf>,
    samples: Vec<PlannedMove>,
    errors: Vec<String>,
}

impl Tally {
    fn plan_move(&mut self, source: &Path, destination: &Path) {
        self.moved += 1;
        self.folders
            .extend(FileOrganizer::missing_directories(destination));
        if self.samples.len() < SAMPLE_LIMIT {
            self.samples.push(PlannedMove {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
            });
        }
    }
}

/// Everything a processed snapshot leaves behind for the report.
struct Pass {
    tally: Tally,
    log: OperationLog,
    cancelled: bool,
    _guard: RunGuard,
}

/// The rule engines for one run, all borrowing the same configuration.
struct Pipeline<'a> {
    root: &'a Path,
    exclusion: ExclusionEvaluator<'a>,
    filters: FilterEngine<'a>,
    resolver: DestinationResolver<'a>,
    mover: FileOrganizer,
}

/// Drives one organization run over a target folder.
pub struct Organizer<'a> {
    config: &'a Config,
    progress: Option<Box<dyn FnMut(Progress<'_>) + 'a>>,
    cancel: Option<Arc<AtomicBool>>,
    state: RunState,
}

impl<'a> Organizer<'a> {
    /// Creates an organizer for a validated configuration.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            progress: None,
            cancel: None,
            state: RunState::Idle,
        }
    }

    /// Registers a callback invoked before each file is processed.
    pub fn with_progress(mut self, callback: impl FnMut(Progress<'_>) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Registers a flag that stops the run between files once set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Where this organizer is in its single run.
    ///
    /// Starts at [`RunState::Idle`] and ends at [`RunState::Done`] once a
    /// report has been produced.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Simulates the run without touching the filesystem.
    pub fn dry_run(&mut self) -> OrganizeResult<DryRunReport> {
        let pass = self.execute(RunMode::DryRun)?;
        let report = DryRunReport {
            target_folder: self.config.target_folder.clone(),
            files_to_move: pass.tally.moved,
            files_to_delete: pass.tally.deleted,
            files_to_rename: pass.tally.renamed,
            folders_to_create: pass.tally.folders.len(),
            sample_moves: pass.tally.samples,
            errors: pass.tally.errors,
            cancelled: pass.cancelled,
        };
        self.finish(report.errors.len());
        Ok(report)
    }

    /// Performs the run and persists the backup log if enabled.
    pub fn apply(&mut self) -> OrganizeResult<ApplyReport> {
        let config = self.config;
        let settings = &config.settings;
        let pass = self.execute(RunMode::Apply)?;
        let mut errors = pass.tally.errors;

        let backup_log = if settings.create_backup_log {
            match pass.log.save(&settings.log_directory) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "backup log not written");
                    errors.push(e.to_string());
                    None
                }
            }
        } else {
            None
        };

        let report = ApplyReport {
            target_folder: self.config.target_folder.clone(),
            files_moved: pass.tally.moved,
            files_deleted: pass.tally.deleted,
            files_renamed: pass.tally.renamed,
            folders_created: pass.tally.folders.len(),
            errors,
            backup_log,
            cancelled: pass.cancelled,
        };
        self.finish(report.errors.len());
        Ok(report)
    }

    /// Runs once in the given mode.
    ///
    /// # Errors
    ///
    /// Returns `TargetMissing`/`TargetNotDirectory` when the target folder is
    /// unusable and `RunInProgress` when another run holds the same target.
    /// Nothing is written in either case.
    pub fn run(&mut self, mode: RunMode) -> OrganizeResult<RunReport> {
        match mode {
            RunMode::DryRun => self.dry_run().map(RunReport::DryRun),
            RunMode::Apply => self.apply().map(RunReport::Applied),
        }
    }

    /// Validates the target, snapshots it and processes every file.
    fn execute(&mut self, mode: RunMode) -> OrganizeResult<Pass> {
        let config = self.config;
        let root = config.target_folder.as_path();

        if self.state != RunState::Idle {
            return Err(OrganizeError::AlreadyRun);
        }
        if !root.exists() {
            return Err(OrganizeError::TargetMissing {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(OrganizeError::TargetNotDirectory {
                path: root.to_path_buf(),
            });
        }
        let guard = RunGuard::acquire(root)?;

        tracing::info!(target_folder = %root.display(), ?mode, "starting organization run");

        let pipeline = Pipeline {
            root,
            exclusion: ExclusionEvaluator::new(config),
            filters: FilterEngine::new(root, &config.filter_actions),
            resolver: DestinationResolver::new(root, &config.folder_rules),
            mover: FileOrganizer::new(config.settings.delete_duplicates),
        };

        self.transition(RunState::Scanning);
        let mut tally = Tally::default();
        let files = scan(&pipeline, &mut tally.errors);
        tracing::debug!(files = files.len(), "snapshot taken");

        self.transition(match mode {
            RunMode::DryRun => RunState::Simulating,
            RunMode::Apply => RunState::Applying,
        });

        let mut log = OperationLog::new(root.to_path_buf());
        let mut cancelled = false;
        let total = files.len();

        for (i, file_path) in files.iter().enumerate() {
            if self
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                tracing::info!(processed = i, total, "run cancelled");
                cancelled = true;
                break;
            }
            if let Some(callback) = self.progress.as_mut() {
                callback(Progress {
                    index: i + 1,
                    total,
                    path: file_path,
                });
            }

            if let Err(e) = process_file(&pipeline, file_path, mode, &mut tally, &mut log) {
                let name = file_path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                tracing::warn!(path = %file_path.display(), error = %e, "file not organized");
                tally.errors.push(format!("Error moving {}: {}", name, e));
            }
        }

        self.transition(RunState::Reporting);
        Ok(Pass {
            tally,
            log,
            cancelled,
            _guard: guard,
        })
    }

    fn finish(&mut self, errors: usize) {
        self.transition(RunState::Done);
        tracing::info!(errors, "organization run finished");
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(next > self.state, "run state cannot go back");
        tracing::debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }
}

/// Walks the target once and returns the files to consider, in name order.
fn scan(pipeline: &Pipeline<'_>, errors: &mut Vec<String>) -> Vec<PathBuf> {
    let root = pipeline.root;
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && pipeline.exclusion.is_dir_skipped(root, entry.path()))
        });

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "cannot read directory entry");
                errors.push(format!("Error scanning: {}", e));
            }
        }
    }
    files
}

/// Runs one file through exclusion, filters and placement rules.
fn process_file(
    pipeline: &Pipeline<'_>,
    file_path: &Path,
    mode: RunMode,
    tally: &mut Tally,
    log: &mut OperationLog,
) -> OrganizeResult<()> {
    if pipeline.exclusion.is_file_excluded(file_path) {
        tracing::debug!(path = %file_path.display(), "excluded");
        return Ok(());
    }

    let metadata_error = |source| OrganizeError::MetadataFailed {
        path: file_path.to_path_buf(),
        source,
    };

    let mut current = file_path.to_path_buf();
    if let Some(found) = pipeline.filters.evaluate(file_path).map_err(metadata_error)? {
        match found.directive {
            FilterDirective::Exclude => return Ok(()),
            FilterDirective::Delete => {
                if mode == RunMode::Apply {
                    log.record(FileOrganizer::delete(file_path)?);
                }
                tally.deleted += 1;
                return Ok(());
            }
            FilterDirective::MoveTo(dest_dir) => {
                return relocate(pipeline, file_path, &dest_dir, mode, tally, log);
            }
            FilterDirective::Rename(new_name) => {
                if mode == RunMode::Apply {
                    let operation = FileOrganizer::rename_in_place(file_path, &new_name)?;
                    if let Operation::Renamed { to, .. } = &operation {
                        current = to.clone();
                    }
                    log.record(operation);
                }
                tally.renamed += 1;
            }
        }
    }

    // A simulated rename keeps the extension and timestamps, so resolving the
    // original path yields the same destination.
    match pipeline.resolver.resolve(&current).map_err(metadata_error)? {
        Some(dest_dir) => relocate(pipeline, &current, &dest_dir, mode, tally, log),
        None => Ok(()),
    }
}

/// Moves `file_path` into `dest_dir` unless it already lives there.
fn relocate(
    pipeline: &Pipeline<'_>,
    file_path: &Path,
    dest_dir: &Path,
    mode: RunMode,
    tally: &mut Tally,
    log: &mut OperationLog,
) -> OrganizeResult<()> {
    if file_path.parent() == Some(dest_dir) {
        return Ok(());
    }

    match mode {
        RunMode::DryRun => tally.plan_move(file_path, dest_dir),
        RunMode::Apply => {
            tally
                .folders
                .extend(FileOrganizer::ensure_directory(dest_dir)?);
            let outcome = pipeline.mover.move_into(file_path, dest_dir)?;
            match &outcome {
                MoveOutcome::Moved(_) => tally.moved += 1,
                MoveOutcome::ReplacedOlder { .. } => {
                    tally.moved += 1;
                    tally.deleted += 1;
                }
                MoveOutcome::SourceDiscarded(_) => tally.deleted += 1,
            }
            for operation in outcome.operations() {
                log.record(operation.clone());
            }
        }
    }
    Ok(())
}
