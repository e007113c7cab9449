//! tidyfold - a rule-driven folder organizer
//!
//! Files under a target folder are placed into nested subfolders built from
//! up to five levels of placement rules (by extension or by date). Filters
//! can override placement to delete, skip, rename or move matching files.
//! Every run can be previewed with a dry run, and applied runs write a JSON
//! backup log of what they changed.

pub mod analyze;
pub mod cli;
pub mod config;
pub mod destination;
pub mod exclusion;
pub mod file_organizer;
pub mod filter;
pub mod operation_log;
pub mod organizer;
pub mod output;

pub use analyze::{FolderAnalysis, analyze_folder};
pub use config::{ActionType, Config, ConfigError, DateSource, FilterAction, FolderRule, Settings, TimePattern};
pub use destination::DestinationResolver;
pub use exclusion::ExclusionEvaluator;
pub use file_organizer::{FileOrganizer, Operation, OrganizeError, OrganizeResult};
pub use filter::{FilterDirective, FilterEngine};
pub use operation_log::OperationLog;
pub use organizer::{ApplyReport, DryRunReport, Organizer, RunMode, RunReport, RunState};

pub use cli::run_cli;
