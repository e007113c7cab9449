//! Command-line interface for tidyfold.
//!
//! ```bash
//! # Preview what would happen
//! tidyfold organize --target ~/Downloads --dry-run
//!
//! # Organize using a specific ruleset
//! tidyfold organize --config rules.json
//!
//! # Write the stock ruleset to a file to start editing
//! tidyfold init-config rules.json --target ~/Downloads
//! ```

use crate::analyze::analyze_folder;
use crate::config::Config;
use crate::organizer::{Organizer, RunMode};
use crate::output::OutputFormatter;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Rule-driven folder organizer
#[derive(Parser, Debug)]
#[command(name = "tidyfold")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Organize the target folder according to the configured rules
    Organize {
        /// Report what would happen without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Configuration file (JSON, or TOML with a .toml extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Folder to organize, overriding the configured target
        #[arg(short, long)]
        target: Option<PathBuf>,
    },
    /// Show file counts and the most common extensions of a folder
    Analyze {
        /// Folder to analyze (defaults to the current directory)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },
    /// Write the default ruleset to a configuration file
    InitConfig {
        /// Where to write the configuration
        path: PathBuf,

        /// Target folder stored in the configuration
        #[arg(short, long)]
        target: Option<PathBuf>,
    },
    /// Print the effective configuration as JSON
    ShowConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Runs a parsed command line.
///
/// # Errors
///
/// Returns a printable message when the command could not run at all.
/// Per-file failures during organizing are reported, not returned.
pub fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Organize {
            dry_run,
            config,
            target,
        } => organize(config.as_deref(), target, dry_run),
        Commands::Analyze { target } => analyze(target),
        Commands::InitConfig { path, target } => init_config(&path, target),
        Commands::ShowConfig { config } => show_config(config.as_deref()),
    }
}

fn load_config(config_path: Option<&Path>, target: Option<PathBuf>) -> Result<Config, String> {
    let mut config =
        Config::load(config_path).map_err(|e| format!("Error loading configuration: {}", e))?;
    if let Some(target) = target {
        config.target_folder = target;
    }
    Ok(config)
}

fn organize(config_path: Option<&Path>, target: Option<PathBuf>, dry_run: bool) -> Result<(), String> {
    let config = load_config(config_path, target)?;
    let mode = if dry_run { RunMode::DryRun } else { RunMode::Apply };

    if dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing contents of: {}",
            config.target_folder.display()
        ));
    } else {
        OutputFormatter::info(&format!(
            "Organizing contents of: {}",
            config.target_folder.display()
        ));
    }

    let pb = OutputFormatter::create_progress_bar();
    let mut organizer =
        Organizer::new(&config).with_progress(|progress| OutputFormatter::update_progress(&pb, progress));
    let result = organizer.run(mode);
    pb.finish_and_clear();

    let report = result.map_err(|e| e.to_string())?;
    OutputFormatter::run_report(&report);

    if dry_run {
        OutputFormatter::plain("Run again without --dry-run to apply these changes.");
    }
    Ok(())
}

fn analyze(target: Option<PathBuf>) -> Result<(), String> {
    let target = target.unwrap_or_else(|| PathBuf::from("."));
    let analysis = analyze_folder(&target).map_err(|e| e.to_string())?;
    OutputFormatter::analysis_table(&analysis);
    Ok(())
}

fn init_config(path: &Path, target: Option<PathBuf>) -> Result<(), String> {
    if path.exists() {
        return Err(format!("{} already exists, not overwriting", path.display()));
    }

    let target = target.unwrap_or_else(|| PathBuf::from("."));
    Config::default_rules(target)
        .save(path)
        .map_err(|e| e.to_string())?;

    OutputFormatter::success(&format!("Configuration written to {}", path.display()));
    Ok(())
}

fn show_config(config_path: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path, None)?;
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| format!("Could not serialize configuration: {}", e))?;
    OutputFormatter::plain(&json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_organize_command() {
        let cli = Cli::try_parse_from([
            "tidyfold", "organize", "--dry-run", "--target", "/tmp/x", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Organize {
                dry_run,
                config,
                target,
            } => {
                assert!(dry_run);
                assert_eq!(config, None);
                assert_eq!(target, Some(PathBuf::from("/tmp/x")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_init_config_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("rules.json");

        init_config(&path, Some(temp_dir.path().to_path_buf())).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default_rules(temp_dir.path()));

        // A second init must not clobber the file.
        assert!(init_config(&path, None).is_err());
    }

    #[test]
    fn test_target_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("rules.json");
        Config::default_rules("/somewhere/else").save(&path).unwrap();

        let config = load_config(Some(&path), Some(PathBuf::from("/override"))).unwrap();
        assert_eq!(config.target_folder, PathBuf::from("/override"));
    }
}
