//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use mirrorkit_io_sync::{EnumSyncPatternMode, SpecSyncOptions};

/// Mirror the structure of a source directory into a destination directory.
///
/// Missing entries are copied, destination-only entries are deleted, and
/// entries whose kind differs (file, directory, symlink) are replaced.
/// Existing files with the same name and kind are left untouched.
#[derive(Parser, Debug)]
#[command(name = "mirrorkit-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The source folder to synchronize
    #[arg(short, long, env = "MIRRORKIT_SOURCE")]
    pub source: PathBuf,

    /// The destination folder to synchronize
    #[arg(short, long, env = "MIRRORKIT_DESTINATION")]
    pub destination: PathBuf,

    /// Maximum number of concurrent copy jobs
    #[arg(short, long, env = "MIRRORKIT_WORKERS", default_value_t = 20)]
    pub workers: usize,

    /// Capacity of the copy-job queue
    #[arg(short, long, env = "MIRRORKIT_QUEUE_SIZE", default_value_t = 20)]
    pub queue_size: usize,

    /// Entry names to keep out of the mirror (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// How exclude patterns are interpreted
    #[arg(long, value_enum, default_value_t = PatternMode::Glob)]
    pub pattern_mode: PatternMode,

    /// Report what would change without touching the destination
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<PatternMode> for EnumSyncPatternMode {
    fn from(value: PatternMode) -> Self {
        match value {
            PatternMode::Glob => EnumSyncPatternMode::Glob,
            PatternMode::Regex => EnumSyncPatternMode::Regex,
            PatternMode::Literal => EnumSyncPatternMode::Literal,
        }
    }
}

impl Cli {
    pub fn to_options(&self) -> SpecSyncOptions {
        SpecSyncOptions {
            num_workers_max: self.workers,
            size_job_queue: self.queue_size,
            patterns_exclude: (!self.excludes.is_empty()).then(|| self.excludes.clone()),
            rule_pattern: self.pattern_mode.into(),
            if_dry_run: self.dry_run,
        }
    }

    /// Default log directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
