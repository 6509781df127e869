//! Sync specification models and top-level error types.

use std::fmt;
use std::io;
use std::path::PathBuf;

pub(crate) const N_WORKERS_MAX_DEFAULT: usize = 20;
pub(crate) const N_SIZE_JOB_QUEUE_DEFAULT: usize = 20;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Kind of one directory entry.
///
/// Symlinks are classified by the link itself, never by what it points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumEntryKind {
    /// Directory: reconciled by descending into it, never copied directly.
    Directory,
    /// Regular file: copied byte-for-byte.
    File,
    /// Symbolic link: recreated with the same target.
    Symlink,
}

impl EnumEntryKind {
    /// `true` for entries handled as copy jobs (files and symlinks).
    pub fn is_leaf(self) -> bool {
        !matches!(self, Self::Directory)
    }
}

impl fmt::Display for EnumEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Symlink => "symlink",
        };
        f.write_str(c_name)
    }
}

/// Pattern matching mode for exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSyncPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for [`crate::Synchronizer`] and [`crate::sync_tree`].
#[derive(Debug, Clone)]
pub struct SpecSyncOptions {
    /// Ceiling on concurrently running copy jobs. `0` means default.
    pub num_workers_max: usize,
    /// Capacity of the copy-job queue between traversal and dispatcher. `0` means default.
    pub size_job_queue: usize,
    /// Entry names kept out of the mirror on both sides.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumSyncPatternMode,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecSyncOptions {
    fn default() -> Self {
        Self {
            num_workers_max: N_WORKERS_MAX_DEFAULT,
            size_job_queue: N_SIZE_JOB_QUEUE_DEFAULT,
            patterns_exclude: None,
            rule_pattern: EnumSyncPatternMode::Glob,
            if_dry_run: false,
        }
    }
}

/// One copy failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSyncError {
    /// Destination path of the failed job.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

impl fmt::Display for SpecSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.exception)
    }
}

/// Aggregate of every failed copy job of one run, in the order reported.
///
/// Jobs complete concurrently, so the relative order differs between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyErrors {
    /// Individual failures.
    pub errors: Vec<SpecSyncError>,
}

impl CopyErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CopyErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n_idx, spec_error) in self.errors.iter().enumerate() {
            if n_idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{spec_error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CopyErrors {}

/// Invalid configuration detected before any filesystem mutation.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Source path is missing or not a directory.
    #[error("{} is not a valid directory", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Source and destination are the same configured path.
    #[error("source and destination are the same directory: {}", .0.display())]
    SourceEqualsDestination(PathBuf),
    /// Source and destination overlap (one contains the other).
    #[error(
        "source and destination directories overlap: {} <-> {}",
        .path_source.display(),
        .path_destination.display()
    )]
    SourceDestinationOverlap {
        /// Configured source directory.
        path_source: PathBuf,
        /// Configured destination directory.
        path_destination: PathBuf,
    },
    /// Exclude pattern failed to compile.
    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(String),
}

/// "Top-level call failed" errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Rejected before traversal; nothing was touched.
    #[error(transparent)]
    Input(#[from] InputError),
    /// I/O failure while walking, creating or deleting; traversal aborted.
    #[error("cannot perform the synchronization at {}: {source}", .path.display())]
    Traversal {
        /// Offending path.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Traversal completed but one or more copy jobs failed.
    #[error("process ended with copy errors:\n{0}")]
    Copy(CopyErrors),
}

impl SyncError {
    pub(crate) fn traversal(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Traversal {
            path: path.into(),
            source,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
