//! Error types for mirrorkit-sync

use mirrorkit_io_sync::SyncError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

pub const N_EXIT_COPY_ERRORS: i32 = 1;
pub const N_EXIT_INPUT_ERROR: i32 = 2;
pub const N_EXIT_FATAL: i32 = 255;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from the sync engine
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Logging could not be initialized
    #[error("cannot initialize logging: {0}")]
    Logging(String),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Sync(SyncError::Copy(_)) => N_EXIT_COPY_ERRORS,
            Self::Sync(SyncError::Input(_)) => N_EXIT_INPUT_ERROR,
            Self::Sync(SyncError::Traversal { .. }) | Self::Logging(_) => N_EXIT_FATAL,
        }
    }
}
