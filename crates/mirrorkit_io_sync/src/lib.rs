//! `mirrorkit_io_sync` v1:
//! One-way structural directory mirroring.
//!
//! Modules:
//! - `sync`     : breadth-first diff traversal and orchestration
//! - `dispatch` : bounded-concurrency copy dispatcher and outcome aggregator
//! - `lister`   : directory listing capability
//! - `copier`   : file/symlink copy capability
//! - `spec`     : enums/options/errors
//! - `report`   : run-time report model
//! - `util`     : shared helper functions

pub mod copier;
pub mod dispatch;
pub mod lister;
pub mod report;
pub mod spec;
pub mod sync;
mod util;

#[cfg(test)]
mod testing;

pub use copier::{FileCopier, FsFileCopier};
pub use dispatch::CopyJob;
pub use lister::{DirectoryEntryMap, EntryLister, FsEntryLister, SourceEntry};
pub use report::{ReportSync, ReportSyncBuilder};
pub use spec::{
    CopyErrors, EnumEntryKind, EnumSyncPatternMode, InputError, SpecSyncError, SpecSyncOptions,
    SyncError,
};
pub use sync::{Synchronizer, sync_tree};
