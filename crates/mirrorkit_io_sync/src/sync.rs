//! Breadth-first diff traversal and sync orchestration.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::copier::{FileCopier, FsFileCopier};
use crate::dispatch::{CopyDispatcher, CopyJob};
use crate::lister::{DirectoryEntryMap, EntryLister, FsEntryLister};
use crate::report::{ReportSync, ReportSyncBuilder};
use crate::spec::{CopyErrors, EnumEntryKind, InputError, SpecSyncOptions, SyncError};
use crate::util::{SpecSyncPatterns, calculate_queue_size, calculate_worker_limit, is_overlap};

/// A (source dir, destination dir) pair awaiting reconciliation.
#[derive(Debug, Clone)]
struct SyncTask {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    /// Destination is known not to exist (or to be empty), so listing is skipped.
    if_dst_absent: bool,
}

struct SpecSyncContext<'a> {
    spec_sync_pats: SpecSyncPatterns,
    if_dry_run: bool,
    entry_lister: &'a dyn EntryLister,
    dispatcher: Option<&'a CopyDispatcher>,
    builder_sync_report: ReportSyncBuilder,
    set_visited_dirs: HashSet<(u64, u64)>,
}

/// Makes a destination tree structurally mirror a source tree.
///
/// Only existence and entry kind are compared: an existing file or symlink
/// with the same name and kind is presumed in sync and never re-copied.
pub struct Synchronizer {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    spec_sync_options: SpecSyncOptions,
    entry_lister: Arc<dyn EntryLister>,
    file_copier: Arc<dyn FileCopier>,
}

impl Synchronizer {
    pub fn new<P, Q>(dir_source: P, dir_destination: Q, spec_sync_options: SpecSyncOptions) -> Self
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Self {
            path_dir_src: dir_source.as_ref().to_path_buf(),
            path_dir_dst: dir_destination.as_ref().to_path_buf(),
            spec_sync_options,
            entry_lister: Arc::new(FsEntryLister),
            file_copier: Arc::new(FsFileCopier),
        }
    }

    /// Replace the directory listing capability.
    pub fn with_entry_lister(mut self, entry_lister: Arc<dyn EntryLister>) -> Self {
        self.entry_lister = entry_lister;
        self
    }

    /// Replace the copy primitive.
    pub fn with_file_copier(mut self, file_copier: Arc<dyn FileCopier>) -> Self {
        self.file_copier = file_copier;
        self
    }

    /// Run one synchronization.
    ///
    /// Returns:
    /// - [`SyncError::Input`] before anything is touched when the paths are unusable,
    /// - [`SyncError::Traversal`] when reading, creating or deleting fails mid-walk
    ///   (the destination may be partially reconciled),
    /// - [`SyncError::Copy`] when the walk completed but some copy jobs failed.
    ///
    /// Copy jobs already queued are always drained before returning, including
    /// on a traversal error.
    pub fn sync(&self) -> Result<ReportSync, SyncError> {
        let spec_sync_pats = self.validate()?;
        let n_workers_max = calculate_worker_limit(self.spec_sync_options.num_workers_max);
        let n_size_job_queue = calculate_queue_size(self.spec_sync_options.size_job_queue);
        let if_dry_run = self.spec_sync_options.if_dry_run;

        let dispatcher = if if_dry_run {
            None
        } else {
            let dispatcher =
                CopyDispatcher::start(self.file_copier.clone(), n_workers_max, n_size_job_queue)
                    .map_err(|e| SyncError::traversal(&self.path_dir_dst, e))?;
            Some(dispatcher)
        };

        tracing::info!(
            src = %self.path_dir_src.display(),
            dst = %self.path_dir_dst.display(),
            workers = n_workers_max,
            queue = n_size_job_queue,
            dry_run = if_dry_run,
            "sync started"
        );

        let mut spec_sync_ctx = SpecSyncContext {
            spec_sync_pats,
            if_dry_run,
            entry_lister: self.entry_lister.as_ref(),
            dispatcher: dispatcher.as_ref(),
            builder_sync_report: ReportSyncBuilder::default(),
            set_visited_dirs: HashSet::new(),
        };
        let res_walk = walk_tree(&self.path_dir_src, &self.path_dir_dst, &mut spec_sync_ctx);
        let mut builder_sync_report = spec_sync_ctx.builder_sync_report;

        if let Some(dispatcher) = dispatcher {
            builder_sync_report.merge(dispatcher.finish());
        }
        if let Err(e) = res_walk {
            tracing::error!(error = %e, "sync aborted");
            return Err(e);
        }

        let report = builder_sync_report.build();
        tracing::info!("{report}");
        if !report.errors.is_empty() {
            return Err(SyncError::Copy(CopyErrors {
                errors: report.errors,
            }));
        }
        Ok(report)
    }

    fn validate(&self) -> Result<SpecSyncPatterns, InputError> {
        if !self.path_dir_src.is_dir() {
            return Err(InputError::SourceNotDirectory(self.path_dir_src.clone()));
        }
        if self.path_dir_src == self.path_dir_dst {
            return Err(InputError::SourceEqualsDestination(
                self.path_dir_src.clone(),
            ));
        }
        if is_overlap(&self.path_dir_src, &self.path_dir_dst) {
            return Err(InputError::SourceDestinationOverlap {
                path_source: self.path_dir_src.clone(),
                path_destination: self.path_dir_dst.clone(),
            });
        }
        SpecSyncPatterns::from_raw(
            self.spec_sync_options.patterns_exclude.as_deref(),
            self.spec_sync_options.rule_pattern,
        )
    }
}

/// Mirror `dir_source` into `dir_destination` with the filesystem-backed
/// lister and copier.
pub fn sync_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_sync_options: SpecSyncOptions,
) -> Result<ReportSync, SyncError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    Synchronizer::new(dir_source, dir_destination, spec_sync_options).sync()
}

fn walk_tree(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_sync_ctx: &mut SpecSyncContext<'_>,
) -> Result<(), SyncError> {
    let if_root_absent = fs::symlink_metadata(path_dir_dst).is_err();
    if if_root_absent {
        materialize_directory(path_dir_src, path_dir_dst, spec_sync_ctx)?;
    }

    let mut queue_tasks = VecDeque::new();
    queue_tasks.push_back(SyncTask {
        path_dir_src: path_dir_src.to_path_buf(),
        path_dir_dst: path_dir_dst.to_path_buf(),
        if_dst_absent: if_root_absent,
    });

    while let Some(spec_task) = queue_tasks.pop_front() {
        reconcile_directory(spec_task, &mut queue_tasks, spec_sync_ctx)?;
    }
    Ok(())
}

/// Reconcile one directory pair; child directories are appended to `queue_tasks`.
fn reconcile_directory(
    spec_task: SyncTask,
    queue_tasks: &mut VecDeque<SyncTask>,
    spec_sync_ctx: &mut SpecSyncContext<'_>,
) -> Result<(), SyncError> {
    if !mark_visited(&spec_task.path_dir_src, spec_sync_ctx) {
        return Ok(());
    }

    let mut dict_entries_dst = if spec_task.if_dst_absent {
        DirectoryEntryMap::new()
    } else {
        spec_sync_ctx
            .entry_lister
            .list_entries(&spec_task.path_dir_dst)
            .map_err(|e| SyncError::traversal(&spec_task.path_dir_dst, e))?
    };
    let l_entries_src = spec_sync_ctx
        .entry_lister
        .read_entries(&spec_task.path_dir_src)
        .map_err(|e| SyncError::traversal(&spec_task.path_dir_src, e))?;

    for (c_name, opt_kind_src) in l_entries_src {
        spec_sync_ctx.builder_sync_report.add_scanned();
        let path_src = spec_task.path_dir_src.join(&c_name);

        if spec_sync_ctx
            .spec_sync_pats
            .is_excluded(&c_name.to_string_lossy())
        {
            dict_entries_dst.remove(&c_name);
            spec_sync_ctx.builder_sync_report.add_skipped();
            continue;
        }
        let Some(enum_kind_src) = opt_kind_src else {
            dict_entries_dst.remove(&c_name);
            tracing::warn!(path = %path_src.display(), "special file skipped");
            spec_sync_ctx
                .builder_sync_report
                .add_warning(format!("Special file skipped: {}", path_src.display()));
            spec_sync_ctx.builder_sync_report.add_skipped();
            continue;
        };

        let path_dst = spec_task.path_dir_dst.join(&c_name);
        let b_dst_absent = match dict_entries_dst.remove(&c_name) {
            None => true,
            Some(enum_kind_dst) if enum_kind_dst == enum_kind_src => false,
            Some(enum_kind_dst) => {
                delete_entry(&path_dst, enum_kind_dst, spec_sync_ctx)?;
                true
            }
        };

        match enum_kind_src {
            EnumEntryKind::Directory => {
                if b_dst_absent {
                    materialize_directory(&path_src, &path_dst, spec_sync_ctx)?;
                }
                queue_tasks.push_back(SyncTask {
                    path_dir_src: path_src,
                    path_dir_dst: path_dst,
                    if_dst_absent: b_dst_absent,
                });
            }
            EnumEntryKind::File | EnumEntryKind::Symlink => {
                if b_dst_absent {
                    dispatch_copy(
                        CopyJob {
                            path_src,
                            path_dst,
                            kind: enum_kind_src,
                        },
                        spec_sync_ctx,
                    )?;
                }
            }
        }
    }

    // Whatever is left exists only at the destination.
    let mut l_leftover: Vec<(OsString, EnumEntryKind)> = dict_entries_dst.into_iter().collect();
    l_leftover.sort_by(|a, b| a.0.cmp(&b.0));
    for (c_name, enum_kind_dst) in l_leftover {
        if spec_sync_ctx
            .spec_sync_pats
            .is_excluded(&c_name.to_string_lossy())
        {
            continue;
        }
        delete_entry(
            &spec_task.path_dir_dst.join(&c_name),
            enum_kind_dst,
            spec_sync_ctx,
        )?;
    }
    Ok(())
}

/// Record a source directory; `false` if it was already reconciled in this run.
fn mark_visited(path_dir_src: &Path, spec_sync_ctx: &mut SpecSyncContext<'_>) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Ok(stat_dir) = fs::metadata(path_dir_src)
            && !spec_sync_ctx
                .set_visited_dirs
                .insert((stat_dir.dev(), stat_dir.ino()))
        {
            tracing::warn!(path = %path_dir_src.display(), "directory loop detected");
            spec_sync_ctx
                .builder_sync_report
                .add_warning(format!("Directory loop detected: {}", path_dir_src.display()));
            spec_sync_ctx.builder_sync_report.add_skipped();
            return false;
        }
    }
    #[cfg(not(unix))]
    let _ = (path_dir_src, &spec_sync_ctx.set_visited_dirs);
    true
}

fn dispatch_copy(spec_job: CopyJob, spec_sync_ctx: &mut SpecSyncContext<'_>) -> Result<(), SyncError> {
    let Some(dispatcher) = spec_sync_ctx.dispatcher else {
        tracing::debug!(
            src = %spec_job.path_src.display(),
            dst = %spec_job.path_dst.display(),
            "would copy"
        );
        spec_sync_ctx.builder_sync_report.add_copied();
        return Ok(());
    };
    let path_dst = spec_job.path_dst.clone();
    dispatcher
        .submit(spec_job)
        .map_err(|e| SyncError::traversal(path_dst, e))
}

/// Remove one destination entry; directories go recursively.
fn delete_entry(
    path_dst: &Path,
    enum_kind_dst: EnumEntryKind,
    spec_sync_ctx: &mut SpecSyncContext<'_>,
) -> Result<(), SyncError> {
    spec_sync_ctx.builder_sync_report.add_deleted();
    if spec_sync_ctx.if_dry_run {
        tracing::debug!(path = %path_dst.display(), kind = %enum_kind_dst, "would delete");
        return Ok(());
    }

    tracing::debug!(path = %path_dst.display(), kind = %enum_kind_dst, "deleting");
    let res_delete = match enum_kind_dst {
        EnumEntryKind::Directory => fs::remove_dir_all(path_dst),
        EnumEntryKind::File | EnumEntryKind::Symlink => fs::remove_file(path_dst),
    };
    res_delete.map_err(|e| SyncError::traversal(path_dst, e))
}

/// Create a destination directory, with the source directory's permissions on unix.
fn materialize_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_sync_ctx: &mut SpecSyncContext<'_>,
) -> Result<(), SyncError> {
    spec_sync_ctx.builder_sync_report.add_created_dir();
    if spec_sync_ctx.if_dry_run {
        tracing::debug!(path = %path_dir_dst.display(), "would create directory");
        return Ok(());
    }

    tracing::debug!(path = %path_dir_dst.display(), "creating directory");
    let mut dir_builder = fs::DirBuilder::new();
    dir_builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        if let Ok(stat_dir_src) = fs::metadata(path_dir_src) {
            dir_builder.mode(stat_dir_src.permissions().mode() & 0o7777);
        }
    }
    #[cfg(not(unix))]
    let _ = path_dir_src;

    dir_builder
        .create(path_dir_dst)
        .map_err(|e| SyncError::traversal(path_dir_dst, e))
}
