//! Test doubles for the listing and copy capabilities.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::copier::{FileCopier, FsFileCopier};
use crate::lister::{DirectoryEntryMap, EntryLister, FsEntryLister, SourceEntry};
use crate::spec::EnumEntryKind;

/// Call-recording copier that tracks peak concurrency.
///
/// By default nothing touches the filesystem; `delegating()` forwards every
/// call to [`FsFileCopier`] after recording it.
#[derive(Debug, Default)]
pub(crate) struct RecordingCopier {
    l_calls: Mutex<Vec<(PathBuf, PathBuf, bool)>>,
    n_running: AtomicUsize,
    n_peak: AtomicUsize,
    n_delay_ms: u64,
    set_fail_names: HashSet<String>,
    set_panic_names: HashSet<String>,
    if_delegate: bool,
}

impl RecordingCopier {
    pub(crate) fn with_delay_ms(n_delay_ms: u64) -> Self {
        Self {
            n_delay_ms,
            ..Self::default()
        }
    }

    pub(crate) fn failing_on(l_names: &[&str]) -> Self {
        Self {
            set_fail_names: l_names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn panicking_on(l_names: &[&str]) -> Self {
        Self {
            set_panic_names: l_names.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn delegating() -> Self {
        Self {
            if_delegate: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, n_delay_ms: u64) -> Self {
        self.n_delay_ms = n_delay_ms;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.l_calls.lock().expect("calls lock").len()
    }

    pub(crate) fn symlink_count(&self) -> usize {
        self.l_calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|(_, _, if_symlink)| *if_symlink)
            .count()
    }

    pub(crate) fn copied_destinations(&self) -> Vec<PathBuf> {
        self.l_calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(_, path_dst, _)| path_dst.clone())
            .collect()
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.n_peak.load(Ordering::SeqCst)
    }
}

impl FileCopier for RecordingCopier {
    fn copy(&self, path_src: &Path, path_dst: &Path, if_symlink: bool) -> io::Result<()> {
        let n_now = self.n_running.fetch_add(1, Ordering::SeqCst) + 1;
        self.n_peak.fetch_max(n_now, Ordering::SeqCst);
        self.l_calls.lock().expect("calls lock").push((
            path_src.to_path_buf(),
            path_dst.to_path_buf(),
            if_symlink,
        ));
        if self.n_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.n_delay_ms));
        }

        let c_name = path_src
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.set_panic_names.contains(&c_name) {
            self.n_running.fetch_sub(1, Ordering::SeqCst);
            panic!("injected panic for {c_name}");
        }
        let res = if self.set_fail_names.contains(&c_name) {
            Err(io::Error::other(format!("injected failure for {c_name}")))
        } else if self.if_delegate {
            FsFileCopier.copy(path_src, path_dst, if_symlink)
        } else {
            Ok(())
        };

        self.n_running.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

/// Filesystem lister that fails on chosen source directories.
#[derive(Debug, Default)]
pub(crate) struct FailingLister {
    set_fail_source_dirs: HashSet<PathBuf>,
    dict_read_calls: Mutex<HashMap<PathBuf, usize>>,
}

impl FailingLister {
    pub(crate) fn failing_on(l_paths: &[PathBuf]) -> Self {
        Self {
            set_fail_source_dirs: l_paths.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn read_count(&self, path_dir: &Path) -> usize {
        self.dict_read_calls
            .lock()
            .expect("reads lock")
            .get(path_dir)
            .copied()
            .unwrap_or(0)
    }
}

impl EntryLister for FailingLister {
    fn list_entries(&self, path_dir: &Path) -> io::Result<DirectoryEntryMap> {
        FsEntryLister.list_entries(path_dir)
    }

    fn read_entries(&self, path_dir: &Path) -> io::Result<Vec<SourceEntry>> {
        *self
            .dict_read_calls
            .lock()
            .expect("reads lock")
            .entry(path_dir.to_path_buf())
            .or_default() += 1;
        if self.set_fail_source_dirs.contains(path_dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected read failure",
            ));
        }
        FsEntryLister.read_entries(path_dir)
    }
}

/// In-memory lister: every directory listing comes from a map, never from disk.
///
/// Unknown destination directories list as empty; unknown source directories
/// are `NotFound`. Paths registered with `failing_list_on` fail their
/// destination listing.
#[derive(Debug, Default)]
pub(crate) struct MapLister {
    dict_dirs_src: HashMap<PathBuf, Vec<SourceEntry>>,
    dict_dirs_dst: HashMap<PathBuf, DirectoryEntryMap>,
    set_fail_list_dirs: HashSet<PathBuf>,
}

impl MapLister {
    pub(crate) fn with_source(mut self, path_dir: &Path, l_entries: &[(&str, EnumEntryKind)]) -> Self {
        let mut l_source: Vec<SourceEntry> = l_entries
            .iter()
            .map(|(c_name, enum_kind)| (OsString::from(c_name), Some(*enum_kind)))
            .collect();
        l_source.sort_by(|a, b| a.0.cmp(&b.0));
        self.dict_dirs_src.insert(path_dir.to_path_buf(), l_source);
        self
    }

    pub(crate) fn with_destination(
        mut self,
        path_dir: &Path,
        l_entries: &[(&str, EnumEntryKind)],
    ) -> Self {
        let dict_entries: DirectoryEntryMap = l_entries
            .iter()
            .map(|(c_name, enum_kind)| (OsString::from(c_name), *enum_kind))
            .collect();
        self.dict_dirs_dst.insert(path_dir.to_path_buf(), dict_entries);
        self
    }

    pub(crate) fn failing_list_on(mut self, path_dir: &Path) -> Self {
        self.set_fail_list_dirs.insert(path_dir.to_path_buf());
        self
    }
}

impl EntryLister for MapLister {
    fn list_entries(&self, path_dir: &Path) -> io::Result<DirectoryEntryMap> {
        if self.set_fail_list_dirs.contains(path_dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected list failure",
            ));
        }
        Ok(self.dict_dirs_dst.get(path_dir).cloned().unwrap_or_default())
    }

    fn read_entries(&self, path_dir: &Path) -> io::Result<Vec<SourceEntry>> {
        self.dict_dirs_src.get(path_dir).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no such source directory")
        })
    }
}
