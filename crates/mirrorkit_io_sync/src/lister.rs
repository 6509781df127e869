//! Directory listing capability consumed by the traversal.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use crate::spec::EnumEntryKind;

/// Entry name -> kind for one destination directory.
///
/// Names are kept as raw `OsString`s; unix file names need not be UTF-8.
pub type DirectoryEntryMap = HashMap<OsString, EnumEntryKind>;

/// One source-side listing item. `None` kind marks a special file
/// (fifo, socket, device) that the sync does not reproduce.
pub type SourceEntry = (OsString, Option<EnumEntryKind>);

/// Reads directory contents for the diff traversal.
pub trait EntryLister: Send + Sync {
    /// Destination-side listing.
    ///
    /// A directory that does not exist yields an empty map, not an error.
    fn list_entries(&self, path_dir: &Path) -> io::Result<DirectoryEntryMap>;

    /// Source-side listing, sorted by name. Every failure is propagated.
    fn read_entries(&self, path_dir: &Path) -> io::Result<Vec<SourceEntry>>;
}

/// [`EntryLister`] backed by `std::fs::read_dir`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEntryLister;

impl EntryLister for FsEntryLister {
    fn list_entries(&self, path_dir: &Path) -> io::Result<DirectoryEntryMap> {
        let iter_entries = match fs::read_dir(path_dir) {
            Ok(iter) => iter,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DirectoryEntryMap::new()),
            Err(e) => return Err(e),
        };

        let mut dict_entries = DirectoryEntryMap::new();
        for _entry_res in iter_entries {
            let entry = _entry_res?;
            let c_name = entry.file_name();
            // Special files at the destination are treated as plain files so
            // they get replaced or removed like any other leaf.
            let enum_kind = classify(&entry.file_type()?).unwrap_or(EnumEntryKind::File);
            dict_entries.insert(c_name, enum_kind);
        }
        Ok(dict_entries)
    }

    fn read_entries(&self, path_dir: &Path) -> io::Result<Vec<SourceEntry>> {
        let mut l_entries = Vec::new();
        for _entry_res in fs::read_dir(path_dir)? {
            let entry = _entry_res?;
            let c_name = entry.file_name();
            l_entries.push((c_name, classify(&entry.file_type()?)));
        }
        l_entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(l_entries)
    }
}

/// Kind of an entry from its (non-followed) file type.
pub(crate) fn classify(cfg_file_type: &fs::FileType) -> Option<EnumEntryKind> {
    if cfg_file_type.is_symlink() {
        Some(EnumEntryKind::Symlink)
    } else if cfg_file_type.is_dir() {
        Some(EnumEntryKind::Directory)
    } else if cfg_file_type.is_file() {
        Some(EnumEntryKind::File)
    } else {
        None
    }
}
