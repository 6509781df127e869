//! Copy primitive consumed by the dispatcher.

use std::fs;
use std::io;
use std::path::Path;

/// Reproduces one source file or symlink at a destination path.
pub trait FileCopier: Send + Sync {
    /// Copy `path_src` to `path_dst`, creating a missing destination parent.
    ///
    /// With `if_symlink`, the link itself is recreated (same target) instead
    /// of copying the bytes it points to.
    fn copy(&self, path_src: &Path, path_dst: &Path, if_symlink: bool) -> io::Result<()>;
}

/// [`FileCopier`] backed by the local filesystem.
///
/// On Linux, regular files also keep permissions, timestamps and (best
/// effort) extended attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileCopier;

impl FileCopier for FsFileCopier {
    fn copy(&self, path_src: &Path, path_dst: &Path, if_symlink: bool) -> io::Result<()> {
        if if_symlink {
            return create_symbolic_link(path_src, path_dst);
        }
        ensure_parent_dir(path_src, path_dst)?;
        copy_file_with_metadata(path_src, path_dst)
    }
}

fn with_path(path: &Path, action: &str, e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("{action} {} ({e})", path.display()))
}

/// Create the destination parent with the source parent's permission bits.
fn ensure_parent_dir(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    let Some(path_parent_dst) = path_dst.parent() else {
        return Ok(());
    };
    if path_parent_dst.as_os_str().is_empty() || path_parent_dst.is_dir() {
        return Ok(());
    }

    let mut dir_builder = fs::DirBuilder::new();
    dir_builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
        if let Some(path_parent_src) = path_src.parent()
            && let Ok(stat_parent_src) = fs::metadata(path_parent_src)
        {
            dir_builder.mode(stat_parent_src.permissions().mode() & 0o7777);
        }
    }
    #[cfg(not(unix))]
    let _ = path_src;

    dir_builder
        .create(path_parent_dst)
        .map_err(|e| with_path(path_parent_dst, "cannot create directory", e))
}

fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    let target =
        fs::read_link(path_src).map_err(|e| with_path(path_src, "cannot read symlink", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        symlink(&target, path_dst).map_err(|e| with_path(path_dst, "cannot create symlink", e))
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        let res = if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        };
        res.map_err(|e| with_path(path_dst, "cannot create symlink", e))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!(
                "symbolic links are unsupported on this platform: {}",
                path_dst.display()
            ),
        ))
    }
}

fn copy_file_with_metadata(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    fs::copy(path_file_src, path_file_dst).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "cannot copy {} to {} ({e})",
                path_file_src.display(),
                path_file_dst.display()
            ),
        )
    })?;
    #[cfg(target_os = "linux")]
    {
        apply_metadata_linux(path_file_src, path_file_dst)
            .map_err(|e| with_path(path_file_dst, "cannot apply metadata to", e))?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                xattr = %name.to_string_lossy(),
                error = %e,
                "extended attribute not copied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FileCopier, FsFileCopier};

    #[test]
    fn copy_creates_missing_parent_and_keeps_content() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_src = tmp.path().join("src/dir_a/file_a_a");
        fs::create_dir_all(path_src.parent().expect("parent")).expect("mkdir");
        fs::write(&path_src, "payload").expect("write");

        let path_dst = tmp.path().join("dst/dir_a/file_a_a");
        FsFileCopier.copy(&path_src, &path_dst, false).expect("copy");
        assert_eq!(fs::read_to_string(&path_dst).expect("read"), "payload");
    }

    #[test]
    fn copy_missing_source_reports_path() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = FsFileCopier
            .copy(&tmp.path().join("ghost"), &tmp.path().join("out"), false)
            .expect_err("missing source");
        assert!(err.to_string().contains("ghost"));
    }

    #[cfg(unix)]
    #[test]
    fn copy_parent_inherits_source_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_dir_src = tmp.path().join("src/locked");
        fs::create_dir_all(&path_dir_src).expect("mkdir");
        fs::write(path_dir_src.join("f"), "x").expect("write");
        fs::set_permissions(&path_dir_src, fs::Permissions::from_mode(0o750)).expect("chmod");

        let path_dst = tmp.path().join("dst/locked/f");
        FsFileCopier
            .copy(&path_dir_src.join("f"), &path_dst, false)
            .expect("copy");
        let n_mode = fs::metadata(tmp.path().join("dst/locked"))
            .expect("stat")
            .permissions()
            .mode();
        // umask may only clear bits
        assert_eq!(n_mode & 0o700, 0o700);
        assert_eq!(n_mode & 0o007, 0);
    }

    #[cfg(unix)]
    #[test]
    fn copy_symlink_recreates_link_not_bytes() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_target = tmp.path().join("target.txt");
        fs::write(&path_target, "t").expect("write");
        let path_link = tmp.path().join("link");
        symlink("target.txt", &path_link).expect("symlink");

        let path_dst = tmp.path().join("copy_of_link");
        FsFileCopier.copy(&path_link, &path_dst, true).expect("copy");
        assert!(path_dst.is_symlink());
        assert_eq!(
            fs::read_link(&path_dst).expect("readlink"),
            std::path::PathBuf::from("target.txt")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn copy_preserves_linux_metadata() {
        use filetime::{FileTime, set_file_times};
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file_src = tmp.path().join("meta.txt");
        fs::write(&path_file_src, "meta").expect("write");
        fs::set_permissions(&path_file_src, fs::Permissions::from_mode(0o640))
            .expect("set permissions");
        set_file_times(
            &path_file_src,
            FileTime::from_unix_time(1_700_000_010, 0),
            FileTime::from_unix_time(1_700_000_020, 0),
        )
        .expect("set times");

        let path_file_dst = tmp.path().join("out/meta.txt");
        FsFileCopier
            .copy(&path_file_src, &path_file_dst, false)
            .expect("copy");

        let stat_src = fs::metadata(&path_file_src).expect("src metadata");
        let stat_dst = fs::metadata(&path_file_dst).expect("dst metadata");
        assert_eq!(
            stat_src.permissions().mode() & 0o777,
            stat_dst.permissions().mode() & 0o777
        );
        assert_eq!(
            FileTime::from_last_modification_time(&stat_src),
            FileTime::from_last_modification_time(&stat_dst)
        );
    }
}
