//! Recursive directory copy preserving permissions, modification times and symlinks

use crate::core::error::UploadError;
use crate::core::traits::CopyMode;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Summary of a finished copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
}

/// Copy the tree rooted at `from` to `to`.
///
/// Directory permissions and times are applied after their content is
/// written, deepest first, so read-only directories can still be filled.
pub fn copy_tree(from: &Path, to: &Path, mode: CopyMode) -> Result<CopyStats, UploadError> {
    if !from.is_dir() {
        return Err(UploadError::io(
            from,
            io::Error::new(io::ErrorKind::NotFound, "source is not a directory"),
        ));
    }
    if to.starts_with(from) {
        return Err(UploadError::io(
            to,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "destination lies inside the source tree",
            ),
        ));
    }

    if mode == CopyMode::Replace {
        remove_existing(to)?;
    }

    let mut stats = CopyStats::default();
    let mut dirs: Vec<(PathBuf, fs::Metadata)> = Vec::new();

    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            UploadError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| UploadError::io(entry.path(), io::Error::other(e)))?;
        let target = to.join(relative);
        let metadata = entry
            .path()
            .symlink_metadata()
            .map_err(|e| UploadError::io(entry.path(), e))?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| UploadError::io(&target, e))?;
            dirs.push((target, metadata));
            stats.dirs += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            stats.symlinks += 1;
        } else {
            copy_file(entry.path(), &target, &metadata)?;
            stats.files += 1;
        }
    }

    for (dir, metadata) in dirs.iter().rev() {
        apply_metadata(dir, metadata)?;
    }

    Ok(stats)
}

fn remove_existing(path: &Path) -> Result<(), UploadError> {
    let Ok(metadata) = path.symlink_metadata() else {
        return Ok(());
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| UploadError::io(path, e))
}

fn copy_file(source: &Path, target: &Path, metadata: &fs::Metadata) -> Result<(), UploadError> {
    // fs::copy writes through symlinks, so drop one sitting at the target
    if target
        .symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
    {
        fs::remove_file(target).map_err(|e| UploadError::io(target, e))?;
    }

    // fs::copy carries the permission bits over
    fs::copy(source, target).map_err(|e| UploadError::io(target, e))?;
    set_mtime(target, metadata)
}

fn copy_symlink(source: &Path, target: &Path) -> Result<(), UploadError> {
    let link = fs::read_link(source).map_err(|e| UploadError::io(source, e))?;
    if target.symlink_metadata().is_ok() {
        remove_existing(target)?;
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&link, target).map_err(|e| UploadError::io(target, e))
    }

    #[cfg(not(unix))]
    {
        let resolved = source.parent().map(|p| p.join(&link)).unwrap_or(link);
        fs::copy(&resolved, target)
            .map(|_| ())
            .map_err(|e| UploadError::io(target, e))
    }
}

fn apply_metadata(dir: &Path, metadata: &fs::Metadata) -> Result<(), UploadError> {
    set_mtime(dir, metadata)?;
    fs::set_permissions(dir, metadata.permissions()).map_err(|e| UploadError::io(dir, e))
}

fn set_mtime(path: &Path, metadata: &fs::Metadata) -> Result<(), UploadError> {
    let modified = metadata.modified().map_err(|e| UploadError::io(path, e))?;
    File::open(path)
        .and_then(|file| file.set_modified(modified))
        .map_err(|e| UploadError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_copies_nested_tree() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("export");
        write(&from.join("amarok-nightly-qt-20081015/configure"), "#!/bin/sh\n");
        write(&from.join("amarok-nightly-20081015/src/main.cpp"), "int main() {}\n");
        let to = temp_dir.path().join("20081015-ubuntu");

        let stats = copy_tree(&from, &to, CopyMode::Merge).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.dirs, 4);
        assert_eq!(
            fs::read_to_string(to.join("amarok-nightly-20081015/src/main.cpp")).unwrap(),
            "int main() {}\n"
        );
    }

    #[test]
    fn test_preserves_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        let file = from.join("rules");
        write(&file, "build:\n");
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_224_000_000);
        File::options()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(old)
            .unwrap();
        let to = temp_dir.path().join("to");

        copy_tree(&from, &to, CopyMode::Merge).unwrap();

        let copied = fs::metadata(to.join("rules")).unwrap().modified().unwrap();
        assert_eq!(copied, old);
    }

    #[cfg(unix)]
    #[test]
    fn test_preserves_permissions_and_symlinks() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from");
        let script = from.join("debian/rules");
        write(&script, "#!/usr/bin/make -f\n");
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        std::os::unix::fs::symlink("rules", from.join("debian/rules.link")).unwrap();
        let to = temp_dir.path().join("to");

        let stats = copy_tree(&from, &to, CopyMode::Merge).unwrap();

        let mode = fs::metadata(to.join("debian/rules")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(
            fs::read_link(to.join("debian/rules.link")).unwrap(),
            PathBuf::from("rules")
        );
        assert_eq!(stats.symlinks, 1);
    }

    #[test]
    fn test_merge_overwrites_and_keeps_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("qt-debian");
        write(&from.join("control"), "Source: amarok-nightly-qt\n");
        let to = temp_dir.path().join("debian");
        write(&to.join("control"), "stale\n");
        write(&to.join("extra"), "kept\n");

        copy_tree(&from, &to, CopyMode::Merge).unwrap();

        assert_eq!(
            fs::read_to_string(to.join("control")).unwrap(),
            "Source: amarok-nightly-qt\n"
        );
        assert!(to.join("extra").exists());
    }

    #[test]
    fn test_replace_removes_stale_files() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("qt-debian");
        write(&from.join("control"), "fresh\n");
        let to = temp_dir.path().join("debian");
        write(&to.join("control"), "stale\n");
        write(&to.join("patches/old.diff"), "old\n");

        copy_tree(&from, &to, CopyMode::Replace).unwrap();

        assert_eq!(fs::read_to_string(to.join("control")).unwrap(), "fresh\n");
        assert!(!to.join("patches").exists());
    }

    #[test]
    fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();

        let result = copy_tree(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("to"),
            CopyMode::Merge,
        );

        assert!(matches!(result, Err(UploadError::Io { .. })));
    }

    #[test]
    fn test_destination_inside_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("tree");
        write(&from.join("file"), "x");

        let result = copy_tree(&from, &from.join("copy"), CopyMode::Merge);

        assert!(result.is_err());
        assert!(!from.join("copy").exists());
    }
}
