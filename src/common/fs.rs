//! Common file system operations with unified error handling

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{BundleError, Result};

/// Copy a directory tree, keeping symlinks as symlinks on unix
pub fn copy_dir_recursive<P1, P2>(src: P1, dst: P2) -> io::Result<()>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let src = src.as_ref();
    let dst = dst.as_ref();

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Move a directory, falling back to copy-and-delete across file systems.
///
/// On failure the source is left in place and any partial copy is removed.
pub fn move_dir(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            if let Err(copy_err) = copy_dir_recursive(src, dst) {
                let _ = fs::remove_dir_all(dst);
                return Err(copy_err);
            }
            fs::remove_dir_all(src)
        }
        Err(e) => Err(e),
    }
}

/// Replace `path` with `contents` through a temporary file in the same directory
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let write_failed = |e: &dyn std::fmt::Display| BundleError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| write_failed(&e))?;

    let mut file = NamedTempFile::new_in(parent).map_err(|e| write_failed(&e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| write_failed(&e))?;
    // Temp files are owner-only; keep whatever mode the file already had
    if let Ok(existing) = fs::metadata(path) {
        file.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| write_failed(&e))?;
    }
    file.persist(path).map_err(|e| write_failed(&e.error))?;
    Ok(())
}
