// vsci-core/src/fs_utils.rs
use std::path::Path;
use std::{fs, io};

use tracing::debug;

/// Removes a file, symlink or directory tree. Symlinks to directories are
/// unlinked, never followed. Returns `Ok(false)` if nothing was there.
pub(crate) fn remove_filesystem_artifact(path: &Path) -> io::Result<bool> {
    let metadata = match path.symlink_metadata() {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Artifact not found (already removed?): {}", path.display());
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    let file_type = metadata.file_type();
    debug!(
        "Removing {} at: {}",
        if file_type.is_dir() {
            "directory"
        } else if file_type.is_symlink() {
            "symlink"
        } else {
            "file"
        },
        path.display()
    );
    let result = if file_type.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    #[test]
    fn removes_trees_files_and_links_without_following() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("dir");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested/file"), b"x").unwrap();
        let link = tmp.path().join("link");
        symlink(&dir, &link).unwrap();

        assert!(remove_filesystem_artifact(&link).unwrap());
        assert!(dir.join("nested/file").exists());
        assert!(remove_filesystem_artifact(&dir).unwrap());
        assert!(!dir.exists());
        assert!(!remove_filesystem_artifact(&dir).unwrap());
    }
}
