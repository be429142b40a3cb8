// vsci-core/src/install/link.rs
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::Path;

use tracing::debug;
use vsci_common::error::{Result, VsciError};

use crate::fs_utils::remove_filesystem_artifact;

/// Points `link_path` at `target`, replacing any file or link already there.
pub fn create_symlink(target: &Path, link_path: &Path) -> Result<()> {
    if let Some(parent) = link_path.parent() {
        if !parent.is_dir() {
            return Err(VsciError::NotFound(format!(
                "Symlink directory {} does not exist",
                parent.display()
            )));
        }
    }
    if link_path.is_dir() && !link_path.is_symlink() {
        return Err(VsciError::InvalidInput(format!(
            "Refusing to replace directory {} with a symlink",
            link_path.display()
        )));
    }
    remove_filesystem_artifact(link_path)?;
    unix_fs::symlink(target, link_path).map_err(|e| {
        VsciError::Io(std::sync::Arc::new(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to link {} -> {}: {}",
                link_path.display(),
                target.display(),
                e
            ),
        )))
    })?;
    debug!("Linked {} -> {}", link_path.display(), target.display());
    Ok(())
}

/// Removes `link_path` only if it is a symlink. Returns whether it was removed.
pub fn remove_symlink(link_path: &Path) -> Result<bool> {
    match fs::symlink_metadata(link_path) {
        Ok(m) if m.file_type().is_symlink() => {
            fs::remove_file(link_path)?;
            debug!("Removed symlink {}", link_path.display());
            Ok(true)
        }
        Ok(_) => {
            debug!("{} is not a symlink; leaving it", link_path.display());
            Ok(false)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_link() {
        let tmp = tempfile::tempdir().unwrap();
        let old = tmp.path().join("old");
        let new = tmp.path().join("new");
        fs::write(&old, b"1").unwrap();
        fs::write(&new, b"2").unwrap();
        let link = tmp.path().join("app");

        create_symlink(&old, &link).unwrap();
        create_symlink(&new, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), new);
    }

    #[test]
    fn missing_directory_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = create_symlink(tmp.path(), &tmp.path().join("no/such/app")).unwrap_err();
        assert!(matches!(err, VsciError::NotFound(_)));
    }

    #[test]
    fn remove_only_touches_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let regular = tmp.path().join("regular");
        fs::write(&regular, b"keep").unwrap();
        assert!(!remove_symlink(&regular).unwrap());
        assert!(regular.exists());

        let link = tmp.path().join("link");
        unix_fs::symlink(&regular, &link).unwrap();
        assert!(remove_symlink(&link).unwrap());
        assert!(!link.is_symlink());
        assert!(!remove_symlink(&link).unwrap());
    }
}
