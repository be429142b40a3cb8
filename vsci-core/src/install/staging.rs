// vsci-core/src/install/staging.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};
use vsci_common::error::{Result, VsciError};

const STAGING_PREFIX: &str = "vsc_installer_temp_";
const DOWNLOAD_PREFIX: &str = "vsci_download_";

fn unique_suffix() -> String {
    format!(
        "{}_{}",
        Local::now().format("%Y%m%d_%H%M%S"),
        std::process::id()
    )
}

/// A temporary directory owned by one install. Removed when dropped.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
}

impl StagingArea {
    /// Creates `<temp_root>/vsc_installer_temp_<timestamp>_<pid>`, replacing
    /// any leftover directory of the same name.
    pub fn create(temp_root: &Path) -> Result<Self> {
        let path = temp_root.join(format!("{STAGING_PREFIX}{}", unique_suffix()));
        if path.exists() {
            debug!("Removing stale staging dir {}", path.display());
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path).map_err(|e| {
            VsciError::ExtractionFailure(format!(
                "Failed to create staging directory {}: {e}",
                path.display()
            ))
        })?;
        debug!("Created staging area {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_dir_all(&self.path) {
                Ok(()) => debug!("Removed staging area {}", self.path.display()),
                Err(e) => warn!(
                    "Failed to remove staging area {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

/// A downloaded archive that is deleted once the install is over.
#[derive(Debug)]
pub struct DownloadedArchive {
    path: PathBuf,
}

impl DownloadedArchive {
    pub fn reserve(temp_root: &Path, file_name: &str) -> Result<Self> {
        fs::create_dir_all(temp_root)?;
        let path = temp_root.join(format!("{DOWNLOAD_PREFIX}{}_{file_name}", unique_suffix()));
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DownloadedArchive {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(
                    "Failed to remove downloaded archive {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_dir_is_named_and_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let staged_path;
        {
            let staging = StagingArea::create(tmp.path()).unwrap();
            staged_path = staging.path().to_path_buf();
            let name = staged_path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("vsc_installer_temp_"));
            assert!(name.ends_with(&format!("_{}", std::process::id())));
            fs::write(staged_path.join("payload"), b"x").unwrap();
        }
        assert!(!staged_path.exists());
    }

    #[test]
    fn downloaded_archive_keeps_file_name_and_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path;
        {
            let archive = DownloadedArchive::reserve(tmp.path(), "app.tar.gz").unwrap();
            archive_path = archive.path().to_path_buf();
            assert!(archive_path.to_string_lossy().ends_with("_app.tar.gz"));
            fs::write(&archive_path, b"data").unwrap();
        }
        assert!(!archive_path.exists());
    }
}
