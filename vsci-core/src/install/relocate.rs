// vsci-core/src/install/relocate.rs
use std::fs;
use std::io;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use vsci_common::error::{Result, VsciError};
use walkdir::WalkDir;

use crate::fs_utils::remove_filesystem_artifact;

pub const COPY_PROGRESS_START: u8 = 60;
pub const COPY_PROGRESS_END: u8 = 90;
/// Progress is reported and the checkpoint invoked after this many files.
pub const COPY_BATCH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    Renamed,
    Copied {
        /// Set when the copy succeeded but the source could not be deleted.
        source_left_behind: Option<String>,
    },
}

/// Moves `src` to `dest`, replacing whatever is at `dest`. Uses `rename` and
/// falls back to copy + delete when that fails (e.g. across filesystems).
pub fn relocate(
    src: &Path,
    dest: &Path,
    progress: &mut dyn FnMut(u8),
    checkpoint: &mut dyn FnMut(),
) -> Result<Relocation> {
    relocate_with(src, dest, |a, b| fs::rename(a, b), progress, checkpoint)
}

/// [`relocate`] with the rename step supplied by the caller.
pub fn relocate_with<R>(
    src: &Path,
    dest: &Path,
    rename: R,
    progress: &mut dyn FnMut(u8),
    checkpoint: &mut dyn FnMut(),
) -> Result<Relocation>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    if !src.is_dir() {
        return Err(VsciError::RelocationFailure(format!(
            "Source {} is not a directory",
            src.display()
        )));
    }

    if remove_filesystem_artifact(dest).map_err(|e| {
        VsciError::RelocationFailure(format!(
            "Failed to remove existing installation at {}: {e}",
            dest.display()
        ))
    })? {
        debug!("Removed previous installation at {}", dest.display());
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            VsciError::RelocationFailure(format!(
                "Failed to create install root {}: {e}",
                parent.display()
            ))
        })?;
    }

    let rename_err = match rename(src, dest) {
        Ok(()) => {
            debug!("Renamed {} to {}", src.display(), dest.display());
            return Ok(Relocation::Renamed);
        }
        Err(e) => e,
    };
    debug!(
        "Rename {} -> {} failed ({}); copying instead",
        src.display(),
        dest.display(),
        rename_err
    );

    if let Err(copy_err) = copy_dir_recursive(src, dest, progress, checkpoint) {
        if let Err(e) = remove_filesystem_artifact(dest) {
            warn!("Failed to remove partial copy at {}: {}", dest.display(), e);
        }
        return Err(VsciError::RelocationFailure(format!(
            "Could not move {} to {} (rename: {rename_err}; copy: {copy_err})",
            src.display(),
            dest.display()
        )));
    }

    let source_left_behind = fs::remove_dir_all(src)
        .err()
        .map(|e| format!("Failed to remove source {} after copy: {e}", src.display()));
    Ok(Relocation::Copied { source_left_behind })
}

/// Copies the tree at `src` into `dest` (created if missing), keeping
/// permission bits and symlinks. `progress` receives values in the
/// 60–90 range after every batch of files.
pub fn copy_dir_recursive(
    src: &Path,
    dest: &Path,
    progress: &mut dyn FnMut(u8),
    checkpoint: &mut dyn FnMut(),
) -> io::Result<usize> {
    let entries = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(io::Error::other)?;
    let total_files = entries
        .iter()
        .filter(|e| !e.file_type().is_dir())
        .count()
        .max(1);

    fs::create_dir_all(dest)?;
    let mut dirs: Vec<(PathBuf, u32)> = Vec::new();
    let mut copied = 0usize;

    for entry in &entries {
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            dirs.push((target, entry.metadata().map_err(io::Error::other)?.permissions().mode()));
            continue;
        }

        if file_type.is_symlink() {
            symlink(fs::read_link(entry.path())?, &target)?;
        } else {
            // fs::copy carries the permission bits over.
            fs::copy(entry.path(), &target)?;
        }
        copied += 1;
        if copied % COPY_BATCH == 0 {
            progress(copy_progress(copied, total_files));
            checkpoint();
        }
    }

    // Directory modes last, so read-only directories do not block the copy.
    for (dir, mode) in dirs.iter().rev() {
        fs::set_permissions(dir, fs::Permissions::from_mode(*mode))?;
    }
    progress(COPY_PROGRESS_END);
    debug!("Copied {} files from {} to {}", copied, src.display(), dest.display());
    Ok(copied)
}

fn copy_progress(copied: usize, total: usize) -> u8 {
    let span = usize::from(COPY_PROGRESS_END - COPY_PROGRESS_START);
    COPY_PROGRESS_START + (copied.min(total) * span / total) as u8
}
