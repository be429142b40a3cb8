// vsci-core/src/install/extract.rs
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, error};
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};

use crate::privilege::is_writable;
use crate::process::{run_with_timeout, RunError};

/// Tar-family formats, recognised by file name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(ArchiveFormat::TarBz2)
        } else if name.ends_with(".tar.xz") {
            Some(ArchiveFormat::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    /// The flag cluster passed to `tar` for this format.
    pub fn tar_flags(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "-xzf",
            ArchiveFormat::TarBz2 => "-xjf",
            ArchiveFormat::TarXz => "-xJf",
            ArchiveFormat::Tar => "-xf",
        }
    }
}

/// One item found at the top of the extraction directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Verifies that the configured `tar` program runs.
pub fn check_dependencies(config: &Config) -> Result<()> {
    debug!("Checking for '{}'", config.tar_program);
    let missing = |detail: String| {
        VsciError::DependencyMissing(format!(
            "'{}' is required but {detail}. Install it with your package manager \
             (e.g. 'apt install tar' or 'dnf install tar').",
            config.tar_program
        ))
    };
    match run_with_timeout(
        &config.tar_program,
        ["--version"],
        config.dependency_probe_timeout,
    ) {
        Ok(out) if out.success() => {
            debug!(
                "Found {}",
                out.stdout.lines().next().unwrap_or(&config.tar_program)
            );
            Ok(())
        }
        Ok(out) => Err(missing(format!(
            "'{} --version' exited with {}",
            config.tar_program, out.status
        ))),
        Err(e) => Err(missing(format!("could not be run ({e})"))),
    }
}

/// Extracts `archive` into the existing directory `dest` using the external
/// `tar` program and returns the top-level items it produced.
pub fn extract_archive(config: &Config, archive: &Path, dest: &Path) -> Result<Vec<ExtractedEntry>> {
    File::open(archive).map_err(|e| {
        VsciError::InvalidInput(format!(
            "Archive {} is not readable: {e}",
            archive.display()
        ))
    })?;
    if !archive.is_file() {
        return Err(VsciError::InvalidInput(format!(
            "Archive {} is not a regular file",
            archive.display()
        )));
    }
    if !dest.is_dir() || !is_writable(dest) {
        return Err(VsciError::ExtractionFailure(format!(
            "Destination {} does not exist or is not writable",
            dest.display()
        )));
    }

    let format = ArchiveFormat::from_path(archive).ok_or_else(|| {
        VsciError::UnsupportedFormat(format!(
            "{} (supported: .tar.gz, .tgz, .tar.bz2, .tbz2, .tar.xz, .tar)",
            archive.display()
        ))
    })?;

    let before = count_entries(dest)?;
    debug!(
        "Extracting {} ({:?}) into {} ({} entries before)",
        archive.display(),
        format,
        dest.display(),
        before
    );

    let args: [&OsStr; 4] = [
        OsStr::new(format.tar_flags()),
        archive.as_os_str(),
        OsStr::new("-C"),
        dest.as_os_str(),
    ];
    let output = run_with_timeout(&config.tar_program, args, config.extraction_timeout)
        .map_err(|e| match e {
            RunError::TimedOut(limit) => VsciError::ExtractionFailure(format!(
                "Extraction of {} timed out after {} seconds",
                archive.display(),
                limit.as_secs()
            )),
            other => VsciError::ExtractionFailure(format!(
                "Could not run '{}': {other}",
                config.tar_program
            )),
        })?;

    if !output.success() {
        error!("tar failed for {}: {}", archive.display(), output.stderr.trim());
        return Err(VsciError::ExtractionFailure(format!(
            "'{}' exited with {}: {}",
            config.tar_program,
            output.status,
            output.stderr.trim()
        )));
    }

    let entries = top_level_entries(dest)?;
    debug!("{} entries after extraction", entries.len());
    if entries.is_empty() {
        return Err(VsciError::ExtractionFailure(format!(
            "Nothing was extracted from {}",
            archive.display()
        )));
    }
    Ok(entries)
}

fn count_entries(dir: &Path) -> Result<usize> {
    Ok(fs::read_dir(dir)?.count())
}

fn top_level_entries(dir: &Path) -> Result<Vec<ExtractedEntry>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            ExtractedEntry { path, is_dir }
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}
