// vsci-core/src/privilege.rs
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, info};
use vsci_common::error::{Result, VsciError};
use vsci_common::model::{InstallRequest, InstallSource};

const SYSTEM_PREFIXES: [&str; 4] = ["/opt", "/usr", "/etc", "/var"];
const DEFAULT_SYMLINK_DIR: &str = "/usr/local/bin";
const ESCALATION_HELPERS: [&str; 2] = ["pkexec", "sudo"];

/// Decides whether an operation has to run with elevated rights.
#[derive(Debug, Clone)]
pub struct PrivilegeGate {
    symlink_dir: PathBuf,
}

impl Default for PrivilegeGate {
    fn default() -> Self {
        Self::new(DEFAULT_SYMLINK_DIR)
    }
}

impl PrivilegeGate {
    pub fn new(symlink_dir: impl Into<PathBuf>) -> Self {
        Self {
            symlink_dir: symlink_dir.into(),
        }
    }

    pub fn needs_elevation(&self, install_path: &Path, create_symlink: bool) -> bool {
        let install_blocked = if install_path.exists() {
            !is_writable(install_path)
        } else {
            is_system_path(install_path)
        };
        if install_blocked {
            debug!("Install path {} requires elevation", install_path.display());
            return true;
        }
        if create_symlink && !(self.symlink_dir.is_dir() && is_writable(&self.symlink_dir)) {
            debug!(
                "Symlink dir {} is missing or not writable",
                self.symlink_dir.display()
            );
            return true;
        }
        false
    }

    /// Removal only needs the install directory itself to be writable.
    pub fn needs_elevation_for_removal(&self, install_path: &Path) -> bool {
        let parent = install_path.parent().unwrap_or(install_path);
        if parent.exists() {
            !is_writable(parent)
        } else {
            is_system_path(install_path)
        }
    }
}

fn is_system_path(path: &Path) -> bool {
    SYSTEM_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// `access(2)` with `W_OK` for the current process.
pub fn is_writable(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

pub fn is_elevated() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Arguments that make a fresh process repeat `request` without asking again.
pub fn install_reexec_args(request: &InstallRequest) -> Vec<String> {
    let mut args = vec!["install".to_string()];
    match &request.source {
        InstallSource::Local(path) => {
            args.push("--local-file".to_string());
            args.push(absolute_arg(path));
        }
        InstallSource::Url(url) => {
            args.push("--url".to_string());
            args.push(url.clone());
        }
    }
    args.push("--install-path".to_string());
    args.push(absolute_arg(&request.install_root));
    if request.create_desktop {
        args.push("--create-desktop".to_string());
    }
    if request.create_symlink {
        args.push("--create-symlink".to_string());
    }
    args.push("--auto-install".to_string());
    args
}

/// `path` resolved against the current directory. The elevated instance may
/// start somewhere else (pkexec switches to the target user's home).
pub fn absolute_arg(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Re-runs the current executable through `pkexec` (or `sudo`) with `args`
/// and waits for it. The caller is expected to exit with the returned status.
pub fn relaunch_elevated(args: &[String]) -> Result<ExitStatus> {
    let helper = ESCALATION_HELPERS
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            VsciError::DependencyMissing(
                "neither 'pkexec' nor 'sudo' was found on PATH".to_string(),
            )
        })?;
    let exe = std::env::current_exe()?;
    info!(
        "Relaunching {} with elevated privileges via {}",
        exe.display(),
        helper.display()
    );
    debug!("Relaunch arguments: {:?}", args);
    let status = Command::new(&helper).arg(&exe).args(args).status()?;
    Ok(status)
}
