// vsci-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use tracing::debug;

use super::error::{Result, VsciError};

const DEFAULT_INSTALL_ROOT: &str = "/opt";
const DEFAULT_SYMLINK_DIR: &str = "/usr/local/bin";
const SYSTEM_APPLICATIONS_DIR: &str = "/usr/share/applications";
const DEFAULT_TAR_PROGRAM: &str = "tar";
const REGISTRY_FILENAME: &str = "apps.json";

pub const EXTRACTION_TIMEOUT_SECS: u64 = 300;
pub const VERSION_PROBE_TIMEOUT_SECS: u64 = 3;
pub const DEPENDENCY_PROBE_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub temp_root: PathBuf,
    pub default_install_root: PathBuf,
    pub symlink_dir: PathBuf,
    pub system_applications_dir: PathBuf,
    pub user_applications_dir: PathBuf,
    pub data_dir: PathBuf,
    pub tar_program: String,
    pub extraction_timeout: Duration,
    pub version_probe_timeout: Duration,
    pub dependency_probe_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading vsci configuration");

        let base_dirs = BaseDirs::new().ok_or_else(|| {
            VsciError::Config("Could not determine the home directory".to_string())
        })?;

        let data_dir = env_path("VSCI_DATA_DIR").unwrap_or_else(|| {
            ProjectDirs::from("", "", "vsci")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| base_dirs.data_dir().join("vsci"))
        });

        let config = Self {
            temp_root: env_path("VSCI_TEMP_DIR").unwrap_or_else(env::temp_dir),
            default_install_root: env_path("VSCI_INSTALL_ROOT")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_ROOT)),
            symlink_dir: env_path("VSCI_BIN_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SYMLINK_DIR)),
            system_applications_dir: PathBuf::from(SYSTEM_APPLICATIONS_DIR),
            user_applications_dir: base_dirs.data_dir().join("applications"),
            data_dir,
            tar_program: env::var("VSCI_TAR")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TAR_PROGRAM.to_string()),
            extraction_timeout: Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
            version_probe_timeout: Duration::from_secs(VERSION_PROBE_TIMEOUT_SECS),
            dependency_probe_timeout: Duration::from_secs(DEPENDENCY_PROBE_TIMEOUT_SECS),
        };

        debug!("Effective data dir: {}", config.data_dir.display());
        debug!("Configuration loaded successfully.");
        Ok(config)
    }

    /// Builds a configuration whose every writable location lives under `root`.
    /// Used by tests and by callers that sandbox an install.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            temp_root: root.join("tmp"),
            default_install_root: root.join("opt"),
            symlink_dir: root.join("bin"),
            system_applications_dir: root.join("share/applications"),
            user_applications_dir: root.join("home/.local/share/applications"),
            data_dir: root.join("data"),
            tar_program: DEFAULT_TAR_PROGRAM.to_string(),
            extraction_timeout: Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
            version_probe_timeout: Duration::from_secs(VERSION_PROBE_TIMEOUT_SECS),
            dependency_probe_timeout: Duration::from_secs(DEPENDENCY_PROBE_TIMEOUT_SECS),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILENAME)
    }

    pub fn registry_lock_path(&self) -> PathBuf {
        self.data_dir.join(format!("{REGISTRY_FILENAME}.lock"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn symlink_path(&self, app_name: &str) -> PathBuf {
        self.symlink_dir.join(app_name)
    }

    /// System-wide applications directory when elevated, per-user otherwise.
    pub fn applications_dir(&self, elevated: bool) -> &Path {
        if elevated {
            &self.system_applications_dir
        } else {
            &self.user_applications_dir
        }
    }

    pub fn desktop_entry_candidates(&self, app_name: &str) -> [PathBuf; 2] {
        let file_name = format!("{app_name}.desktop");
        [
            self.user_applications_dir.join(&file_name),
            self.system_applications_dir.join(&file_name),
        ]
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
