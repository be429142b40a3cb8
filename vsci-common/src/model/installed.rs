// vsci-common/src/model/installed.rs
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded when `--version` probing finds nothing usable.
pub const UNKNOWN_VERSION: &str = "unknown";

/// A persisted installation, keyed uniquely by `name` in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub name: String,
    pub version: String,
    pub install_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub exec_path: PathBuf,
    pub install_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// The symlink this install created, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_path: Option<PathBuf>,
    /// The desktop entry this install created, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_entry_path: Option<PathBuf>,
}

impl InstalledApp {
    pub fn has_known_version(&self) -> bool {
        self.version != UNKNOWN_VERSION
    }
}
