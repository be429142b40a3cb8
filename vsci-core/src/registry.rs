// vsci-core/src/registry.rs
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_common::model::InstalledApp;

const FORMAT_VERSION: u32 = 1;
const STALE_LOCK_AFTER: Duration = Duration::from_secs(60);
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);
const LOCK_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default = "format_version")]
    version: u32,
    #[serde(default)]
    apps: BTreeMap<String, InstalledApp>,
}

fn format_version() -> u32 {
    FORMAT_VERSION
}

/// Installed applications keyed by name, persisted as one JSON document.
/// Every call reads the file afresh, so the registry survives re-execs and
/// sees changes made by other processes.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl Registry {
    pub fn open(config: &Config) -> Result<Self> {
        Self::at(config.registry_path(), config.registry_lock_path())
    }

    pub fn at(path: PathBuf, lock_path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                VsciError::RegistryFailure(format!(
                    "Cannot create registry directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        debug!("Using registry at {}", path.display());
        Ok(Self { path, lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Result<Option<InstalledApp>> {
        Ok(self.load()?.apps.remove(name))
    }

    /// All records, ordered by name.
    pub fn list(&self) -> Result<Vec<InstalledApp>> {
        Ok(self.load()?.apps.into_values().collect())
    }

    /// Inserts `app`, replacing any record with the same name.
    pub fn upsert(&self, app: &InstalledApp) -> Result<()> {
        let _lock = RegistryLock::acquire(&self.lock_path)?;
        let mut file = self.load()?;
        file.apps.insert(app.name.clone(), app.clone());
        self.store(&file)?;
        debug!("Registered {} {}", app.name, app.version);
        Ok(())
    }

    /// Deletes the record for `name`. Returns whether one existed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let _lock = RegistryLock::acquire(&self.lock_path)?;
        let mut file = self.load()?;
        let existed = file.apps.remove(name).is_some();
        if existed {
            self.store(&file)?;
            debug!("Removed registry record {}", name);
        }
        Ok(existed)
    }

    fn load(&self) -> Result<RegistryFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(RegistryFile {
                    version: FORMAT_VERSION,
                    apps: BTreeMap::new(),
                })
            }
            Err(e) => {
                return Err(VsciError::RegistryFailure(format!(
                    "Cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            error!("Registry {} is corrupt: {}", self.path.display(), e);
            VsciError::RegistryFailure(format!("Cannot parse {}: {e}", self.path.display()))
        })
    }

    fn store(&self, file: &RegistryFile) -> Result<()> {
        let content = serde_json::to_vec_pretty(file)?;
        atomic_write(&self.path, &content).map_err(|e| {
            VsciError::RegistryFailure(format!("Cannot write {}: {e}", self.path.display()))
        })
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Exclusive lock held while a registry mutation reads and rewrites the file.
struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    fn acquire(path: &Path) -> Result<Self> {
        let deadline = SystemTime::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(path) {
                        warn!("Removing stale registry lock {}", path.display());
                        let _ = fs::remove_file(path);
                        continue;
                    }
                    if SystemTime::now() >= deadline {
                        return Err(VsciError::Busy(path.display().to_string()));
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => {
                    return Err(VsciError::RegistryFailure(format!(
                        "Cannot create lock {}: {e}",
                        path.display()
                    )))
                }
            }
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > STALE_LOCK_AFTER)
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release registry lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn app(name: &str, version: &str) -> InstalledApp {
        let now = Utc::now();
        InstalledApp {
            name: name.to_string(),
            version: version.to_string(),
            install_path: PathBuf::from(format!("/opt/{name}")),
            source_url: None,
            exec_path: PathBuf::from(format!("/opt/{name}/{name}")),
            install_date: now,
            created_at: now,
            symlink_path: None,
            desktop_entry_path: None,
        }
    }

    #[test]
    fn missing_file_is_an_empty_registry() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::open(&Config::rooted_at(tmp.path())).unwrap();
        assert!(registry.list().unwrap().is_empty());
        assert_eq!(registry.get("app").unwrap(), None);
    }

    #[test]
    fn upsert_replaces_and_list_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let registry = Registry::open(&config).unwrap();
        registry.upsert(&app("zed", "1.0.0")).unwrap();
        registry.upsert(&app("app", "1.0.0")).unwrap();
        registry.upsert(&app("app", "2.0.0")).unwrap();

        let reopened = Registry::open(&config).unwrap();
        let names: Vec<_> = reopened.list().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["app", "zed"]);
        assert_eq!(reopened.get("app").unwrap().unwrap().version, "2.0.0");
        assert!(!config.registry_lock_path().exists());
    }

    #[test]
    fn remove_reports_whether_record_existed() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Registry::open(&Config::rooted_at(tmp.path())).unwrap();
        registry.upsert(&app("app", "1.0.0")).unwrap();
        assert!(registry.remove("app").unwrap());
        assert!(!registry.remove("app").unwrap());
    }

    #[test]
    fn corrupt_file_is_a_registry_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let registry = Registry::open(&config).unwrap();
        fs::write(config.registry_path(), b"{ not json").unwrap();
        assert!(matches!(registry.list(), Err(VsciError::RegistryFailure(_))));
        assert!(matches!(
            registry.upsert(&app("app", "1")),
            Err(VsciError::RegistryFailure(_))
        ));
    }

    #[test]
    fn held_lock_makes_writers_busy_until_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::rooted_at(tmp.path());
        let registry = Registry::open(&config).unwrap();
        let lock = config.registry_lock_path();
        fs::write(&lock, b"12345").unwrap();
        assert!(matches!(
            registry.upsert(&app("app", "1")),
            Err(VsciError::Busy(_))
        ));

        let old = SystemTime::now() - Duration::from_secs(120);
        fs::File::options()
            .write(true)
            .open(&lock)
            .unwrap()
            .set_modified(old)
            .unwrap();
        registry.upsert(&app("app", "1")).unwrap();
        assert!(!lock.exists());
    }
}
