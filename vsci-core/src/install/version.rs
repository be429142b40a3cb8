// vsci-core/src/install/version.rs
use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use vsci_common::model::UNKNOWN_VERSION;

use crate::process::run_with_timeout;

const VERSION_FLAGS: [&str; 3] = ["--version", "-v", "version"];

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"\d+\.\d+\.\d+").unwrap();
}

/// Runs `exec` with each version flag in turn and returns the first
/// `X.Y.Z` found on stdout of a successful run, or `"unknown"`.
pub fn probe_version(exec: &Path, timeout: Duration) -> String {
    for flag in VERSION_FLAGS {
        match run_with_timeout(exec, [flag], timeout) {
            Ok(out) if out.success() => {
                if let Some(version) = extract_version(&out.stdout) {
                    debug!("{} {} -> {}", exec.display(), flag, version);
                    return version;
                }
            }
            Ok(out) => debug!("{} {} exited with {}", exec.display(), flag, out.status),
            Err(e) => debug!("{} {}: {}", exec.display(), flag, e),
        }
    }
    UNKNOWN_VERSION.to_string()
}

pub fn extract_version(text: &str) -> Option<String> {
    VERSION_RE.find(text).map(|m| m.as_str().to_string())
}
