// vsci-common/src/model/request.rs
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the archive for an install comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InstallSource {
    Local(PathBuf),
    Url(String),
}

impl InstallSource {
    /// Anything starting with `http://` or `https://` is a URL, everything else a local path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            InstallSource::Url(trimmed.to_string())
        } else {
            InstallSource::Local(PathBuf::from(trimmed))
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, InstallSource::Url(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            InstallSource::Url(url) => Some(url),
            InstallSource::Local(_) => None,
        }
    }
}

impl fmt::Display for InstallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallSource::Local(path) => write!(f, "{}", path.display()),
            InstallSource::Url(url) => f.write_str(url),
        }
    }
}

/// One install, immutable for its whole duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub source: InstallSource,
    pub install_root: PathBuf,
    pub create_desktop: bool,
    pub create_symlink: bool,
}

impl InstallRequest {
    pub fn new(source: InstallSource, install_root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            install_root: install_root.into(),
            create_desktop: false,
            create_symlink: false,
        }
    }

    pub fn with_desktop(mut self, create_desktop: bool) -> Self {
        self.create_desktop = create_desktop;
        self
    }

    pub fn with_symlink(mut self, create_symlink: bool) -> Self {
        self.create_symlink = create_symlink;
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_urls_from_paths() {
        assert_eq!(
            InstallSource::parse("https://example.com/app.tar.gz"),
            InstallSource::Url("https://example.com/app.tar.gz".to_string())
        );
        assert_eq!(
            InstallSource::parse(" http://mirror/app.tgz "),
            InstallSource::Url("http://mirror/app.tgz".to_string())
        );
        assert_eq!(
            InstallSource::parse("/home/me/app.tar.xz"),
            InstallSource::Local(PathBuf::from("/home/me/app.tar.xz"))
        );
        assert!(!InstallSource::parse("ftp.tar").is_url());
    }

    #[test]
    fn builder_sets_flags() {
        let request = InstallRequest::new(InstallSource::parse("a.tar"), "/opt")
            .with_desktop(true)
            .with_symlink(false);
        assert!(request.create_desktop);
        assert!(!request.create_symlink);
        assert_eq!(request.install_root(), Path::new("/opt"));
    }
}
