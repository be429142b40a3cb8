use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VsciError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Missing system dependency: {0}")]
    DependencyMissing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("No valid executable found: {0}")]
    LocateFailure(String),

    #[error("Relocation failed: {0}")]
    RelocationFailure(String),

    #[error("Download failed for '{0}': {1}")]
    NetworkFailure(String, String),

    #[error("Registry Error: {0}")]
    RegistryFailure(String),

    #[error("Administrator privileges are required to {0}")]
    ElevationRequired(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Another vsci process holds the lock at {0}")]
    Busy(String),
}

impl VsciError {
    pub fn is_elevation_required(&self) -> bool {
        matches!(self, VsciError::ElevationRequired(_))
    }
}

impl From<std::io::Error> for VsciError {
    fn from(err: std::io::Error) -> Self {
        VsciError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for VsciError {
    fn from(err: reqwest::Error) -> Self {
        VsciError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for VsciError {
    fn from(err: serde_json::Error) -> Self {
        VsciError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, VsciError>;
