// vsci-common/src/lib.rs
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export key types
pub use config::Config;
pub use error::{Result, VsciError};
pub use model::{InstallRequest, InstallSource, InstalledApp};
pub use pipeline::{EventEmitter, InstallEvent, InstallStage};
