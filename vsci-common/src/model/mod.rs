// src/model/mod.rs
pub mod installed;
pub mod request;

pub use installed::{InstalledApp, UNKNOWN_VERSION};
pub use request::{InstallRequest, InstallSource};
