// vsci-core/src/lib.rs

mod fs_utils;
pub mod install;
pub mod privilege;
pub mod process;
pub mod registry;
pub mod uninstall;

// Re-export key types for easier use by the CLI crate
pub use install::{
    list_installed, update_existing_app, InstallContext, InstallReport, Installer, UpdateOptions,
};
pub use privilege::PrivilegeGate;
pub use registry::Registry;
pub use uninstall::{remove_app, RemovalReport};
