// vsci-core/src/uninstall.rs
use std::path::PathBuf;

use tracing::debug;
use vsci_common::error::{Result, VsciError};
use vsci_common::pipeline::InstallStage;

use crate::fs_utils::remove_filesystem_artifact;
use crate::install::link::remove_symlink;
use crate::install::InstallContext;

#[derive(Debug, Clone, Default)]
pub struct RemovalReport {
    pub name: String,
    pub removed_dir: bool,
    pub removed_symlink: Option<PathBuf>,
    pub removed_desktop_entries: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Removes the install directory, symlink and desktop entry of `name`, then
/// its registry record. A failing step is reported as a warning and the
/// remaining steps still run.
pub fn remove_app(mut ctx: InstallContext, name: &str) -> Result<RemovalReport> {
    let app = ctx
        .registry
        .get(name)?
        .ok_or_else(|| VsciError::NotFound(format!("'{name}' is not installed")))?;
    ctx.events.info(format!(
        "Removing {} {} from {}",
        app.name,
        app.version,
        app.install_path.display()
    ));

    ctx.events.stage(InstallStage::CheckingPrivileges);
    if ctx.gate.needs_elevation_for_removal(&app.install_path) && !ctx.is_elevated() {
        ctx.events.elevation_required();
        let err = VsciError::ElevationRequired(format!("remove {}", app.install_path.display()));
        ctx.events.completed(false, err.to_string());
        return Err(err);
    }

    let mut report = RemovalReport {
        name: app.name.clone(),
        ..Default::default()
    };

    ctx.events.stage(InstallStage::CleaningUp);
    match remove_filesystem_artifact(&app.install_path) {
        Ok(true) => {
            report.removed_dir = true;
            ctx.events
                .info(format!("Removed {}", app.install_path.display()));
        }
        Ok(false) => ctx.events.warn(format!(
            "Install directory {} was already gone",
            app.install_path.display()
        )),
        Err(e) => ctx.events.warn(format!(
            "Could not remove {}: {e}",
            app.install_path.display()
        )),
    }

    let link = app
        .symlink_path
        .clone()
        .unwrap_or_else(|| ctx.config.symlink_path(&app.name));
    match remove_symlink(&link) {
        Ok(true) => {
            ctx.events.info(format!("Removed symlink {}", link.display()));
            report.removed_symlink = Some(link);
        }
        Ok(false) => debug!("No symlink at {}", link.display()),
        Err(e) => ctx
            .events
            .warn(format!("Could not remove symlink {}: {e}", link.display())),
    }

    let entries: Vec<PathBuf> = match &app.desktop_entry_path {
        Some(path) => vec![path.clone()],
        None => ctx.config.desktop_entry_candidates(&app.name).to_vec(),
    };
    for entry in entries {
        match remove_filesystem_artifact(&entry) {
            Ok(true) => {
                ctx.events
                    .info(format!("Removed desktop entry {}", entry.display()));
                report.removed_desktop_entries.push(entry);
            }
            Ok(false) => debug!("No desktop entry at {}", entry.display()),
            Err(e) => ctx.events.warn(format!(
                "Could not remove desktop entry {}: {e}",
                entry.display()
            )),
        }
    }

    if let Err(e) = ctx.registry.remove(&app.name) {
        let message = format!("Could not delete the record for {}: {e}", app.name);
        ctx.events.error(&message);
        ctx.events.completed(false, &message);
        return Err(e);
    }

    report.warnings = ctx.events.take_warnings();
    ctx.events.completed(true, format!("{} removed", app.name));
    Ok(report)
}
