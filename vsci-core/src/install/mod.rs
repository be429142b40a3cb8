// vsci-core/src/install/mod.rs
//! The install pipeline: download, extract, locate, relocate, integrate,
//! register. One [`Installer`] runs one request.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_common::model::{InstallRequest, InstallSource, InstalledApp};
use vsci_common::pipeline::{EventEmitter, InstallStage};

use crate::privilege::{self, PrivilegeGate};
use crate::registry::Registry;

pub mod desktop;
pub mod extract;
pub mod link;
pub mod locate;
pub mod relocate;
pub mod staging;
pub mod version;

use self::desktop::DesktopEntry;
use self::locate::LocateResult;
use self::relocate::{Relocation, COPY_PROGRESS_START};
use self::staging::{DownloadedArchive, StagingArea};

pub(crate) mod milestones {
    pub const DEPENDENCIES: u8 = 5;
    pub const PRIVILEGES: u8 = 10;
    pub const STAGED: u8 = 20;
    pub const EXTRACTED: u8 = 40;
    pub const LOCATED: u8 = 50;
    pub const RELOCATED: u8 = 90;
    pub const LINKED: u8 = 92;
    pub const DESKTOP: u8 = 95;
    pub const REGISTERED: u8 = 98;
}

/// Everything one operation needs, passed explicitly instead of living in globals.
pub struct InstallContext {
    pub config: Config,
    pub registry: Registry,
    pub events: EventEmitter,
    pub gate: PrivilegeGate,
    elevated: bool,
    checkpoint: Box<dyn FnMut() + Send>,
}

impl InstallContext {
    pub fn new(config: Config, events: EventEmitter) -> Result<Self> {
        let registry = Registry::open(&config)?;
        let gate = PrivilegeGate::new(config.symlink_dir.clone());
        Ok(Self {
            config,
            registry,
            events,
            gate,
            elevated: privilege::is_elevated(),
            checkpoint: Box::new(|| {}),
        })
    }

    /// Called during long copies so an observer can refresh itself.
    pub fn with_checkpoint(mut self, checkpoint: impl FnMut() + Send + 'static) -> Self {
        self.checkpoint = Box::new(checkpoint);
        self
    }

    /// Overrides the detected privilege level.
    pub fn with_elevation(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    fn require_privileges(&mut self, needed: bool, action: String) -> Result<()> {
        if needed && !self.elevated {
            self.events.elevation_required();
            return Err(VsciError::ElevationRequired(action));
        }
        Ok(())
    }
}

/// Outcome of a successful install or update.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub app: InstalledApp,
    /// Non-fatal problems: failed symlink or desktop entry, unknown version,
    /// registry write failure.
    pub warnings: Vec<String>,
    pub registered: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub create_desktop: bool,
    pub create_symlink: bool,
}

pub struct Installer {
    ctx: InstallContext,
    previous: Option<InstalledApp>,
}

impl Installer {
    pub fn new(ctx: InstallContext) -> Self {
        Self {
            ctx,
            previous: None,
        }
    }

    /// Replaces `previous` in place: same directory, same record name.
    fn replacing(mut self, previous: InstalledApp) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Runs the whole pipeline. Consumes the installer; a failed run cannot be resumed.
    pub fn install(mut self, request: InstallRequest) -> Result<InstallReport> {
        self.ctx.events.stage(InstallStage::Idle);
        self.ctx
            .events
            .info(format!("Starting installation from {}", request.source));

        let result = self.run(&request);

        let events = &mut self.ctx.events;
        match &result {
            Ok(report) => {
                events.stage(InstallStage::Completed);
                events.completed(
                    true,
                    format!(
                        "{} {} installed in {}",
                        report.app.name,
                        report.app.version,
                        report.app.install_path.display()
                    ),
                );
            }
            Err(e) => {
                events.error(e.to_string());
                events.stage(InstallStage::Completed);
                events.completed(false, e.to_string());
            }
        }
        result
    }

    fn run(&mut self, request: &InstallRequest) -> Result<InstallReport> {
        validate_request(request)?;

        self.ctx.events.stage(InstallStage::CheckingDependencies);
        extract::check_dependencies(&self.ctx.config)?;
        self.ctx.events.progress(milestones::DEPENDENCIES);

        self.ctx.events.stage(InstallStage::CheckingPrivileges);
        let needs = self
            .ctx
            .gate
            .needs_elevation(request.install_root(), request.create_symlink);
        self.ctx.require_privileges(
            needs,
            format!("install into {}", request.install_root().display()),
        )?;
        self.ctx.events.progress(milestones::PRIVILEGES);

        let (download, archive) = match &request.source {
            InstallSource::Url(url) => {
                let downloaded = self.download(url)?;
                let path = downloaded.path().to_path_buf();
                (Some(downloaded), path)
            }
            InstallSource::Local(path) => (None, path.clone()),
        };

        let result = self.extract_and_install(request, &archive);

        self.ctx.events.stage(InstallStage::CleaningUp);
        drop(download);
        self.ctx.events.info("Temporary files removed");
        result
    }

    fn download(&mut self, url: &str) -> Result<DownloadedArchive> {
        self.ctx.events.stage(InstallStage::Downloading);
        let parsed = vsci_net::validate_url(url)?;
        let file_name = vsci_net::file_name_from_url(&parsed);
        let target = DownloadedArchive::reserve(&self.ctx.config.temp_root, &file_name)?;
        self.ctx.events.info(format!("Downloading {url}"));

        let events = &mut self.ctx.events;
        let bytes = vsci_net::fetch(url, target.path(), &mut |received, total| {
            if let Some(percent) = vsci_net::download_progress_percent(received, total) {
                events.progress(percent);
            }
        })?;
        self.ctx
            .events
            .info(format!("Downloaded {bytes} bytes to {}", target.path().display()));
        Ok(target)
    }

    fn extract_and_install(
        &mut self,
        request: &InstallRequest,
        archive: &Path,
    ) -> Result<InstallReport> {
        self.ctx.events.stage(InstallStage::Extracting);
        let staging = StagingArea::create(&self.ctx.config.temp_root)?;
        self.ctx.events.progress(milestones::STAGED);
        self.ctx.events.info(format!(
            "Extracting {} into {}",
            archive.display(),
            staging.path().display()
        ));
        let entries = extract::extract_archive(&self.ctx.config, archive, staging.path())?;
        for entry in &entries {
            self.ctx.events.info(format!(
                "Extracted {}: {}",
                if entry.is_dir { "directory" } else { "file" },
                entry.path.display()
            ));
        }
        self.ctx.events.progress(milestones::EXTRACTED);

        self.ctx.events.stage(InstallStage::Locating);
        let located = locate::locate(staging.path()).ok_or_else(|| {
            VsciError::LocateFailure(format!(
                "no ELF binary or script within {} levels of the archive root",
                locate::MAX_DEPTH
            ))
        })?;
        self.ctx.events.info(format!(
            "Found executable {}",
            located.exec_path.display()
        ));
        self.ctx.events.progress(milestones::LOCATED);

        let (app_name, final_dir) = self.target_for(request, &located)?;
        let report = self.install_located(request, &located, app_name, final_dir);

        // The staging area goes away here on every path.
        drop(staging);
        report
    }

    fn target_for(
        &mut self,
        request: &InstallRequest,
        located: &LocateResult,
    ) -> Result<(String, PathBuf)> {
        let (name, dir) = match &self.previous {
            Some(previous) => {
                if previous.name != located.app_name {
                    let message = format!(
                        "Archive contains '{}' but '{}' is being updated; keeping the existing name",
                        located.app_name, previous.name
                    );
                    self.ctx.events.warn(message);
                }
                (previous.name.clone(), previous.install_path.clone())
            }
            None => (
                located.app_name.clone(),
                request.install_root().join(&located.app_name),
            ),
        };
        if !locate::is_valid_app_name(&name) || dir.parent() != Some(request.install_root()) {
            return Err(VsciError::LocateFailure(format!(
                "'{}' cannot be used as an install directory name under {}",
                name,
                request.install_root().display()
            )));
        }
        Ok((name, dir))
    }

    fn install_located(
        &mut self,
        request: &InstallRequest,
        located: &LocateResult,
        app_name: String,
        final_dir: PathBuf,
    ) -> Result<InstallReport> {
        self.ctx.events.stage(InstallStage::Relocating);
        self.ctx.events.progress(COPY_PROGRESS_START);
        self.ctx.events.info(format!(
            "Moving {} to {}",
            located.app_dir.display(),
            final_dir.display()
        ));
        let InstallContext {
            events, checkpoint, ..
        } = &mut self.ctx;
        let outcome = relocate::relocate(
            &located.app_dir,
            &final_dir,
            &mut |percent| events.progress(percent),
            &mut **checkpoint,
        )?;
        match outcome {
            Relocation::Renamed => debug!("Relocated by rename"),
            Relocation::Copied { source_left_behind } => {
                self.ctx.events.info("Relocated by copying");
                if let Some(warning) = source_left_behind {
                    self.ctx.events.warn(warning);
                }
            }
        }
        self.ctx.events.progress(milestones::RELOCATED);

        let exec_name = located.exec_path.file_name().unwrap_or_default();
        let exec_path = final_dir.join(exec_name);

        let mut symlink_path = None;
        if request.create_symlink {
            self.ctx.events.stage(InstallStage::Linking);
            let link = self.ctx.config.symlink_path(&app_name);
            match link::create_symlink(&exec_path, &link) {
                Ok(()) => {
                    self.ctx
                        .events
                        .info(format!("Created symlink {}", link.display()));
                    symlink_path = Some(link);
                }
                Err(e) => self
                    .ctx
                    .events
                    .warn(format!("Could not create symlink {}: {e}", link.display())),
            }
        }
        self.ctx.events.progress(milestones::LINKED);

        let mut desktop_entry_path = None;
        if request.create_desktop {
            self.ctx.events.stage(InstallStage::CreatingDesktopEntry);
            let dir = self.ctx.config.applications_dir(self.ctx.elevated).to_path_buf();
            let entry = DesktopEntry::for_app(&app_name, &exec_path, &final_dir);
            match entry.write_to(&dir, &app_name) {
                Ok(path) => {
                    self.ctx
                        .events
                        .info(format!("Created desktop entry {}", path.display()));
                    desktop_entry_path = Some(path);
                }
                Err(e) => self.ctx.events.warn(format!(
                    "Could not create desktop entry in {}: {e}",
                    dir.display()
                )),
            }
        }
        self.ctx.events.progress(milestones::DESKTOP);

        self.ctx.events.stage(InstallStage::ProbingVersionAndRegistering);
        let version = version::probe_version(&exec_path, self.ctx.config.version_probe_timeout);
        let now = Utc::now();
        let app = InstalledApp {
            name: app_name,
            version,
            install_path: final_dir,
            source_url: request.source.url().map(str::to_string),
            exec_path,
            install_date: now,
            created_at: self.previous.as_ref().map_or(now, |p| p.created_at),
            symlink_path,
            desktop_entry_path,
        };
        if app.has_known_version() {
            self.ctx.events.info(format!("Detected version {}", app.version));
        } else {
            self.ctx.events.warn(format!(
                "Could not determine the version of {}",
                app.exec_path.display()
            ));
        }

        let registered = match self.ctx.registry.upsert(&app) {
            Ok(()) => true,
            Err(e) => {
                self.ctx
                    .events
                    .warn(format!("Installed, but could not record {}: {e}", app.name));
                false
            }
        };
        self.ctx.events.progress(milestones::REGISTERED);

        Ok(InstallReport {
            app,
            warnings: self.ctx.events.take_warnings(),
            registered,
        })
    }
}

fn validate_request(request: &InstallRequest) -> Result<()> {
    if request.install_root().as_os_str().is_empty() {
        return Err(VsciError::InvalidInput(
            "the install path must not be empty".to_string(),
        ));
    }
    match &request.source {
        InstallSource::Local(path) if !path.is_file() => Err(VsciError::InvalidInput(format!(
            "source file {} does not exist",
            path.display()
        ))),
        InstallSource::Url(url) if url.trim().is_empty() => Err(VsciError::InvalidInput(
            "the source URL must not be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Reinstalls `name` from `source` into the directory recorded for it.
/// Integrations recorded for the old install are recreated.
pub fn update_existing_app(
    ctx: InstallContext,
    name: &str,
    source: InstallSource,
    options: UpdateOptions,
) -> Result<InstallReport> {
    let existing = ctx
        .registry
        .get(name)?
        .ok_or_else(|| VsciError::NotFound(format!("'{name}' is not installed")))?;
    let install_root = existing
        .install_path
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            VsciError::InvalidInput(format!(
                "recorded install path {} has no parent",
                existing.install_path.display()
            ))
        })?;
    debug!(
        "Updating {} {} at {}",
        existing.name,
        existing.version,
        existing.install_path.display()
    );

    let request = InstallRequest::new(source, install_root)
        .with_desktop(options.create_desktop || existing.desktop_entry_path.is_some())
        .with_symlink(options.create_symlink || existing.symlink_path.is_some());
    Installer::new(ctx).replacing(existing).install(request)
}

/// Installed applications, ordered by name.
pub fn list_installed(registry: &Registry) -> Result<Vec<InstalledApp>> {
    registry.list()
}
