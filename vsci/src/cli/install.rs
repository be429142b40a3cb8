// vsci/src/cli/install.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use tracing::instrument;
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_common::model::{InstallRequest, InstallSource};
use vsci_core::privilege::install_reexec_args;
use vsci_core::{InstallReport, Installer};

use crate::cli::elevate::{self, ElevationFlags};
use crate::cli::status::run_with_status;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Archive on the local filesystem
    #[arg(long, value_name = "PATH", conflicts_with = "url", required_unless_present = "url")]
    pub local_file: Option<PathBuf>,

    /// Archive to download over HTTP(S)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Directory the application folder is created in [default: /opt]
    #[arg(long, value_name = "DIR")]
    pub install_path: Option<PathBuf>,

    #[arg(long, help = "Create a .desktop launcher entry")]
    pub create_desktop: bool,

    #[arg(long, help = "Link the executable into the system bin directory")]
    pub create_symlink: bool,

    /// Set on relaunched instances; never asks for privileges again
    #[arg(long)]
    pub auto_install: bool,

    #[arg(short = 'y', long = "yes", help = "Relaunch with privileges without asking")]
    pub assume_yes: bool,
}

impl InstallArgs {
    fn request(&self, config: &Config) -> Result<InstallRequest> {
        let source = match (&self.local_file, &self.url) {
            (Some(path), None) => InstallSource::Local(path.clone()),
            (None, Some(url)) => InstallSource::Url(url.clone()),
            _ => {
                return Err(VsciError::InvalidInput(
                    "exactly one of --local-file or --url is required".to_string(),
                ))
            }
        };
        let root = self
            .install_path
            .clone()
            .unwrap_or_else(|| config.default_install_root.clone());
        Ok(InstallRequest::new(source, root)
            .with_desktop(self.create_desktop)
            .with_symlink(self.create_symlink))
    }

    #[instrument(skip(self, config))]
    pub fn run(&self, config: &Config) -> Result<()> {
        let request = self.request(config)?;
        let job_request = request.clone();
        let result = run_with_status(config, move |ctx| Installer::new(ctx).install(job_request));
        match result {
            Ok(report) => {
                print_report(&report);
                Ok(())
            }
            Err(e) if e.is_elevation_required() => elevate::relaunch_or_fail(
                install_reexec_args(&request),
                ElevationFlags {
                    auto_install: self.auto_install,
                    assume_yes: self.assume_yes,
                },
                e,
            ),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn print_report(report: &InstallReport) {
    println!(
        "  {} {}",
        "Executable:".bold(),
        report.app.exec_path.display()
    );
    if let Some(link) = &report.app.symlink_path {
        println!("  {} {}", "Symlink:".bold(), link.display());
    }
    if let Some(entry) = &report.app.desktop_entry_path {
        println!("  {} {}", "Desktop entry:".bold(), entry.display());
    }
    if !report.warnings.is_empty() {
        println!(
            "{}",
            format!("Completed with {} warning(s):", report.warnings.len()).yellow()
        );
        for warning in &report.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }
}
