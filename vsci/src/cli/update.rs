// vsci/src/cli/update.rs
use clap::Args;
use vsci_common::config::Config;
use vsci_common::error::Result;
use vsci_common::model::InstallSource;
use vsci_core::privilege::absolute_arg;
use vsci_core::{update_existing_app, UpdateOptions};

use crate::cli::elevate::{self, ElevationFlags};
use crate::cli::install::print_report;
use crate::cli::status::run_with_status;

/// Reinstall an application in place from a new archive
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Name the application was registered under
    pub name: String,

    /// New archive: a local path, or an http(s) URL
    pub source: String,

    #[arg(long, help = "Also create a desktop entry if the old install had none")]
    pub create_desktop: bool,

    #[arg(long, help = "Also create a symlink if the old install had none")]
    pub create_symlink: bool,

    #[arg(long)]
    pub auto_install: bool,

    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,
}

impl UpdateArgs {
    fn reexec_args(&self) -> Vec<String> {
        let source = match InstallSource::parse(&self.source) {
            InstallSource::Local(path) => absolute_arg(&path),
            InstallSource::Url(url) => url,
        };
        let mut args = vec!["update".to_string(), self.name.clone(), source];
        if self.create_desktop {
            args.push("--create-desktop".to_string());
        }
        if self.create_symlink {
            args.push("--create-symlink".to_string());
        }
        args.push("--auto-install".to_string());
        args
    }

    pub fn run(&self, config: &Config) -> Result<()> {
        let name = self.name.clone();
        let source = InstallSource::parse(&self.source);
        let options = UpdateOptions {
            create_desktop: self.create_desktop,
            create_symlink: self.create_symlink,
        };
        println!("Updating {}...", self.name);
        match run_with_status(config, move |ctx| {
            update_existing_app(ctx, &name, source, options)
        }) {
            Ok(report) => {
                print_report(&report);
                Ok(())
            }
            Err(e) if e.is_elevation_required() => elevate::relaunch_or_fail(
                self.reexec_args(),
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
