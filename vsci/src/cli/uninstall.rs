// vsci/src/cli/uninstall.rs
use clap::Args;
use colored::Colorize;
use tracing::error;
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_core::remove_app;

use crate::cli::elevate::{self, ElevationFlags};
use crate::cli::status::run_with_status;

#[derive(Args, Debug)]
pub struct Uninstall {
    /// The names of the applications to remove
    #[arg(required = true)]
    pub names: Vec<String>,

    #[arg(long)]
    pub auto_install: bool,

    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,
}

impl Uninstall {
    pub fn run(&self, config: &Config) -> Result<()> {
        let mut failures: Vec<(String, VsciError)> = Vec::new();

        for (index, name) in self.names.iter().enumerate() {
            println!("Uninstalling {name}...");
            let job_name = name.clone();
            match run_with_status(config, move |ctx| remove_app(ctx, &job_name)) {
                Ok(report) => {
                    for warning in &report.warnings {
                        println!("  {} {}", "!".yellow(), warning);
                    }
                }
                Err(e) if e.is_elevation_required() => {
                    // Hand the rest of the list to the elevated instance.
                    let mut args = vec!["uninstall".to_string()];
                    args.extend(self.names[index..].iter().cloned());
                    args.push("--auto-install".to_string());
                    return elevate::relaunch_or_fail(
                        args,
                        ElevationFlags {
                            auto_install: self.auto_install,
                            assume_yes: self.assume_yes,
                        },
                        e,
                    );
                }
                Err(e) => {
                    error!("✖ Failed to uninstall '{}': {}", name.cyan(), e);
                    failures.push((name.clone(), e));
                }
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0).1),
            n => Err(VsciError::InvalidInput(format!(
                "{n} applications could not be removed: {}",
                failures
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}
