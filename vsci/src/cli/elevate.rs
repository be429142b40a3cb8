// vsci/src/cli/elevate.rs
use std::process;

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use tracing::{debug, warn};
use vsci_common::error::{Result, VsciError};
use vsci_core::privilege;

/// Options shared by every command that may need to relaunch itself.
#[derive(Debug, Clone, Copy)]
pub struct ElevationFlags {
    /// This process is already a relaunched instance.
    pub auto_install: bool,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
}

/// Relaunches the program with `args` through the privilege helper and exits
/// with the child's status. Returns `original` when relaunching is not
/// allowed or declined.
pub fn relaunch_or_fail(args: Vec<String>, flags: ElevationFlags, original: VsciError) -> Result<()> {
    if flags.auto_install {
        warn!("Already relaunched once; not asking for privileges again");
        return Err(original);
    }

    if !flags.assume_yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("{original}. Relaunch with administrator privileges?"))
            .default(true)
            .interact()
            .map_err(|e| VsciError::InvalidInput(format!("Could not read confirmation: {e}")))?;
        if !confirmed {
            return Err(original);
        }
    }

    println!("{}", "Relaunching with administrator privileges...".bold());
    let status = privilege::relaunch_elevated(&args)?;
    debug!("Elevated instance exited with {}", status);
    process::exit(status.code().unwrap_or(1));
}
