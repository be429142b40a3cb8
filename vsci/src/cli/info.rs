use clap::Args;
use colored::Colorize;
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_core::Registry;

/// Show what is recorded about an installed application
#[derive(Args, Debug)]
pub struct Info {
    pub name: String,
}

impl Info {
    pub fn run(&self, config: &Config) -> Result<()> {
        let registry = Registry::open(config)?;
        let app = registry
            .get(&self.name)?
            .ok_or_else(|| VsciError::NotFound(format!("'{}' is not installed", self.name)))?;

        println!("{} {}", app.name.green().bold(), app.version);
        println!("{:<16}{}", "Location:".bold(), app.install_path.display());
        println!("{:<16}{}", "Executable:".bold(), app.exec_path.display());
        if let Some(url) = &app.source_url {
            println!("{:<16}{}", "Source:".bold(), url);
        }
        if let Some(link) = &app.symlink_path {
            println!("{:<16}{}", "Symlink:".bold(), link.display());
        }
        if let Some(entry) = &app.desktop_entry_path {
            println!("{:<16}{}", "Desktop entry:".bold(), entry.display());
        }
        println!(
            "{:<16}{}",
            "Installed:".bold(),
            app.install_date.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!(
            "{:<16}{}",
            "First seen:".bold(),
            app.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(())
    }
}
