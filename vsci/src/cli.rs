// vsci/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use vsci_common::error::Result;
use vsci_common::Config;

pub mod elevate;
pub mod info;
pub mod install;
pub mod list;
pub mod status;
pub mod ui;
pub mod uninstall;
pub mod update;

use crate::cli::info::Info;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::uninstall::Uninstall;
use crate::cli::update::UpdateArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "vsci", bin_name = "vsci")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install an application from a tarball
    Install(InstallArgs),
    Update(UpdateArgs),
    /// Remove installed applications and their integrations
    Uninstall(Uninstall),
    /// List installed applications
    List(List),
    Info(Info),
}

impl Command {
    pub fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config),
            Self::Update(command) => command.run(config),
            Self::Uninstall(command) => command.run(config),
            Self::List(command) => command.run(config),
            Self::Info(command) => command.run(config),
        }
    }
}
