use clap::Args;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use vsci_common::config::Config;
use vsci_common::error::Result;
use vsci_core::{list_installed, Registry};

#[derive(Args, Debug)]
pub struct List;

impl List {
    pub fn run(&self, config: &Config) -> Result<()> {
        let registry = Registry::open(config)?;
        let apps = list_installed(&registry)?;
        if apps.is_empty() {
            println!("{}", "0 applications installed".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
        table.add_row(Row::new(vec![
            Cell::new("Name").style_spec("b"),
            Cell::new("Version").style_spec("b"),
            Cell::new("Location").style_spec("b"),
            Cell::new("Installed").style_spec("b"),
        ]));
        for app in &apps {
            let version = if app.has_known_version() {
                Cell::new(&app.version)
            } else {
                Cell::new(&app.version).style_spec("Fy")
            };
            table.add_row(Row::new(vec![
                Cell::new(&app.name).style_spec("Fg"),
                version,
                Cell::new(&app.install_path.display().to_string()),
                Cell::new(&app.install_date.format("%Y-%m-%d %H:%M").to_string()),
            ]));
        }
        table.printstd();
        println!(
            "{}",
            format!("{} applications installed", apps.len()).bold()
        );
        Ok(())
    }
}
