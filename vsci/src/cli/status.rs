// vsci/src/cli/status.rs
use std::sync::Arc;
use std::thread;

use colored::*;
use vsci_common::config::Config;
use vsci_common::error::{Result, VsciError};
use vsci_common::pipeline::{EventEmitter, InstallEvent, LogLevel, LogLine};
use vsci_core::InstallContext;

use crate::cli::ui;

/// Runs `job` on a worker thread while this thread renders its events.
/// Returns whatever the job returned.
pub fn run_with_status<T, F>(config: &Config, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(InstallContext) -> Result<T> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let ctx = InstallContext::new(config.clone(), EventEmitter::new(tx))?
        .with_checkpoint(thread::yield_now);
    let worker = thread::Builder::new()
        .name("vsci-install".to_string())
        .spawn(move || job(ctx))?;

    let pb = ui::create_progress_bar();
    // Ends once the worker drops its context, i.e. when the job is over.
    for event in rx.iter() {
        match event {
            InstallEvent::StageChanged(stage) => pb.set_message(stage.label()),
            InstallEvent::Progress(value) => pb.set_position(u64::from(value)),
            InstallEvent::Log(line) => pb.println(render_log_line(&line)),
            InstallEvent::ElevationRequired => {
                pb.println(format!(
                    "{} administrator privileges are required",
                    "!".yellow().bold()
                ));
            }
            InstallEvent::Completed { success, message } => {
                pb.finish_and_clear();
                if success {
                    println!("{} {}", "✓".green().bold(), message.green());
                }
            }
        }
    }
    pb.finish_and_clear();

    worker.join().unwrap_or_else(|_| {
        Err(VsciError::Io(Arc::new(std::io::Error::other(
            "install worker panicked",
        ))))
    })
}

fn render_log_line(line: &LogLine) -> String {
    let text = line.to_string();
    match line.level {
        LogLevel::Info => text.dimmed().to_string(),
        LogLevel::Warn => text.yellow().to_string(),
        LogLevel::Error => text.red().bold().to_string(),
    }
}
