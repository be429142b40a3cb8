// vsci-common/src/pipeline.rs
use std::fmt;

use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// --- Shared Enums / Structs ---

/// States of one install operation, in the order the orchestrator walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstallStage {
    Idle,
    CheckingDependencies,
    CheckingPrivileges,
    Downloading,
    Extracting,
    Locating,
    Relocating,
    Linking,
    CreatingDesktopEntry,
    ProbingVersionAndRegistering,
    CleaningUp,
    Completed,
}

impl InstallStage {
    pub fn label(&self) -> &'static str {
        match self {
            InstallStage::Idle => "idle",
            InstallStage::CheckingDependencies => "checking dependencies",
            InstallStage::CheckingPrivileges => "checking privileges",
            InstallStage::Downloading => "downloading",
            InstallStage::Extracting => "extracting",
            InstallStage::Locating => "locating executable",
            InstallStage::Relocating => "relocating",
            InstallStage::Linking => "linking",
            InstallStage::CreatingDesktopEntry => "creating desktop entry",
            InstallStage::ProbingVersionAndRegistering => "registering",
            InstallStage::CleaningUp => "cleaning up",
            InstallStage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstallEvent {
    StageChanged(InstallStage),
    /// Overall progress, 0–100, never decreasing within one operation.
    Progress(u8),
    Log(LogLine),
    Completed { success: bool, message: String },
    ElevationRequired,
}

/// Writes structured events for one operation. Without a sender it only
/// mirrors log lines to `tracing`.
#[derive(Debug, Default)]
pub struct EventEmitter {
    tx: Option<Sender<InstallEvent>>,
    progress: u8,
    warnings: Vec<String>,
}

impl EventEmitter {
    pub fn new(tx: Sender<InstallEvent>) -> Self {
        Self {
            tx: Some(tx),
            progress: 0,
            warnings: Vec::new(),
        }
    }

    /// An emitter nobody listens to.
    pub fn silent() -> Self {
        Self::default()
    }

    fn send(&self, event: InstallEvent) {
        if let Some(tx) = &self.tx {
            // A caller that stopped draining must not break the install.
            if tx.send(event).is_err() {
                debug!("Event receiver dropped; continuing without observer");
            }
        }
    }

    pub fn stage(&self, stage: InstallStage) {
        debug!("Entering stage: {}", stage.label());
        self.send(InstallEvent::StageChanged(stage));
    }

    /// Reports progress, clamped to 100 and ignored if lower than what was
    /// already reported.
    pub fn progress(&mut self, value: u8) {
        let value = value.min(100);
        if value > self.progress {
            self.progress = value;
            self.send(InstallEvent::Progress(value));
        }
    }

    pub fn current_progress(&self) -> u8 {
        self.progress
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.log(LogLevel::Info, message);
    }

    /// Logs a non-fatal problem and keeps it for the final report.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message.clone());
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: String) {
        self.send(InstallEvent::Log(LogLine {
            at: Local::now(),
            level,
            message,
        }));
    }

    pub fn elevation_required(&self) {
        self.send(InstallEvent::ElevationRequired);
    }

    pub fn completed(&mut self, success: bool, message: impl Into<String>) {
        if success {
            self.progress(100);
        }
        self.send(InstallEvent::Completed {
            success,
            message: message.into(),
        });
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut emitter = EventEmitter::new(tx);
        emitter.progress(20);
        emitter.progress(10);
        emitter.progress(20);
        emitter.progress(250);
        drop(emitter);

        let values: Vec<u8> = rx
            .iter()
            .filter_map(|e| match e {
                InstallEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![20, 100]);
    }

    #[test]
    fn warnings_are_collected_and_logged() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut emitter = EventEmitter::new(tx);
        emitter.warn("symlink failed");
        assert_eq!(emitter.take_warnings(), vec!["symlink failed".to_string()]);
        assert!(emitter.take_warnings().is_empty());
        drop(emitter);

        match rx.recv().unwrap() {
            InstallEvent::Log(line) => {
                assert_eq!(line.level, LogLevel::Warn);
                let rendered = line.to_string();
                assert!(rendered.starts_with('['));
                assert!(rendered.ends_with("] symlink failed"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn silent_emitter_tolerates_everything() {
        let mut emitter = EventEmitter::silent();
        emitter.info("hello");
        emitter.progress(50);
        emitter.completed(true, "done");
        assert_eq!(emitter.current_progress(), 100);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(InstallStage::Extracting < InstallStage::Locating);
        assert!(InstallStage::CleaningUp < InstallStage::Completed);
    }
}
