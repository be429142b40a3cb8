//! Small helpers for terminal widgets.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// A 0–100 progress bar showing the current stage as its message.
pub fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.blue.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
