// ============================================================================
// gstframes-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Spinners for Long-Running Commands
//
// Spinners are drawn on stderr and only when stderr is a terminal, so piped
// and captured output stays clean.

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

fn spinner(template: &str) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    pb.set_style(style);
    pb.enable_steady_tick(TICK_INTERVAL);
    pb
}

/// Spinner shown while the pipeline negotiates caps.
pub fn caps_spinner(trigger_stage: &str) -> ProgressBar {
    let pb = spinner("{spinner:.cyan} {msg} [{elapsed}]");
    pb.set_message(format!("Waiting for caps of {trigger_stage}"));
    pb
}

/// Spinner counting captured frames.
pub fn frame_counter(limit: Option<u64>) -> ProgressBar {
    let template = if limit.is_some() {
        "{spinner:.green} {pos}/{len} frames [{elapsed}] {per_sec}"
    } else {
        "{spinner:.green} {pos} frames [{elapsed}] {per_sec}"
    };
    let pb = spinner(template);
    if let Some(limit) = limit {
        pb.set_length(limit);
    }
    pb
}
