//! Console Progress Rendering
//!
//! Turns engine events into styled console lines. The renderer owns a
//! broadcast subscription and runs until the bus closes.

use std::time::Duration;

use console::style;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::events::{EngineEvent, MessageLevel};

/// Width of the batch progress bar
const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer {
    show_stages: bool,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self { show_stages: false }
    }

    /// Also print stage start and completion lines
    pub fn with_stages(mut self, show: bool) -> Self {
        self.show_stages = show;
        self
    }

    /// Render one event, `None` for events that stay silent
    pub fn render(&self, event: &EngineEvent) -> Option<String> {
        let line = match event {
            EngineEvent::StageStarted { stage } if self.show_stages => {
                format!("{} {}", style("▸").cyan(), stage)
            }
            EngineEvent::StageCompleted { stage, duration_ms } if self.show_stages => format!(
                "{} {} {}",
                style("✓").green(),
                stage,
                style(format_duration(Duration::from_millis(*duration_ms))).dim()
            ),
            EngineEvent::BaselineChecked { passed: false, failed } => format!(
                "{} Baseline unstable: {}",
                style("✗").red(),
                failed.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
            ),
            EngineEvent::SnapshotCreated { snapshot } => {
                format!("{} Snapshot {}", style("•").dim(), style(snapshot).dim())
            }
            EngineEvent::BatchStarted {
                index,
                total,
                phase,
                files,
                issues,
            } => format!(
                "{} batch {}/{} {}: {} issue(s) in {} file(s)",
                render_progress_bar(*index, *total, BAR_WIDTH),
                index + 1,
                total,
                style(phase).bold(),
                issues,
                files
            ),
            EngineEvent::FixFailed { error } => format!(
                "  {} {}:{} {} {}",
                style("✗").red(),
                error.file,
                error.line,
                style(&error.rule_id).dim(),
                error.message
            ),
            EngineEvent::BatchValidated {
                passed: false,
                detail,
                index,
            } => format!(
                "  {} Batch {} failed validation{}",
                style("✗").red(),
                index + 1,
                detail
                    .as_deref()
                    .map(|d| format!(": {}", first_line(d)))
                    .unwrap_or_default()
            ),
            EngineEvent::BatchCommitted { index, fixed } => format!(
                "  {} Batch {} committed ({} fixed)",
                style("✓").green(),
                index + 1,
                fixed
            ),
            EngineEvent::RolledBack {
                index, failures, ..
            } => format!(
                "  {} Batch {} rolled back (failure {})",
                style("↺").yellow(),
                index + 1,
                failures
            ),
            EngineEvent::RunFinished {
                success,
                fixed,
                failed,
                rollbacks,
            } => {
                let mark = if *success {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                format!(
                    "{} Run finished: {} fixed, {} failed, {} rollback(s)",
                    mark, fixed, failed, rollbacks
                )
            }
            EngineEvent::AlertDispatched { alert, .. } => {
                format!("{} {}", style("!").yellow().bold(), alert)
            }
            EngineEvent::ActionExecuted { record } => format!(
                "{} Auto-response {}: {}",
                style("⚙").magenta(),
                record.action,
                record.detail
            ),
            EngineEvent::Message { level, message } => match level {
                MessageLevel::Debug => return None,
                MessageLevel::Info => format!("{} {}", style("ℹ").blue(), message),
                MessageLevel::Warning => format!("{} {}", style("⚠").yellow(), message),
                MessageLevel::Error => format!("{} {}", style("✗").red(), message),
            },
            _ => return None,
        };
        Some(line)
    }

    /// Print events until the bus closes
    pub fn spawn(self, mut rx: broadcast::Receiver<EngineEvent>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(line) = self.render(&event) {
                            eprintln!("{}", line);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        eprintln!("{} {} event(s) skipped", style("…").dim(), skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Render a simple progress bar
fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis() as u64;
    let secs = ms / 1000;
    if secs == 0 {
        format!("{}ms", ms)
    } else if secs < 60 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
