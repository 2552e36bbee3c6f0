//! Event rendering: progress bar for humans, JSON lines for machines.

use entryprep_core::{CompletionEvent, PipelineEvent, Severity};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Renders pipeline events as they arrive.
pub struct EventRenderer {
    progress: Option<ProgressBar>,
}

impl EventRenderer {
    /// JSON mode writes events to stdout; otherwise a progress bar on stderr.
    pub fn new(json_events: bool) -> Self {
        let progress = (!json_events).then(create_progress_bar);
        Self { progress }
    }

    pub fn handle(&mut self, event: &PipelineEvent) -> anyhow::Result<()> {
        let Some(pb) = &self.progress else {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        };

        match event {
            PipelineEvent::Progress(p) => {
                pb.set_position(u64::from(p.percent));
                match p.severity {
                    Severity::Success => pb.set_message(p.message.clone()),
                    Severity::Info => pb.println(format!("  {}", p.message)),
                    Severity::Failure => pb.println(format!("  ✗ {}", p.message)),
                }
            }
            PipelineEvent::Completed(done) => {
                if done.ok {
                    pb.set_position(100);
                }
                pb.set_message(done.summary.clone());
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a percent-based progress bar.
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    // Template is a constant; fall back to the default style if it ever fails to parse.
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after a run.
pub fn print_summary(done: &CompletionEvent, output_root: &Path) {
    let stats = &done.stats;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    let skipped = stats.total.saturating_sub(stats.processed());
    if skipped > 0 {
        eprintln!("    Not reached:  {:>8}", skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", stats.total);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("  ====================================");
    eprintln!("  {}", done.summary);
    eprintln!("  Output: {}", output_root.display());
}
