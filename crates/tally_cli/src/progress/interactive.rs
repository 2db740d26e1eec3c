use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tally::aggregate::AggregateProgress;

/// Bar for the walk currently in progress.
struct WalkBar {
    bar: ProgressBar,
    /// Switched from spinner to bar once the first job reports.
    counting: bool,
}

/// Interactive progress reporter using indicatif.
///
/// Walks run one after another, so a single bar tracks the current walk and
/// finished walks stay on screen above it.
pub struct InteractiveReporter {
    multi: MultiProgress,
    current: Mutex<Option<WalkBar>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current: Mutex::new(None),
        }
    }

    pub fn handle(&self, event: AggregateProgress) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            AggregateProgress::WalkStarted { collection, .. } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{:24}", collection));
                bar.set_message("Starting...");
                bar.enable_steady_tick(Duration::from_millis(100));
                *current = Some(WalkBar {
                    bar,
                    counting: false,
                });
            }

            AggregateProgress::PageFetched {
                page, total_so_far, ..
            } => {
                if let Some(walk) = current.as_ref() {
                    walk.bar
                        .set_message(format!("Page {} ({} items)", page, total_so_far));
                }
            }

            AggregateProgress::JobFinished {
                completed,
                launched,
                ..
            } => {
                if let Some(walk) = current.as_mut() {
                    if !walk.counting {
                        walk.bar.set_style(Self::bar_style());
                        walk.bar.disable_steady_tick();
                        walk.counting = true;
                    }
                    walk.bar.set_length(launched as u64);
                    walk.bar.set_position(completed as u64);
                    walk.bar.set_message("");
                }
            }

            AggregateProgress::JobSkipped { label, error, .. } => {
                let _ = self.multi.println(format!("⚠ skipped {}: {}", label, error));
            }

            AggregateProgress::WalkComplete { jobs, skipped, .. } => {
                if let Some(walk) = current.take() {
                    let message = if skipped > 0 {
                        format!("✓ {} done, {} skipped", jobs, skipped)
                    } else {
                        format!("✓ {} done", jobs)
                    };
                    walk.bar.finish_with_message(message);
                }
            }

            AggregateProgress::ResolvingFirstCommits { candidates } => {
                let _ = self
                    .multi
                    .println(format!("Looking up first commits of {} candidates", candidates));
            }

            AggregateProgress::Warning { message } => {
                let _ = self.multi.println(format!("⚠ {}", message));
            }

            _ => {}
        }
    }

    /// Clear all bars so results print on a clean screen.
    pub fn finish(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(walk) = current.take() {
            walk.bar.abandon();
        }
        let _ = self.multi.clear();
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .expect("Invalid template")
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
