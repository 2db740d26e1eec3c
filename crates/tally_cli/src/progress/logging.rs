use tally::aggregate::AggregateProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: AggregateProgress) {
        match event {
            AggregateProgress::WalkStarted {
                collection,
                concurrency,
            } => {
                tracing::info!(collection = %collection, concurrency, "Walking collection");
            }

            AggregateProgress::PageFetched {
                collection,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(collection = %collection, page, count, total_so_far, "Fetched page");
            }

            AggregateProgress::JobFinished {
                label,
                completed,
                launched,
            } => {
                tracing::debug!(job = %label, completed, launched, "Job finished");
            }

            AggregateProgress::JobSkipped {
                label,
                class,
                error,
            } => {
                tracing::warn!(job = %label, class = %class, error = %error, "Skipped");
            }

            AggregateProgress::WalkComplete {
                collection,
                pages,
                jobs,
                skipped,
            } => {
                tracing::info!(collection = %collection, pages, jobs, skipped, "Walk complete");
            }

            AggregateProgress::ResolvingFirstCommits { candidates } => {
                tracing::info!(candidates, "Resolving first commits");
            }

            AggregateProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
