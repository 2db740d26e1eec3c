//! Progress output for long aggregations.
//!
//! On a terminal every walk gets an indicatif bar. Anywhere else (CI logs,
//! pipes) the same events become tracing lines.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use tally::aggregate::{AggregateProgress, ProgressCallback};

pub use interactive::InteractiveReporter;
pub use logging::LoggingReporter;

pub enum ProgressReporter {
    Interactive(InteractiveReporter),
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Bars when stdout is a terminal, log lines otherwise.
    pub fn new() -> Self {
        match Term::stdout().is_term() {
            true => Self::Interactive(InteractiveReporter::new()),
            false => Self::Logging(LoggingReporter::new()),
        }
    }

    pub fn handle(&self, event: AggregateProgress) {
        match self {
            Self::Interactive(bars) => bars.handle(event),
            Self::Logging(log) => log.handle(event),
        }
    }

    /// Callback to hand to [`tally::Aggregator::with_progress`].
    pub fn as_callback(self: &Arc<Self>) -> Arc<ProgressCallback> {
        let reporter = Arc::clone(self);
        Arc::new(Box::new(move |event| reporter.handle(event)))
    }

    /// Take the bars off the screen so the report starts on a clean line.
    pub fn finish(&self) {
        match self {
            Self::Interactive(bars) => bars.finish(),
            Self::Logging(_) => {}
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
