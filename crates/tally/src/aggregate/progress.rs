//! Progress reporting types for aggregation runs.
//!
//! Events are emitted only by the task that merges results, never from
//! inside concurrent jobs, so callbacks observe a sequential stream.

use super::classify::ErrorClass;

/// Progress events emitted during an aggregation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AggregateProgress {
    /// Starting to walk a paginated parent collection.
    WalkStarted {
        /// Human readable collection name (e.g. "acme repositories").
        collection: String,
        /// Concurrency cap in effect for the fan-out.
        concurrency: usize,
    },

    /// Fetched one page of the parent collection.
    PageFetched {
        collection: String,
        /// Page number (1-indexed).
        page: u32,
        /// Items on this page.
        count: usize,
        /// Running total of items across pages.
        total_so_far: usize,
    },

    /// A job finished and its partial result was merged.
    JobFinished {
        label: String,
        /// Jobs merged so far in this walk.
        completed: usize,
        /// Jobs launched so far in this walk.
        launched: usize,
    },

    /// A job failed and was skipped.
    JobSkipped {
        label: String,
        class: ErrorClass,
        error: String,
    },

    /// The walk finished.
    WalkComplete {
        collection: String,
        pages: u32,
        jobs: usize,
        skipped: usize,
    },

    /// Resolving first commits for candidate authors.
    ResolvingFirstCommits {
        /// Candidates that survived the week pre-filter.
        candidates: usize,
    },

    /// Non-fatal condition worth surfacing.
    Warning { message: String },
}

/// Callback for progress updates during aggregation.
pub type ProgressCallback = Box<dyn Fn(AggregateProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: AggregateProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
