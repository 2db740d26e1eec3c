//! The aggregation engine: walk a parent collection, fan out one job per
//! item, and fold every job's partial result into a single accumulator.
//!
//! Only the task that drains a page's report channel touches the
//! accumulator. Jobs never share state with each other or with the merger.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::classify::classify;
use super::fan_out::FanOutExecutor;
use super::merge::Merge;
use super::progress::{AggregateProgress, ProgressCallback, emit};
use super::types::{AggregateError, AggregateOptions, AggregateResult, SkippedItem};
use super::walker::PageWalker;
use crate::api::{self, ApiClient, Page, PageRequest, short_error_message};

/// Runs aggregations against one API client.
///
/// Construct once per process and share by reference; the client is cloned
/// into every job.
///
/// ```ignore
/// use tally::aggregate::{AggregateOptions, Aggregator, FailurePolicy};
/// use tally::target::{CommitWindow, Target};
///
/// let aggregator = Aggregator::new(client, AggregateOptions::default().with_policy(FailurePolicy::SkipAndLog));
/// let result = aggregator.contributors(&Target::owner("acme"), window).await?;
/// println!("{} contributors", result.value.contributors.len());
/// ```
pub struct Aggregator<C> {
    client: C,
    options: AggregateOptions,
    executor: FanOutExecutor,
    progress: Option<Arc<ProgressCallback>>,
}

impl<C: ApiClient + Clone + 'static> Aggregator<C> {
    pub fn new(client: C, options: AggregateOptions) -> Self {
        let executor = FanOutExecutor::new(options.concurrency);
        Self {
            client,
            options,
            executor,
            progress: None,
        }
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Get a reference to the client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Get a reference to the options.
    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    pub(crate) fn on_progress(&self) -> Option<&ProgressCallback> {
        self.progress.as_deref()
    }

    /// Walk `collection` page by page. Each page's items are mapped through
    /// `plan` (items mapped to `None` are skipped) and the resulting jobs run
    /// concurrently before the next page is requested.
    ///
    /// Page failures always abort. Job failures abort or are skipped
    /// according to the configured [`FailurePolicy`](super::FailurePolicy).
    #[tracing::instrument(skip_all, fields(collection = %collection))]
    pub(crate) async fn walk_fan_out<P, I, R, Fetch, FetchFut, Plan, Job, JobFut>(
        &self,
        collection: &str,
        fetch_page: Fetch,
        mut plan: Plan,
        job: Job,
    ) -> Result<AggregateResult<R>, AggregateError>
    where
        Fetch: FnMut(PageRequest) -> FetchFut,
        FetchFut: Future<Output = api::Result<Page<P>>>,
        Plan: FnMut(P) -> Option<I>,
        I: Display + Send + 'static,
        R: Merge + Send + 'static,
        Job: Fn(I) -> JobFut + Send + Sync + 'static,
        JobFut: Future<Output = api::Result<R>> + Send + 'static,
    {
        let on_progress = self.on_progress();
        emit(
            on_progress,
            AggregateProgress::WalkStarted {
                collection: collection.to_string(),
                concurrency: self.executor.concurrency(),
            },
        );

        let job = Arc::new(job);
        let mut acc = AggregateResult::new(R::default());
        let mut launched = 0usize;
        let mut walker = PageWalker::new(self.options.page_size, fetch_page);

        while let Some(page) = walker.next_page().await {
            let page = page.map_err(|failure| AggregateError::Page {
                collection: collection.to_string(),
                page: failure.page,
                source: failure.source,
            })?;
            acc.pages += 1;

            emit(
                on_progress,
                AggregateProgress::PageFetched {
                    collection: collection.to_string(),
                    page: page.number,
                    count: page.items.len(),
                    total_so_far: walker.items_seen(),
                },
            );
            debug!(page = page.number, count = page.items.len(), "Fetched page");

            let items: Vec<I> = page.items.into_iter().filter_map(&mut plan).collect();
            launched += items.len();
            self.merge_jobs(items, &job, &mut acc, launched).await?;
        }

        if walker.ended_on_loop() {
            emit(
                on_progress,
                AggregateProgress::Warning {
                    message: format!("{collection}: pagination looped, walk ended early"),
                },
            );
        }

        self.finish(collection, &acc);
        Ok(acc)
    }

    /// Run a fixed set of jobs concurrently and merge their results.
    #[tracing::instrument(skip_all, fields(collection = %collection, jobs = items.len()))]
    pub(crate) async fn run_jobs<I, R, Job, JobFut>(
        &self,
        collection: &str,
        items: Vec<I>,
        job: Job,
    ) -> Result<AggregateResult<R>, AggregateError>
    where
        I: Display + Send + 'static,
        R: Merge + Send + 'static,
        Job: Fn(I) -> JobFut + Send + Sync + 'static,
        JobFut: Future<Output = api::Result<R>> + Send + 'static,
    {
        emit(
            self.on_progress(),
            AggregateProgress::WalkStarted {
                collection: collection.to_string(),
                concurrency: self.executor.concurrency(),
            },
        );

        let mut acc = AggregateResult::new(R::default());
        let launched = items.len();
        self.merge_jobs(items, &Arc::new(job), &mut acc, launched)
            .await?;

        self.finish(collection, &acc);
        Ok(acc)
    }

    /// Fan out one page of jobs and fold every report into `acc`.
    ///
    /// Returning early drops the page's job handle, which aborts whatever is
    /// still in flight.
    async fn merge_jobs<I, R, Job, JobFut>(
        &self,
        items: Vec<I>,
        job: &Arc<Job>,
        acc: &mut AggregateResult<R>,
        launched: usize,
    ) -> Result<(), AggregateError>
    where
        I: Display + Send + 'static,
        R: Merge + Send + 'static,
        Job: Fn(I) -> JobFut + Send + Sync + 'static,
        JobFut: Future<Output = api::Result<R>> + Send + 'static,
    {
        if items.is_empty() {
            return Ok(());
        }

        let on_progress = self.on_progress();
        let policy = self.options.policy;
        let mut jobs = self.executor.spawn_page(items, Arc::clone(job));

        while let Some(report) = jobs.next_report().await {
            match report.result {
                Ok(partial) => {
                    acc.value.merge(partial);
                    acc.jobs_merged += 1;
                    emit(
                        on_progress,
                        AggregateProgress::JobFinished {
                            label: report.label,
                            completed: acc.jobs_merged,
                            launched,
                        },
                    );
                }
                Err(source) => {
                    let class = classify(&source);
                    if policy.aborts_on(class) {
                        warn!(
                            job = %report.label,
                            class = %class,
                            "Aborting aggregation: {}",
                            short_error_message(&source)
                        );
                        return Err(AggregateError::Job {
                            label: report.label,
                            source,
                        });
                    }

                    let message = source.to_string();
                    warn!(job = %report.label, class = %class, "Skipping: {}", message);
                    emit(
                        on_progress,
                        AggregateProgress::JobSkipped {
                            label: report.label.clone(),
                            class,
                            error: short_error_message(&source),
                        },
                    );
                    acc.skipped.push(SkippedItem {
                        label: report.label,
                        class,
                        message,
                    });
                }
            }
        }

        Ok(())
    }

    fn finish<R>(&self, collection: &str, acc: &AggregateResult<R>) {
        info!(
            collection,
            pages = acc.pages,
            jobs = acc.jobs_merged,
            skipped = acc.skipped_count(),
            "Aggregation complete"
        );
        emit(
            self.on_progress(),
            AggregateProgress::WalkComplete {
                collection: collection.to_string(),
                pages: acc.pages,
                jobs: acc.jobs_merged,
                skipped: acc.skipped_count(),
            },
        );
    }
}
