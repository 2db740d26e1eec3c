//! Concurrent per-item fetch jobs for one page of parent items.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;

use crate::api::{self, ApiError};

/// Outcome of one job. Exactly one is produced per submitted item.
#[derive(Debug)]
pub struct JobReport<R> {
    /// Position of the item in the submitted page.
    pub index: usize,
    /// Display label of the item (e.g. `acme/widget`).
    pub label: String,
    pub result: api::Result<R>,
}

/// Runs one job per item, at most `concurrency` at a time across every
/// page submitted through the same executor.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
}

impl FanOutExecutor {
    /// Create an executor. A zero cap is treated as one.
    pub fn new(concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Maximum number of concurrently running jobs.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawn one task per item and return a handle that yields their reports
    /// in completion order.
    ///
    /// The report channel holds one slot per item, so no task ever waits on
    /// the consumer.
    pub fn spawn_page<I, R, F, Fut>(&self, items: Vec<I>, job: Arc<F>) -> PageJobs<R>
    where
        I: Display + Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = api::Result<R>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        let mut handles = Vec::with_capacity(items.len());
        let mut labels = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let label = item.to_string();
            labels.push(Some(label.clone()));

            let tx = tx.clone();
            let job = Arc::clone(&job);
            let semaphore = Arc::clone(&self.semaphore);

            handles.push(tokio::spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => job(item).await,
                    Err(_) => Err(ApiError::internal("Semaphore closed unexpectedly")),
                };
                // The receiver only goes away when the consumer has stopped
                // listening, in which case the report is moot.
                let _ = tx
                    .send(JobReport {
                        index,
                        label,
                        result,
                    })
                    .await;
            }));
        }

        PageJobs {
            rx,
            handles,
            labels,
        }
    }

    /// Run every item to completion and collect all reports, unordered.
    pub async fn run_all<I, R, F, Fut>(&self, items: Vec<I>, job: F) -> Vec<JobReport<R>>
    where
        I: Display + Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = api::Result<R>> + Send + 'static,
    {
        let mut jobs = self.spawn_page(items, Arc::new(job));
        let mut reports = Vec::with_capacity(jobs.len());
        while let Some(report) = jobs.next_report().await {
            reports.push(report);
        }
        reports
    }
}

/// The in-flight jobs of one page.
///
/// Dropping this aborts every job that has not finished yet.
pub struct PageJobs<R> {
    rx: mpsc::Receiver<JobReport<R>>,
    handles: Vec<JoinHandle<()>>,
    labels: Vec<Option<String>>,
}

impl<R> PageJobs<R> {
    /// Number of jobs in this page.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for the next report, or `None` once every job has reported.
    ///
    /// A job that died without reporting (panic or abort) is reported as an
    /// internal error, so the caller still sees exactly one report per item.
    pub async fn next_report(&mut self) -> Option<JobReport<R>> {
        if let Some(report) = self.rx.recv().await {
            if let Some(slot) = self.labels.get_mut(report.index) {
                slot.take();
            }
            return Some(report);
        }

        let (index, label) = self
            .labels
            .iter_mut()
            .enumerate()
            .find_map(|(i, slot)| slot.take().map(|label| (i, label)))?;

        tracing::warn!(job = %label, "Job ended without reporting a result");
        Some(JobReport {
            index,
            result: Err(ApiError::internal(format!(
                "job for {} ended without a result",
                label
            ))),
            label,
        })
    }
}

impl<R> Drop for PageJobs<R> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
