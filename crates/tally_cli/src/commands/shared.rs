use std::sync::Arc;

use tally::aggregate::AggregateResult;
use tally::api::RateLimitedClient;
use tally::github::GitHubClient;
use tally::{AggregateError, AggregateOptions, Aggregator, FailurePolicy};

use crate::RunOptions;
use crate::config::Config;
use crate::progress::ProgressReporter;

/// The client every aggregating command talks through.
pub(crate) type Client = RateLimitedClient<GitHubClient>;

const NO_TOKEN: &str = "No GitHub token configured. Set GITHUB_TOKEN or TALLY_GITHUB__TOKEN, \
or add `token` under [github] in the config file.";

/// Build an unpaced GitHub client from the configured token and API URL.
pub(crate) fn github_client(config: &Config) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = config.github_token().ok_or(NO_TOKEN)?;
    let client = match config.github.api_url.as_deref() {
        Some(api_url) => GitHubClient::with_api_url(&token, api_url)?,
        None => GitHubClient::new(&token)?,
    };
    Ok(client)
}

/// Merge configured defaults with the flags of one run.
pub(crate) fn aggregate_options(config: &Config, run: &RunOptions) -> AggregateOptions {
    let policy = if run.skip_failed {
        FailurePolicy::SkipAndLog
    } else {
        config.aggregate.policy
    };

    AggregateOptions::default()
        .with_page_size(config.aggregate.page_size)
        .with_concurrency(run.concurrency.unwrap_or(config.aggregate.concurrency))
        .with_policy(policy)
}

/// An aggregator wired to the progress reporter for one command.
pub(crate) struct Session {
    pub(crate) aggregator: Aggregator<Client>,
    reporter: Arc<ProgressReporter>,
}

impl Session {
    pub(crate) fn new(
        config: &Config,
        run: &RunOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let github = github_client(config)?;
        let client = if run.no_rate_limit || config.aggregate.no_rate_limit {
            tracing::debug!("Proactive rate limiting disabled");
            RateLimitedClient::unlimited(github)
        } else {
            RateLimitedClient::new(github, config.aggregate.requests_per_second)
        };

        let options = aggregate_options(config, run);
        tracing::debug!(
            page_size = options.page_size,
            concurrency = options.concurrency,
            policy = %options.policy,
            "Aggregation options"
        );

        let reporter = Arc::new(ProgressReporter::new());
        let aggregator = Aggregator::new(client, options).with_progress(reporter.as_callback());
        Ok(Self {
            aggregator,
            reporter,
        })
    }

    /// Clear progress output and turn the outcome into something printable.
    ///
    /// Skipped items go to stderr so stdout stays clean for the report.
    pub(crate) fn finish<T>(
        &self,
        outcome: Result<AggregateResult<T>, AggregateError>,
    ) -> Result<T, Box<dyn std::error::Error>> {
        self.reporter.finish();

        match outcome {
            Ok(result) => {
                if result.is_partial() {
                    eprintln!(
                        "Skipped {} {}:",
                        result.skipped_count(),
                        plural(result.skipped_count(), "repository", "repositories")
                    );
                    for item in &result.skipped {
                        eprintln!("  {} ({}): {}", item.label, item.class, item.message);
                    }
                }
                Ok(result.value)
            }
            Err(e) => {
                tracing::error!(error = %e, class = %e.class(), "Aggregation failed");
                Err(e.user_message().into())
            }
        }
    }
}

/// Pick the singular or plural noun for `count`.
pub(crate) fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
