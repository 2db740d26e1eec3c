use std::fmt::Write;

use chrono::NaiveDate;
use tally::aggregate::ContributorSummary;
use tally::target::{CommitWindow, Target};

use crate::RunOptions;
use crate::commands::shared::Session;
use crate::config::Config;

/// Handle `tally contributors`.
pub(crate) async fn handle_contributors(
    target: Target,
    since: NaiveDate,
    until: NaiveDate,
    run: RunOptions,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let window = CommitWindow::days(since, until)?;
    let session = Session::new(config, &run)?;

    let outcome = session.aggregator.contributors(&target, window).await;
    let summary = session.finish(outcome)?;

    print!("{}", render(&target, &window, &summary));
    Ok(())
}

pub(crate) fn render(
    target: &Target,
    window: &CommitWindow,
    summary: &ContributorSummary,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Contributor stats for {} from {}", target, window);
    let _ = writeln!(out);
    let _ = writeln!(out, "Number of commits: {}", summary.commits.get());
    let _ = writeln!(out, "Number of contributors: {}", summary.contributors.len());

    if !summary.contributors.is_empty() {
        let logins: Vec<&str> = summary.contributors.iter().collect();
        let _ = writeln!(out, "Contributors: {}", logins.join(", "));
    }
    out
}
