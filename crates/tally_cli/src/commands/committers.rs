use std::fmt::Write;

use chrono::NaiveDate;
use tally::aggregate::CommitTally;
use tally::target::{CommitWindow, Target};

use crate::RunOptions;
use crate::commands::shared::{Session, plural};
use crate::config::Config;

/// Handle `tally committers`.
pub(crate) async fn handle_committers(
    target: Target,
    since: NaiveDate,
    until: NaiveDate,
    run: RunOptions,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let window = CommitWindow::days(since, until)?;
    let session = Session::new(config, &run)?;

    let outcome = session.aggregator.committer_counts(&target, window).await;
    let tally = session.finish(outcome)?;

    let title = format!("Committer stats for {} from {}", target, window);
    print!("{}", render(&title, &tally));
    Ok(())
}

/// Render a ranked committer list under `title`.
///
/// Shared with the hackfest listing, which prints the same shape.
pub(crate) fn render(title: &str, tally: &CommitTally) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out);
    let _ = writeln!(out, "Number of commits: {}", tally.commits.get());
    let _ = writeln!(out, "Number of committers: {}", tally.authors.len());

    if !tally.authors.is_empty() {
        let _ = writeln!(out);
        for (login, commits) in tally.authors.ranked() {
            let noun = plural(commits as usize, "commit", "commits");
            let _ = writeln!(out, "- {}: {} {}", login, commits, noun);
        }
    }
    out
}
