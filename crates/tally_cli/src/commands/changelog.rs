use std::fmt::Write;

use tally::aggregate::LoginSet;
use tally::target::{CommitWindow, Target};

use crate::RunOptions;
use crate::commands::shared::Session;
use crate::config::Config;

/// Handle `tally changelog`.
pub(crate) async fn handle_changelog(
    target: Target,
    month: CommitWindow,
    run: RunOptions,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config, &run)?;

    let outcome = session.aggregator.changelog(&target, month).await;
    let committers = session.finish(outcome)?;

    print!("{}", render(&month, &committers));
    Ok(())
}

pub(crate) fn render(month: &CommitWindow, committers: &LoginSet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Committer list for {} changelog",
        month.since.format("%B %Y")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Number of committers: {}", committers.len());

    if !committers.is_empty() {
        let _ = writeln!(out, "{}", committers.sorted_case_insensitive().join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sorts_case_insensitively() {
        let committers: LoginSet = ["bob", "Alice", "carol", "alice"].into_iter().collect();
        let month = CommitWindow::month(2024, 2).unwrap();

        let text = render(&month, &committers);

        assert!(text.starts_with("Committer list for February 2024 changelog\n"));
        assert!(text.contains("Number of committers: 4\n"));
        assert!(text.contains("Alice, alice, bob, carol\n"));
    }

    #[test]
    fn test_render_empty_month() {
        let month = CommitWindow::month(2024, 12).unwrap();
        let text = render(&month, &LoginSet::new());
        assert!(text.contains("December 2024"));
        assert!(text.ends_with("Number of committers: 0\n"));
    }
}
