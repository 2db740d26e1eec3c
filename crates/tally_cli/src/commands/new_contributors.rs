use std::fmt::Write;

use chrono::NaiveDate;
use tally::aggregate::FirstContribution;
use tally::target::{DAY_FORMAT, start_of_day};

use crate::RunOptions;
use crate::commands::shared::Session;
use crate::config::Config;

/// Handle `tally new-contributors`.
pub(crate) async fn handle_new_contributors(
    org: &str,
    since: NaiveDate,
    run: RunOptions,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config, &run)?;

    let outcome = session
        .aggregator
        .new_contributors(org, start_of_day(since))
        .await;
    let newcomers = session.finish(outcome)?;

    print!("{}", render(since, &newcomers));
    Ok(())
}

pub(crate) fn render(since: NaiveDate, newcomers: &[FirstContribution]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "New committers since {}", since.format(DAY_FORMAT));
    let _ = writeln!(out);
    let _ = writeln!(out, "Number of new committers: {}", newcomers.len());

    if !newcomers.is_empty() {
        let _ = writeln!(out);
        for first in newcomers {
            let _ = writeln!(
                out,
                "- {}: first commit at {} on {}/{} ({})",
                first.author,
                first.date.format(DAY_FORMAT),
                first.org,
                first.repo,
                first.commit_url
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_render_lists_first_commits_in_given_order() {
        let newcomers = vec![
            FirstContribution {
                author: "erin".into(),
                date: Utc.with_ymd_and_hms(2024, 10, 2, 9, 0, 0).unwrap(),
                commit_url: "https://github.com/acme/x/commit/e1".into(),
                org: "acme".into(),
                repo: "x".into(),
            },
            FirstContribution {
                author: "alice".into(),
                date: Utc.with_ymd_and_hms(2024, 10, 9, 9, 0, 0).unwrap(),
                commit_url: "https://github.com/acme/y/commit/a1".into(),
                org: "acme".into(),
                repo: "y".into(),
            },
        ];

        let since = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let text = render(since, &newcomers);

        assert!(text.starts_with("New committers since 2024-10-01\n"));
        assert!(text.contains("Number of new committers: 2\n"));
        let lines: Vec<&str> = text.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(
            lines,
            vec![
                "- erin: first commit at 2024-10-02 on acme/x (https://github.com/acme/x/commit/e1)",
                "- alice: first commit at 2024-10-09 on acme/y (https://github.com/acme/y/commit/a1)",
            ]
        );
    }

    #[test]
    fn test_render_no_newcomers() {
        let since = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        assert!(render(since, &[]).ends_with("Number of new committers: 0\n"));
    }
}
