use chrono::{DateTime, Utc};
use tally::aggregate::Hackfest;
use tally::target::DAY_FORMAT;

use crate::HackfestAction;
use crate::commands::committers;
use crate::commands::shared::Session;
use crate::config::Config;

/// Handle `tally hackfest`.
pub(crate) async fn handle_hackfest(
    action: HackfestAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let hackfest = config.hackfest.hackfest()?;

    match action {
        HackfestAction::Info => {
            println!("{}", info(&hackfest, Utc::now()));
        }
        HackfestAction::List { run } => {
            let window = hackfest.window()?;
            let excluded_users = config.hackfest.excluded_users();
            let session = Session::new(config, &run)?;

            let outcome = session
                .aggregator
                .hackfest_contributors(
                    &hackfest.target,
                    window,
                    &excluded_users,
                    &config.hackfest.exclude_teams,
                )
                .await;
            let tally = session.finish(outcome)?;

            let title = format!("Hackfest contributors for {} from {}", hackfest.target, window);
            print!("{}", committers::render(&title, &tally));
        }
    }

    Ok(())
}

/// One-line status of the hackfest at `now`.
pub(crate) fn info(hackfest: &Hackfest, now: DateTime<Utc>) -> String {
    if hackfest.is_running_at(now) {
        format!(
            "There is a hackfest running from {} to {}",
            hackfest.start.format(DAY_FORMAT),
            hackfest.end.format(DAY_FORMAT)
        )
    } else {
        "No hackfest is running".to_string()
    }
}
