//! Tally CLI - contribution statistics for GitHub organizations.

mod commands;
mod config;
mod progress;

use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use console::Term;
use tally::target::{CommitWindow, Target, parse_day, parse_month};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "tally")]
#[command(version)]
#[command(about = "Contribution statistics for GitHub organizations")]
#[command(
    long_about = "Tally walks every repository of a GitHub organization (or user) \
concurrently and reports who contributed: unique contributors, per-committer \
commit counts, changelog credits, newcomers and hackfest participants."
)]
#[command(after_long_help = r#"EXAMPLES
    Contributors to an organization in October:
        $ tally contributors rust-lang 2024-10-01 2024-10-31

    Commit counts for a single repository, skipping failures:
        $ tally committers rust-lang/cargo 2024-10-01 2024-10-31 --skip-failed

    Everyone whose first commit landed on or after a day:
        $ tally new-contributors rust-lang 2024-10-01

    Credits for a monthly changelog:
        $ tally changelog rust-lang/cargo 2024-10

CONFIGURATION
    Tally reads configuration from:
      1. ~/.config/tally/config.toml (or $XDG_CONFIG_HOME/tally/config.toml)
      2. ./tally.toml
      3. Environment variables (TALLY_ prefix, e.g., TALLY_GITHUB__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    TALLY_GITHUB__TOKEN            GitHub personal access token (GITHUB_TOKEN also works)
    TALLY_GITHUB__API_URL          API base URL for GitHub Enterprise
    TALLY_AGGREGATE__CONCURRENCY   Maximum concurrent jobs (default: 20)
    TALLY_AGGREGATE__POLICY        fail_fast (default) or skip_and_log
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that aggregates.
#[derive(Debug, Clone, Default, clap::Args)]
struct RunOptions {
    /// Skip repositories that fail instead of aborting (rate limits still abort)
    #[arg(short = 's', long)]
    skip_failed: bool,

    /// Maximum concurrent jobs (default from config or 20)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Disable proactive rate limiting (may cause API throttling)
    #[arg(short = 'R', long)]
    no_rate_limit: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List everyone who committed between two days
    Contributors {
        /// Organization or user, optionally with a repository (owner/repo)
        target: Target,
        /// First day (YYYY-MM-DD)
        #[arg(value_parser = parse_day)]
        since: NaiveDate,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(value_parser = parse_day)]
        until: NaiveDate,

        #[command(flatten)]
        run: RunOptions,
    },
    /// Commit counts per committer between two days
    Committers {
        /// Organization or user, optionally with a repository (owner/repo)
        target: Target,
        /// First day (YYYY-MM-DD)
        #[arg(value_parser = parse_day)]
        since: NaiveDate,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(value_parser = parse_day)]
        until: NaiveDate,

        #[command(flatten)]
        run: RunOptions,
    },
    /// Authors whose first commit to an organization landed on or after a day
    NewContributors {
        /// Organization or user
        org: String,
        /// Cutoff day (YYYY-MM-DD)
        #[arg(value_parser = parse_day)]
        since: NaiveDate,

        #[command(flatten)]
        run: RunOptions,
    },
    /// Committers of one month, for changelog credits
    Changelog {
        /// Organization or user, optionally with a repository (owner/repo)
        target: Target,
        /// Month (YYYY-MM)
        #[arg(value_parser = parse_month)]
        month: CommitWindow,

        #[command(flatten)]
        run: RunOptions,
    },
    /// Hackfest information and statistics
    Hackfest {
        #[command(subcommand)]
        action: HackfestAction,
    },
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum HackfestAction {
    /// Show whether the configured hackfest is running
    Info,
    /// Commit counts of hackfest participants
    List {
        #[command(flatten)]
        run: RunOptions,
    },
}

async fn dispatch(
    command: Commands,
    config: &config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Contributors {
            target,
            since,
            until,
            run,
        } => commands::contributors::handle_contributors(target, since, until, run, config).await,
        Commands::Committers {
            target,
            since,
            until,
            run,
        } => commands::committers::handle_committers(target, since, until, run, config).await,
        Commands::NewContributors { org, since, run } => {
            commands::new_contributors::handle_new_contributors(&org, since, run, config).await
        }
        Commands::Changelog { target, month, run } => {
            commands::changelog::handle_changelog(target, month, run, config).await
        }
        Commands::Hackfest { action } => commands::hackfest::handle_hackfest(action, config).await,
        Commands::Limits { output } => commands::limits::handle_limits(output, config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal; progress bars
    // take over otherwise.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("tally=info,tally_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();
    let cli = Cli::parse();

    let outcome = tokio::select! {
        outcome = dispatch(cli.command, &config) => outcome,
        _ = tokio::signal::ctrl_c() => Err("Interrupted".into()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
