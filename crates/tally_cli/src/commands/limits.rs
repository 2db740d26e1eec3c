use chrono::{DateTime, Utc};
use clap::ValueEnum;
use tally::api::{ApiClient, RateLimitInfo};

use crate::commands::shared::github_client;
use crate::config::Config;

/// Output format for rate limit display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// Display as JSON
    Json,
}

/// Handle `tally limits`.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let info = client.get_rate_limit().await?;
    let display = RateLimitDisplay::new(&info, Utc::now());

    match output {
        OutputFormat::Text => print!("{}", display.text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&display)?),
    }
    Ok(())
}

/// Rate limit information for display.
#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct RateLimitDisplay {
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    pub usage_percent: String,
    pub reset_at: String,
    pub reset_in: String,
}

impl RateLimitDisplay {
    pub(crate) fn new(info: &RateLimitInfo, now: DateTime<Utc>) -> Self {
        let used = info.limit.saturating_sub(info.remaining);
        let usage = match info.limit {
            0 => 0.0,
            limit => used as f64 * 100.0 / limit as f64,
        };
        let until_reset = info.reset_at - now;
        let reset_in = match until_reset.num_seconds() {
            secs if secs > 0 => format_duration(until_reset),
            _ => "now".to_string(),
        };

        Self {
            limit: info.limit,
            used,
            remaining: info.remaining,
            usage_percent: format!("{:.1}%", usage),
            reset_at: info.reset_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            reset_in,
        }
    }

    fn text(&self) -> String {
        format!(
            "Limit:     {}\nUsed:      {} ({})\nRemaining: {}\nResets at: {} (in {})\n",
            self.limit, self.used, self.usage_percent, self.remaining, self.reset_at, self.reset_in
        )
    }
}

/// Compact countdown such as `42s`, `2m 5s` or `1h 5m`.
fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn output_format_default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn format_duration_picks_two_largest_units() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(120)), "2m");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(chrono::Duration::seconds(3900)), "1h 5m");
    }

    #[test]
    fn display_derives_usage_and_reset() {
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let info = RateLimitInfo {
            limit: 5000,
            remaining: 4000,
            reset_at: now + chrono::Duration::seconds(125),
        };

        let display = RateLimitDisplay::new(&info, now);
        assert_eq!(display.used, 1000);
        assert_eq!(display.usage_percent, "20.0%");
        assert_eq!(display.reset_at, "2024-10-01 12:02:05 UTC");
        assert_eq!(display.reset_in, "2m 5s");

        let json = serde_json::to_value(&display).unwrap();
        assert_eq!(json["remaining"], 4000);
    }

    #[test]
    fn display_past_reset_is_now() {
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let info = RateLimitInfo {
            limit: 0,
            remaining: 0,
            reset_at: now - chrono::Duration::seconds(5),
        };

        let display = RateLimitDisplay::new(&info, now);
        assert_eq!(display.reset_in, "now");
        assert_eq!(display.usage_percent, "0.0%");
    }
}
