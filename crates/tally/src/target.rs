//! Aggregation targets and time windows.
//!
//! A target is either a whole owner (`rust-lang`) or a single repository
//! (`rust-lang/cargo`). Windows are inclusive on both ends; a day-granular
//! window ends one microsecond before the midnight following its last day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Date format used for day arguments (`2024-03-17`).
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Errors from parsing targets and dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetParseError {
    #[error("invalid target '{0}': expected 'owner' or 'owner/repo'")]
    InvalidTarget(String),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDay(String),

    #[error("invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    #[error("window ends before it starts ({since} > {until})")]
    InvertedWindow { since: NaiveDate, until: NaiveDate },
}

/// An owner, optionally narrowed to one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub owner: String,
    pub repo: Option<String>,
}

impl Target {
    /// Target every repository of an owner.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: None,
        }
    }

    /// Target a single repository.
    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: Some(repo.into()),
        }
    }

    /// Parse `owner` or `owner/repo`.
    ///
    /// A trailing slash (`owner/`) is accepted and means the whole owner.
    /// Empty owners and more than one slash are rejected.
    pub fn parse(input: &str) -> Result<Self, TargetParseError> {
        let mut parts = input.split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next();

        if owner.is_empty() || parts.next().is_some() {
            return Err(TargetParseError::InvalidTarget(input.to_string()));
        }

        Ok(match repo {
            Some(repo) if !repo.is_empty() => Self::repository(owner, repo),
            _ => Self::owner(owner),
        })
    }

    /// Returns true if this target names a single repository.
    #[inline]
    pub fn is_repository(&self) -> bool {
        self.repo.is_some()
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repo {
            Some(repo) => write!(f, "{}/{}", self.owner, repo),
            None => f.write_str(&self.owner),
        }
    }
}

/// An inclusive time window for commit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl CommitWindow {
    /// Window from the start of `first` to the end of `last`.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self, TargetParseError> {
        if last < first {
            return Err(TargetParseError::InvertedWindow {
                since: first,
                until: last,
            });
        }
        Ok(Self {
            since: start_of_day(first),
            until: end_of_day(last),
        })
    }

    /// Window covering a whole calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self, TargetParseError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| TargetParseError::InvalidMonth(format!("{year:04}-{month:02}")))?;
        let next = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| TargetParseError::InvalidMonth(format!("{year:04}-{month:02}")))?;
        Ok(Self {
            since: start_of_day(first),
            until: start_of_day(next) - Duration::microseconds(1),
        })
    }

    /// The seven-day window starting at `week_start`.
    pub fn week(week_start: DateTime<Utc>) -> Self {
        Self {
            since: week_start,
            until: week_start + Duration::days(7) - Duration::microseconds(1),
        }
    }

    /// Returns true if `instant` falls inside the window.
    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.since <= instant && instant <= self.until
    }
}

impl fmt::Display for CommitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.since.format(DAY_FORMAT),
            self.until.format(DAY_FORMAT)
        )
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_day(input: &str) -> Result<NaiveDate, TargetParseError> {
    NaiveDate::parse_from_str(input.trim(), DAY_FORMAT)
        .map_err(|_| TargetParseError::InvalidDay(input.to_string()))
}

/// Parse a `YYYY-MM` month into the window covering it.
pub fn parse_month(input: &str) -> Result<CommitWindow, TargetParseError> {
    let invalid = || TargetParseError::InvalidMonth(input.to_string());
    let (year, month) = input.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    CommitWindow::month(year, month).map_err(|_| invalid())
}

/// Midnight UTC at the start of `day`.
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

/// One microsecond before the midnight following `day`.
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let next = day.checked_add_days(Days::new(1)).unwrap_or(day);
    start_of_day(next) - Duration::microseconds(1)
}

/// Midnight UTC on the Sunday starting the week that contains `instant`.
///
/// Weekly statistics are stamped this way, so a week stamped with this value
/// or later may contain activity at or after `instant`.
pub fn week_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    let day = instant.date_naive();
    let back = Days::new(u64::from(day.weekday().num_days_from_sunday()));
    start_of_day(day.checked_sub_days(back).unwrap_or(day))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn test_parse_owner_only() {
        assert_eq!(Target::parse("abc").unwrap(), Target::owner("abc"));
        assert_eq!(Target::parse("abc/").unwrap(), Target::owner("abc"));
    }

    #[test]
    fn test_parse_owner_and_repo() {
        let target = Target::parse("abc/def").unwrap();
        assert_eq!(target, Target::repository("abc", "def"));
        assert!(target.is_repository());
        assert_eq!(target.to_string(), "abc/def");
    }

    #[test]
    fn test_parse_rejects_malformed_targets() {
        for input in ["", "/", "/abc", "abc/def/ghi"] {
            assert!(Target::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_days_window_is_inclusive() {
        let window = CommitWindow::days(day("2024-03-01"), day("2024-03-02")).unwrap();
        assert_eq!(window.since.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(window.contains(start_of_day(day("2024-03-02")) + Duration::hours(23)));
        assert!(!window.contains(start_of_day(day("2024-03-03"))));
    }

    #[test]
    fn test_days_window_rejects_inverted_range() {
        assert!(matches!(
            CommitWindow::days(day("2024-03-02"), day("2024-03-01")),
            Err(TargetParseError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn test_month_window_handles_year_end() {
        let window = parse_month("2023-12").unwrap();
        assert_eq!(window.since, start_of_day(day("2023-12-01")));
        assert_eq!(
            window.until,
            start_of_day(day("2024-01-01")) - Duration::microseconds(1)
        );
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        for input in ["2023", "2023-13", "23-01", "2023-1", "abcd-ef"] {
            assert!(parse_month(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_week_start_is_sunday() {
        // 2024-03-13 is a Wednesday.
        let wednesday = start_of_day(day("2024-03-13"));
        assert_eq!(week_start(wednesday), start_of_day(day("2024-03-10")));

        let sunday = start_of_day(day("2024-03-10"));
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn test_week_start_drops_time_of_day() {
        let tuesday_afternoon = start_of_day(day("2024-03-12")) + Duration::hours(15);
        assert_eq!(week_start(tuesday_afternoon), start_of_day(day("2024-03-10")));

        let sunday_evening = start_of_day(day("2024-03-10")) + Duration::hours(23);
        assert_eq!(week_start(sunday_evening), start_of_day(day("2024-03-10")));
    }

    #[test]
    fn test_week_window() {
        let window = CommitWindow::week(start_of_day(day("2024-03-10")));
        assert!(window.contains(start_of_day(day("2024-03-16")) + Duration::hours(12)));
        assert!(!window.contains(start_of_day(day("2024-03-17"))));
    }
}
