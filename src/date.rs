use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Calendar day in "YYYY-MM-DD" form, interpreted as UTC midnight when converted
/// to unix time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(Date);

impl Day {
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self> {
        let month = time::Month::try_from(month).map_err(|e| anyhow!("invalid month {month}: {e}"))?;
        let date = Date::from_calendar_date(year, month, day)
            .with_context(|| format!("invalid date {year:04}-{:02}-{day:02}", month as u8))?;
        Ok(Self(date))
    }

    /// Unix seconds at 00:00:00 UTC of this day.
    pub fn unix_start(self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.0.year(), self.0.month() as u8, self.0.day())
    }
}

impl FromStr for Day {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
            .with_context(|| format!("expected YYYY-MM-DD, got {s:?}"))?;
        Ok(Self(date))
    }
}

/// Render unix seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
/// Out-of-range timestamps render as the epoch.
pub fn human_utc(ts: i64) -> String {
    let dt = OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_default()
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
