//! Inclusive calendar-day window for a synchronization run.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when constructing a [`DateWindow`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    /// A date string did not parse as `YYYY-MM-DD`.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The window end precedes the window start.
    #[error("Window end {to} precedes start {from}")]
    Reversed { from: NaiveDate, to: NaiveDate },
}

/// Inclusive pair of calendar days bounding one synchronization run.
///
/// Dates carry no time component; the window is interpreted as the UTC
/// range `from 00:00:00Z` through `to 23:59:59Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateWindow {
    /// Create a window from two calendar days.
    ///
    /// # Errors
    ///
    /// Returns `WindowError::Reversed` if `to` precedes `from`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, WindowError> {
        if to < from {
            return Err(WindowError::Reversed { from, to });
        }
        Ok(Self { from, to })
    }

    /// Parse a window from two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns `WindowError::InvalidDate` for malformed input and
    /// `WindowError::Reversed` for an inverted range.
    pub fn parse(from: &str, to: &str) -> Result<Self, WindowError> {
        let from = NaiveDate::parse_from_str(from.trim(), "%Y-%m-%d")
            .map_err(|_| WindowError::InvalidDate(from.to_string()))?;
        let to = NaiveDate::parse_from_str(to.trim(), "%Y-%m-%d")
            .map_err(|_| WindowError::InvalidDate(to.to_string()))?;
        Self::new(from, to)
    }

    /// First instant of the window: `from` at `00:00:00Z`.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.from.and_time(NaiveTime::MIN))
    }

    /// Last instant of the window: `to` at `23:59:59Z`.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time");
        Utc.from_utc_datetime(&self.to.and_time(end_of_day))
    }

    /// Window start day.
    #[must_use]
    pub const fn from_date(&self) -> NaiveDate {
        self.from
    }

    /// Window end day.
    #[must_use]
    pub const fn to_date(&self) -> NaiveDate {
        self.to
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}
