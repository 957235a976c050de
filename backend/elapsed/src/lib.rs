//! # Elapsed
//!
//! Human readable difference between two instants.
//!
//! ## Rules
//!
//! - Order of the two instants does not matter, only the absolute gap
//! - Gap is measured in whole milliseconds, then split into hours and minutes
//! - Seconds and milliseconds left over are dropped, never rounded up
//! - Message wording is fixed, "1 hours" stays "1 hours"
//!
//! ```
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2026, 1, 1, 2, 15, 30).unwrap();
//!
//! assert_eq!(
//!     elapsed::format_message(&start, &end),
//!     "The difference is 2 hours and 15 minutes."
//! );
//! ```
use std::fmt::{self, Display};

use chrono::{DateTime, ParseError, TimeZone, Utc};
use serde::Serialize;

pub const MS_PER_MINUTE: u64 = 60 * 1000;
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Elapsed {
    pub hours: u64,
    pub minutes: u64,
}

impl Elapsed {
    pub fn from_millis(millis: u64) -> Self {
        Self {
            hours: millis / MS_PER_HOUR,
            minutes: (millis % MS_PER_HOUR) / MS_PER_MINUTE,
        }
    }
}

impl Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The difference is {} hours and {} minutes.",
            self.hours, self.minutes
        )
    }
}

/// Absolute gap between `a` and `b`, split into whole hours and minutes.
pub fn compute_difference<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> Elapsed {
    // num_milliseconds truncates toward zero, so the sign never affects the floor
    let delta = b.clone() - a.clone();

    Elapsed::from_millis(delta.num_milliseconds().unsigned_abs())
}

pub fn format_message<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> String {
    compute_difference(a, b).to_string()
}

/// Reads an RFC 3339 timestamp, surrounding whitespace allowed, normalized to UTC.
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, ParseError> {
    DateTime::parse_from_rfc3339(input.trim()).map(|instant| instant.with_timezone(&Utc))
}
