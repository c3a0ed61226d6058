use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Minutes in the single local day being planned.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// A wall-clock time within the single local day being planned.
///
/// Stored as minutes since midnight and exchanged as a 24-hour `HH:MM`
/// string. [`FromStr`] only accepts `00:00..=23:59`. Values produced by
/// arithmetic (a trailing gap that runs past midnight) may exceed that and
/// render as e.g. `24:05`; deserialization accepts those back so computed
/// slots survive the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u32);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from hours and minutes. Returns `None` outside `00:00..=23:59`.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    pub(crate) const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    /// Saturates instead of overflowing.
    pub fn plus_minutes(self, minutes: u32) -> Self {
        Self(self.0.saturating_add(minutes))
    }

    pub fn checked_add(self, minutes: u32) -> Option<Self> {
        self.0.checked_add(minutes).map(Self)
    }

    /// Whether this is a time of day (`00:00..=23:59`) rather than a computed
    /// value past midnight.
    pub fn is_time_of_day(&self) -> bool {
        self.0 < MINUTES_PER_DAY
    }

    /// Minutes from `earlier` to `self`, or zero if `earlier` is later.
    pub fn minutes_since(&self, earlier: ClockTime) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u32> for ClockTime {
    type Output = ClockTime;

    fn add(self, minutes: u32) -> ClockTime {
        self.plus_minutes(minutes)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Error returned when a string is not a valid `HH:MM` time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time '{0}', expected HH:MM (24-hour)")]
pub struct ParseClockTimeError(pub String);

impl FromStr for ClockTime {
    type Err = ParseClockTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map_err(|_| ParseClockTimeError(s.to_string()))?;
        Ok(Self(time.hour() * 60 + time.minute()))
    }
}

/// `HH:MM` with any number of hours, for values computed past midnight.
fn parse_extended(s: &str) -> Option<ClockTime> {
    let (hours, minutes) = s.trim().split_once(':')?;
    if hours.is_empty() || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    hours.checked_mul(60)?.checked_add(minutes).map(ClockTime)
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_extended(&s).ok_or_else(|| serde::de::Error::custom(ParseClockTimeError(s)))
    }
}

/// The instant a calendar day crosses the wire as: UTC midnight of that date.
pub fn date_to_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Calendar day carried by a wire instant. Time-of-day is ignored.
pub fn instant_to_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}
