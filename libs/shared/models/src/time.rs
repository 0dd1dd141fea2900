use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TimeError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Practitioner-local wall-clock time at minute resolution.
///
/// Stored as minutes since midnight and always below [`MINUTES_PER_DAY`].
/// Serialized as an `HH:MM` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

fn hh_mm_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]{2}):([0-9]{2})$").expect("static pattern compiles"))
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_minutes(minutes: u16) -> Result<Self, TimeError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(TimeError::InvalidRange(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn from_hm(hour: u8, minute: u8) -> Result<Self, TimeError> {
        if hour > 23 || minute > 59 {
            return Err(TimeError::InvalidFormat(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self(hour as u16 * 60 + minute as u16))
    }

    /// Parse exactly `HH:MM` with `00 <= HH <= 23` and `00 <= MM <= 59`.
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        let captures = hh_mm_pattern()
            .captures(input)
            .ok_or_else(|| TimeError::InvalidFormat(input.to_string()))?;

        let hour: u8 = captures[1]
            .parse()
            .map_err(|_| TimeError::InvalidFormat(input.to_string()))?;
        let minute: u8 = captures[2]
            .parse()
            .map_err(|_| TimeError::InvalidFormat(input.to_string()))?;

        if hour > 23 || minute > 59 {
            return Err(TimeError::InvalidFormat(input.to_string()));
        }

        Ok(Self(hour as u16 * 60 + minute as u16))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    /// `None` when the result would cross midnight.
    pub fn checked_add_minutes(self, minutes: u32) -> Option<Self> {
        let total = self.0 as u32 + minutes;
        if total >= MINUTES_PER_DAY as u32 {
            return None;
        }
        Some(Self(total as u16))
    }

    /// Minutes from `self` to `later`, `None` if `later` comes first.
    pub fn minutes_until(self, later: TimeOfDay) -> Option<u32> {
        later.0.checked_sub(self.0).map(u32::from)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour() as u32, self.minute() as u32, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    pub fn format(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
///
/// Intervals that merely touch (`a_end == b_start`) do not overlap. Every
/// overlap decision in the scheduling cells goes through this function.
pub fn overlaps<T: Ord + Copy>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}
