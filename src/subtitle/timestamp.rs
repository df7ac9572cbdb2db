//! Canonical subtitle timestamps and carry-correct offset arithmetic.

use crate::error::{CaptionError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// A non-negative point on a subtitle timeline with millisecond precision.
///
/// Stored as whole seconds plus a millisecond remainder that is always in
/// `0..=999`. Renders as `HH:MM:SS,mmm` (hours may exceed two digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    seconds: u64,
    millis: u16,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp {
        seconds: 0,
        millis: 0,
    };

    /// Build from whole seconds and a millisecond remainder, carrying any
    /// overflow of the remainder into the seconds.
    pub fn new(seconds: u64, millis: u64) -> Self {
        Self {
            seconds: seconds + millis / 1000,
            millis: (millis % 1000) as u16,
        }
    }

    pub fn from_millis(total: u64) -> Self {
        Self::new(0, total)
    }

    pub fn seconds(self) -> u64 {
        self.seconds
    }

    pub fn millis(self) -> u16 {
        self.millis
    }

    pub fn as_millis(self) -> u64 {
        self.seconds * 1000 + u64::from(self.millis)
    }

    /// Shift this timestamp forward by `offset`.
    ///
    /// The offset's fractional second is rounded to three decimals, the
    /// millisecond remainders are summed, and a sum of 1000 or more carries
    /// exactly one second.
    pub fn add_offset(self, offset: Duration) -> Self {
        let offset_millis = (u64::from(offset.subsec_nanos()) + 500_000) / 1_000_000;

        let mut seconds = self.seconds + offset.as_secs();
        let mut millis = u64::from(self.millis) + offset_millis;
        if millis >= 1000 {
            millis -= 1000;
            seconds += 1;
        }

        Self {
            seconds,
            millis: millis as u16,
        }
    }

    /// Parse the canonical `HH:MM:SS,mmm` form.
    pub fn parse(value: &str) -> Result<Self> {
        Self::parse_with(value, &[','])
    }

    /// Parse either `HH:MM:SS,mmm` or the table form `HH:MM:SS.mmm`.
    pub fn parse_lenient(value: &str) -> Result<Self> {
        Self::parse_with(value, &[',', '.'])
    }

    fn parse_with(value: &str, separators: &[char]) -> Result<Self> {
        let invalid = || CaptionError::Timestamp {
            value: value.to_string(),
        };
        let trimmed = value.trim();

        let (clock, millis) = trimmed.rsplit_once(separators).ok_or_else(invalid)?;
        if millis.len() != 3 || !is_digits(millis) {
            return Err(invalid());
        }

        let mut parts = clock.split(':');
        let (Some(hours), Some(minutes), Some(seconds), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if hours.len() < 2 || !is_digits(hours) {
            return Err(invalid());
        }
        if minutes.len() != 2 || seconds.len() != 2 || !is_digits(minutes) || !is_digits(seconds)
        {
            return Err(invalid());
        }

        let hours: u64 = hours.parse().map_err(|_| invalid())?;
        let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
        let seconds: u64 = seconds.parse().map_err(|_| invalid())?;
        let millis: u64 = millis.parse().map_err(|_| invalid())?;
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        Ok(Self::new(
            hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE + seconds,
            millis,
        ))
    }

    /// Render with a period decimal separator, as stored in transcript tables.
    pub fn to_table_string(self) -> String {
        self.render('.')
    }

    fn render(self, separator: char) -> String {
        let hours = self.seconds / SECONDS_PER_HOUR;
        let minutes = (self.seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        let seconds = self.seconds % SECONDS_PER_MINUTE;
        format!(
            "{hours:02}:{minutes:02}:{seconds:02}{separator}{:03}",
            self.millis
        )
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(','))
    }
}

impl FromStr for Timestamp {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Timestamp::ZERO.add_offset(duration)
    }
}

/// Serde adapter for table columns: period separator out, either separator in.
pub mod table_format {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ts.to_table_string().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse_lenient(&raw).map_err(serde::de::Error::custom)
    }
}
