//! Time-of-day ordering key for observations and pivots.
//!
//! Observations arrive on a fixed grid (e.g. every 30 minutes) stamped with a
//! local `HH:MM` clock and no date. [`TimeOfDay`] keeps that representation as
//! minutes since midnight so it can be ordered and differenced cheaply.
//!
//! There is no date component: a rollover past midnight is read as a large
//! absolute gap by [`TimeOfDay::candles_between`], never as a negative one.

use std::fmt;
use std::str::FromStr;

use crate::{PivotError, Result};

/// Minutes in one day
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Local time of day, minute resolution (`"HH:MM"`, 24h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Create from hour and minute, validating both
    pub fn new(hour: u16, minute: u16) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(PivotError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self(hour * 60 + minute))
    }

    #[doc(hidden)]
    pub const fn new_const(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    #[inline]
    pub fn minutes(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    #[inline]
    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Round down to the start of the grid slot of `interval_minutes`.
    pub fn floor_to(self, interval_minutes: u16) -> Self {
        if interval_minutes == 0 {
            return self;
        }
        Self(self.0 - self.0 % interval_minutes)
    }

    /// Whole candles of `interval_minutes` between two times (absolute).
    #[inline]
    pub fn candles_between(self, other: TimeOfDay, interval_minutes: u16) -> usize {
        let diff = self.0.abs_diff(other.0);
        (diff / interval_minutes.max(1)) as usize
    }

    /// Time shifted forward by `minutes`, wrapping at midnight.
    pub fn wrapping_add(self, minutes: u16) -> Self {
        Self(((self.0 as u32 + minutes as u32) % MINUTES_PER_DAY as u32) as u16)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PivotError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl serde::Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let t: TimeOfDay = "06:30".parse().unwrap();
        assert_eq!(t.hour(), 6);
        assert_eq!(t.minute(), 30);
        assert_eq!(t.to_string(), "06:30");

        let t: TimeOfDay = "9:05".parse().unwrap();
        assert_eq!(t.to_string(), "09:05");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "24:00", "12:60", "1230", "12:3", "ab:cd", "-1:00", "123:00"] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_ordering() {
        let a: TimeOfDay = "06:00".parse().unwrap();
        let b: TimeOfDay = "11:00".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_candles_between() {
        let a = TimeOfDay::new_const(10, 0);
        let b = TimeOfDay::new_const(11, 30);
        assert_eq!(a.candles_between(b, 30), 3);
        assert_eq!(b.candles_between(a, 30), 3);
        assert_eq!(a.candles_between(a, 30), 0);
        assert_eq!(a.candles_between(b, 60), 1);
    }

    #[test]
    fn test_floor_to_grid() {
        let t = TimeOfDay::new_const(14, 47);
        assert_eq!(t.floor_to(30), TimeOfDay::new_const(14, 30));
        assert_eq!(t.floor_to(15), TimeOfDay::new_const(14, 45));
        assert_eq!(t.floor_to(0), t);
    }

    #[test]
    fn test_wrapping_add() {
        let t = TimeOfDay::new_const(23, 30);
        assert_eq!(t.wrapping_add(30), TimeOfDay::new_const(0, 0));
        assert_eq!(t.wrapping_add(90), TimeOfDay::new_const(1, 0));
    }

    #[test]
    fn test_serde_as_string() {
        let t = TimeOfDay::new_const(8, 15);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"08:15\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
