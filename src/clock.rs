//! Wall-clock calendar values and minute arithmetic.
//!
//! The device clock is optional: it may be unsynced or absent entirely, in
//! which case [`ClockPort::now`](crate::app::ports::ClockPort::now) returns a
//! [`ClockError`] and every schedule-dependent feature switches itself off.
//!
//! Calendar work (offsets, month and year roll-over, leap days) is delegated
//! to `chrono`; [`WallClock`] is the flat, `Copy` view the rest of the
//! firmware reads.

use core::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::Serialize;

use crate::config::MINUTES_PER_DAY;

/// Unix time of 2020-01-01T00:00:00Z.  Anything earlier is an unsynced clock.
pub const EPOCH_2020: i64 = 1_577_836_800;

// ── Errors ────────────────────────────────────────────────────

/// Why the clock could not supply a wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Clock hardware or service did not answer.
    Unavailable,
    /// Clock answered with a time before 2020 (never synced).
    NotSet,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "clock unavailable"),
            Self::NotSet => write!(f, "clock not set"),
        }
    }
}

// ── WallClock ─────────────────────────────────────────────────

/// Local calendar date and time of day, second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WallClock {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl WallClock {
    /// Build a validated wall time.  Returns `None` for impossible dates.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))?
            .and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
            .and_then(Self::from_naive)
    }

    /// Convert a Unix timestamp to local time at `offset_minutes` from UTC.
    ///
    /// Returns [`ClockError::NotSet`] for timestamps before 2020.
    pub fn from_unix(unix_secs: i64, offset_minutes: i16) -> Result<Self, ClockError> {
        if unix_secs < EPOCH_2020 {
            return Err(ClockError::NotSet);
        }
        let offset = FixedOffset::east_opt(i32::from(offset_minutes) * 60).ok_or(ClockError::Unavailable)?;
        let local = DateTime::from_timestamp(unix_secs, 0)
            .ok_or(ClockError::Unavailable)?
            .with_timezone(&offset);
        Self::from_naive(local.naive_local()).ok_or(ClockError::Unavailable)
    }

    /// Flatten a chrono value.  `None` outside the years a `u16` holds.
    fn from_naive(dt: NaiveDateTime) -> Option<Self> {
        Some(Self {
            year: u16::try_from(dt.year()).ok()?,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
        })
    }

    fn to_naive(self) -> NaiveDateTime {
        // Every constructor goes through chrono, so the fields always form a valid date.
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
            .and_then(|d| d.and_hms_opt(u32::from(self.hour), u32::from(self.minute), u32::from(self.second)))
            .unwrap_or_default()
    }

    /// Minutes since local midnight (0–1439).
    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// Minutes since 1970-01-01T00:00 local; comparable across days.
    pub fn absolute_minutes(&self) -> i64 {
        self.to_naive().and_utc().timestamp().div_euclid(60)
    }

    /// Same time of day, `days` calendar days later.
    pub fn add_days(&self, days: i64) -> Self {
        self.add_secs(days.saturating_mul(86_400))
    }

    /// `secs` seconds later, rolling the date as needed.
    ///
    /// Saturates at the current value if the result leaves chrono's range.
    pub fn add_secs(&self, secs: i64) -> Self {
        TimeDelta::try_seconds(secs)
            .and_then(|delta| self.to_naive().checked_add_signed(delta))
            .and_then(Self::from_naive)
            .unwrap_or(*self)
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

// ── Minute helpers ────────────────────────────────────────────

/// Whole minutes elapsed from `earlier` to `later`.
///
/// Date-aware.  If the clock was set backwards (`later` precedes `earlier`),
/// falls back to minute-of-day arithmetic with day wrap-around.
pub fn minutes_between(earlier: &WallClock, later: &WallClock) -> u32 {
    let diff = (later.to_naive() - earlier.to_naive()).num_minutes();
    if diff >= 0 {
        diff.min(i64::from(u32::MAX)) as u32
    } else {
        let wrap = i32::from(later.minute_of_day()) - i32::from(earlier.minute_of_day());
        wrap.rem_euclid(i32::from(MINUTES_PER_DAY)) as u32
    }
}

/// Shortest distance between two minute-of-day values, across midnight.
pub fn circular_minute_distance(a: u16, b: u16) -> u16 {
    let d = a.abs_diff(b) % MINUTES_PER_DAY;
    d.min(MINUTES_PER_DAY - d)
}
