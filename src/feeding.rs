//! Feeding domain state and the eligibility policy.
//!
//! Local triggers (button, schedule) are rate-limited for the animal's
//! sake; remote requests are operator-supervised and only need the
//! mechanism to be free and food in the container.  The two gate sets are
//! kept separate on purpose and must not be merged.

use core::fmt;

use serde::Serialize;

use crate::clock::WallClock;
use crate::config::FeederConfig;
use crate::sensors::{BowlStatus, FoodLevel, SensorSnapshot};

/// Who asked for food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Front-panel button.
    Manual,
    /// Daily time-table.
    Scheduled,
    /// Backend direct method.
    Remote,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Remote => "remote",
        }
    }

    /// Subject to the daily limit, bowl-full and interval gates.
    pub fn is_rate_limited(self) -> bool {
        !matches!(self, Self::Remote)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger waiting for arbitration.  Never queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispenseRequest {
    pub origin: Origin,
    pub issued_ms: u64,
}

impl DispenseRequest {
    pub fn new(origin: Origin, issued_ms: u64) -> Self {
        Self { origin, issued_ms }
    }
}

/// Process-wide status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SystemState {
    /// The actuation sequence owns the servo.
    pub dispensing: bool,
    /// Operator is topping up the container.
    pub refill_mode: bool,
    pub auto_feeding_enabled: bool,
    /// Last clock poll returned a valid wall time.
    pub rtc_ready: bool,
    pub backend_connected: bool,
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    AlreadyDispensing,
    RefillMode,
    DailyLimitReached,
    BowlFull,
    TooSoon,
    NoFood,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyDispensing => "already dispensing",
            Self::RefillMode => "Refill mode",
            Self::DailyLimitReached => "Daily limit reached",
            Self::BowlFull => "Bowl full",
            Self::TooSoon => "Too soon",
            Self::NoFood => "No food",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Rejection {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Human-readable feeding readiness, shown on the display and in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedingStatus {
    DailyLimitReached,
    BowlFull,
    TooSoon,
    NoFood,
    #[default]
    Ready,
}

impl FeedingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyLimitReached => "Daily limit reached",
            Self::BowlFull => "Bowl full",
            Self::TooSoon => "Too soon",
            Self::NoFood => "No food",
            Self::Ready => "Ready to feed",
        }
    }
}

impl fmt::Display for FeedingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FeedingStatus {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Dispensed-food accounting.  Written only when a dispense is recorded
/// and at the daily roll-over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedingCounters {
    pub daily_grams: u32,
    pub total_grams: u32,
    /// Monotonic ms of the last recorded dispense (any origin).
    pub last_feeding_ms: Option<u64>,
    pub last_feeding_wall: Option<WallClock>,
    /// Day-of-month at the last roll-over check.
    last_reset_day: Option<u8>,
}

impl FeedingCounters {
    /// Account one completed portion.
    ///
    /// Remote portions count toward the lifetime total only.
    pub fn record(&mut self, origin: Origin, portion_grams: u32, now_ms: u64, wall: Option<WallClock>) {
        if origin.is_rate_limited() {
            self.daily_grams = self.daily_grams.saturating_add(portion_grams);
        }
        self.total_grams = self.total_grams.saturating_add(portion_grams);
        self.last_feeding_ms = Some(now_ms);
        if wall.is_some() {
            self.last_feeding_wall = wall;
        }
    }

    /// Clear the daily total when the calendar day changed since the last
    /// check.  The first call only primes the tracker.  Returns `true` when
    /// a reset happened.
    pub fn roll_over(&mut self, today: u8) -> bool {
        match self.last_reset_day {
            Some(day) if day == today => false,
            Some(_) => {
                self.daily_grams = 0;
                self.last_reset_day = Some(today);
                true
            }
            None => {
                self.last_reset_day = Some(today);
                false
            }
        }
    }

    fn interval_elapsed(&self, now_ms: u64, min_interval_ms: u64) -> bool {
        self.last_feeding_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= min_interval_ms)
    }
}

/// Readiness of the local (rate-limited) path, first match wins.
pub fn feeding_status(
    sensors: &SensorSnapshot,
    counters: &FeedingCounters,
    config: &FeederConfig,
    now_ms: u64,
) -> FeedingStatus {
    if counters.daily_grams >= config.max_daily_grams {
        FeedingStatus::DailyLimitReached
    } else if sensors.bowl_status == BowlStatus::Full {
        FeedingStatus::BowlFull
    } else if !counters.interval_elapsed(now_ms, config.min_feeding_interval_ms) {
        FeedingStatus::TooSoon
    } else if sensors.food_level == FoodLevel::Empty {
        FeedingStatus::NoFood
    } else {
        FeedingStatus::Ready
    }
}

/// Decide whether a request from `origin` may start the actuation
/// sequence right now.
pub fn check_eligibility(
    origin: Origin,
    state: &SystemState,
    sensors: &SensorSnapshot,
    counters: &FeedingCounters,
    config: &FeederConfig,
    now_ms: u64,
) -> Result<(), Rejection> {
    if state.dispensing {
        return Err(Rejection::AlreadyDispensing);
    }
    if state.refill_mode {
        return Err(Rejection::RefillMode);
    }

    if origin.is_rate_limited() {
        return match feeding_status(sensors, counters, config, now_ms) {
            FeedingStatus::Ready => Ok(()),
            FeedingStatus::DailyLimitReached => Err(Rejection::DailyLimitReached),
            FeedingStatus::BowlFull => Err(Rejection::BowlFull),
            FeedingStatus::TooSoon => Err(Rejection::TooSoon),
            FeedingStatus::NoFood => Err(Rejection::NoFood),
        };
    }

    if sensors.food_level == FoodLevel::Empty {
        return Err(Rejection::NoFood);
    }
    Ok(())
}
