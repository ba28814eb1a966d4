//! Daily feeding time-table.
//!
//! Decides when an unattended feed is due and which table entry comes
//! next.  The scheduler only *proposes* a feed; the
//! [`AppService`](crate::app::service::AppService) still runs the
//! request through the eligibility policy like any other trigger.
//!
//! ```text
//!   00:00         08:00         12:00         18:00         22:00      24:00
//!     │─────────────┼─────────────┼─────────────┼─────────────┼──────────│
//!                 ±1 min        ±1 min        ±1 min        ±1 min
//!                   └── due if rtc ready, auto on, ≥ 60 min since last auto feed
//! ```

use core::fmt;

use heapless::Vec;
use log::{debug, info};
use serde::Serialize;

use crate::clock::{circular_minute_distance, minutes_between, WallClock};
use crate::config::{FeederConfig, MAX_SCHEDULE_ENTRIES};
use crate::feeding::SystemState;

/// How close to a table entry "now" must be, in minutes.
pub const TOLERANCE_MINUTES: u16 = 1;

/// Minimum spacing between two automatic feeds.
pub const HOUR_GUARD_MINUTES: u32 = 60;

// ═══════════════════════════════════════════════════════════════
//  Schedule table
// ═══════════════════════════════════════════════════════════════

/// Up to four times of day, minutes since midnight.
///
/// Entries must be strictly ascending; [`FeederConfig::validate`]
/// enforces this and the lookups below assume it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleTable {
    entries: Vec<u16, MAX_SCHEDULE_ENTRIES>,
}

impl ScheduleTable {
    pub fn new(entries: Vec<u16, MAX_SCHEDULE_ENTRIES>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0] < w[1]), "schedule not sorted");
        Self { entries }
    }

    pub fn from_config(config: &FeederConfig) -> Self {
        Self::new(config.schedule_minutes.clone())
    }

    pub fn entries(&self) -> &[u16] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry within the tolerance window of `minute_of_day`, if any.
    pub fn matching(&self, minute_of_day: u16) -> Option<u16> {
        self.entries
            .iter()
            .copied()
            .find(|&e| circular_minute_distance(e, minute_of_day) <= TOLERANCE_MINUTES)
    }
}

/// The upcoming scheduled feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextFeed {
    /// Calendar time of the feed, seconds zeroed.
    pub at: WallClock,
    /// Today's table is exhausted; this is tomorrow's first entry.
    pub tomorrow: bool,
}

impl fmt::Display for NextFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.at.hour, self.at.minute)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler {
    table: ScheduleTable,
    /// Wall time of the last accepted automatic feed.
    last_auto_feed: Option<WallClock>,
    /// Absolute minute of the last `poll` that proposed a feed.
    last_attempt_minute: Option<i64>,
}

impl Scheduler {
    pub fn new(table: ScheduleTable) -> Self {
        info!("Scheduler: {} daily entries {:?}", table.entries.len(), table.entries());
        Self {
            table,
            last_auto_feed: None,
            last_attempt_minute: None,
        }
    }

    pub fn last_auto_feed(&self) -> Option<WallClock> {
        self.last_auto_feed
    }

    /// Is an unattended feed due at `now`?
    ///
    /// Pure check; repeated calls within the same minute give the same
    /// answer.  See [`Scheduler::poll`] for the de-duplicated variant.
    pub fn should_auto_feed(&self, now: Option<&WallClock>, state: &SystemState) -> bool {
        let Some(now) = now else {
            return false;
        };
        if !state.rtc_ready || !state.auto_feeding_enabled {
            return false;
        }
        if self.table.matching(now.minute_of_day()).is_none() {
            return false;
        }
        self.last_auto_feed
            .is_none_or(|last| minutes_between(&last, now) >= HOUR_GUARD_MINUTES)
    }

    /// Like [`should_auto_feed`](Self::should_auto_feed) but proposes at
    /// most one attempt per wall-clock minute.
    pub fn poll(&mut self, now: Option<&WallClock>, state: &SystemState) -> bool {
        if !self.should_auto_feed(now, state) {
            return false;
        }
        let Some(now) = now else {
            return false;
        };
        let minute = now.absolute_minutes();
        if self.last_attempt_minute == Some(minute) {
            return false;
        }
        self.last_attempt_minute = Some(minute);
        debug!("Scheduler: feed due at {}", now);
        true
    }

    /// An automatic feed was accepted at `now`; arms the hour guard.
    pub fn mark_auto_feed(&mut self, now: WallClock) {
        self.last_auto_feed = Some(now);
    }

    /// First entry strictly after the current minute, else tomorrow's
    /// first entry.  `None` for an empty table.
    pub fn next_scheduled_feed(&self, now: &WallClock) -> Option<NextFeed> {
        let current = now.minute_of_day();
        let (minute, tomorrow) = match self.table.entries.iter().copied().find(|&e| e > current) {
            Some(e) => (e, false),
            None => (*self.table.entries.first()?, true),
        };

        let date = if tomorrow { now.add_days(1) } else { *now };
        let at = WallClock {
            hour: (minute / 60) as u8,
            minute: (minute % 60) as u8,
            second: 0,
            ..date
        };
        Some(NextFeed { at, tomorrow })
    }
}
