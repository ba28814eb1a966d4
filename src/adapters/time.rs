//! Clock adapters.
//!
//! Implements [`ClockPort`] on top of the system time-of-day.
//!
//! - **`target_os = "espidf"`**: `gettimeofday()`, set by SNTP once the
//!   station is associated.  Until then the RTC counts from 1970 and the
//!   adapter reports [`ClockError::NotSet`].
//! - **`not(target_os = "espidf")`**: `std::time::SystemTime` for host-side
//!   runs.
//!
//! [`ManualClock`] is a settable clock for simulation and tests.

use crate::app::ports::ClockPort;
use crate::clock::{ClockError, WallClock};

/// Local time from the system clock at a fixed UTC offset.
pub struct SystemClock {
    offset_minutes: i16,
}

impl SystemClock {
    pub fn new(offset_minutes: i16) -> Self {
        Self { offset_minutes }
    }

    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> Result<i64, ClockError> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return Err(ClockError::Unavailable);
        }
        Ok(tv.tv_sec as i64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> Result<i64, ClockError> {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .map_err(|_| ClockError::NotSet)
    }
}

impl ClockPort for SystemClock {
    fn now(&mut self) -> Result<WallClock, ClockError> {
        WallClock::from_unix(self.unix_secs()?, self.offset_minutes)
    }
}

/// Settable clock.  Starts unavailable.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current: Option<WallClock>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(now: WallClock) -> Self {
        Self { current: Some(now) }
    }

    pub fn set(&mut self, now: WallClock) {
        self.current = Some(now);
    }

    /// Simulate a dead RTC.
    pub fn fail(&mut self) {
        self.current = None;
    }

    /// Move forward `secs` seconds, rolling the date as needed.
    pub fn advance_secs(&mut self, secs: u32) {
        self.current = self.current.map(|now| now.add_secs(i64::from(secs)));
    }
}

impl ClockPort for ManualClock {
    fn now(&mut self) -> Result<WallClock, ClockError> {
        self.current.ok_or(ClockError::Unavailable)
    }
}
